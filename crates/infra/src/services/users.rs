//! User API service
//!
//! Named operations over the sample `/users` resource. Each returns the raw
//! [`ApiResponse`] so callers decide how to classify it; the `parse_*`
//! helpers deserialize the usual payload shapes.

use restprobe_core::RequestOptions;
use reqwest::Method;
use restprobe_domain::{AuthMode, Result};
use serde::Serialize;
use tracing::instrument;

use super::models::{ListResponse, SingleResponse, User};
use crate::api::{ApiResponse, Dispatcher};

/// Path helpers for the user resource, relative to `base.uri`.
pub struct Endpoints;

impl Endpoints {
    #[must_use]
    pub const fn users() -> &'static str {
        "/users"
    }

    #[must_use]
    pub fn user_by_id(id: u64) -> String {
        format!("/users/{id}")
    }

    #[must_use]
    pub const fn user_search() -> &'static str {
        "/users/search"
    }

    #[must_use]
    pub fn user_profile(id: u64) -> String {
        format!("/users/{id}/profile")
    }

    #[must_use]
    pub fn user_avatar(id: u64) -> String {
        format!("/users/{id}/avatar")
    }

    #[must_use]
    pub fn user_statistics(id: u64) -> String {
        format!("/users/{id}/statistics")
    }

    /// Activity log; filtered by the `user_id` query parameter.
    #[must_use]
    pub const fn user_activity() -> &'static str {
        "/users/activity"
    }

    /// Collection endpoint for bulk create, update and delete.
    #[must_use]
    pub const fn users_bulk() -> &'static str {
        "/users/bulk"
    }
}

#[derive(Debug, Clone)]
pub struct UserService {
    dispatcher: Dispatcher,
}

impl UserService {
    #[must_use]
    pub const fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// # Errors
    /// Propagates dispatcher errors.
    #[instrument(skip(self))]
    pub async fn get_user(&self, id: u64) -> Result<ApiResponse> {
        self.dispatcher.get(&Endpoints::user_by_id(id)).await
    }

    /// Fetch a user with bearer auth regardless of `auth.type`.
    ///
    /// # Errors
    /// Returns `ProbeError::TokenExpired` when there is no usable current
    /// token, otherwise propagates dispatcher errors.
    #[instrument(skip(self))]
    pub async fn get_user_authenticated(&self, id: u64) -> Result<ApiResponse> {
        let options = RequestOptions::new().auth(AuthMode::Bearer);
        self.dispatcher.get_with(&Endpoints::user_by_id(id), options).await
    }

    /// First page with the server's default page size.
    ///
    /// # Errors
    /// Propagates dispatcher errors.
    pub async fn list_all_users(&self) -> Result<ApiResponse> {
        self.dispatcher.get(Endpoints::users()).await
    }

    /// # Errors
    /// Propagates dispatcher errors.
    #[instrument(skip(self))]
    pub async fn list_users(&self, page: u32, per_page: u32) -> Result<ApiResponse> {
        let options = RequestOptions::new()
            .query("page", page.to_string())
            .query("per_page", per_page.to_string());
        self.dispatcher.get_with(Endpoints::users(), options).await
    }

    /// # Errors
    /// Propagates dispatcher errors.
    #[instrument(skip(self))]
    pub async fn search_users(&self, name: &str) -> Result<ApiResponse> {
        let options = RequestOptions::new().query("name", name);
        self.dispatcher.get_with(Endpoints::user_search(), options).await
    }

    /// `body` may be a [`User`], a map or any other serializable payload.
    ///
    /// # Errors
    /// Propagates dispatcher errors.
    pub async fn create_user<T: Serialize + ?Sized>(&self, body: &T) -> Result<ApiResponse> {
        self.dispatcher.post(Endpoints::users(), body).await
    }

    /// # Errors
    /// Propagates dispatcher errors.
    pub async fn update_user<T: Serialize + ?Sized>(&self, id: u64, body: &T) -> Result<ApiResponse> {
        self.dispatcher.put(&Endpoints::user_by_id(id), body).await
    }

    /// Partial update.
    ///
    /// # Errors
    /// Propagates dispatcher errors.
    pub async fn patch_user<T: Serialize + ?Sized>(&self, id: u64, body: &T) -> Result<ApiResponse> {
        self.dispatcher.patch(&Endpoints::user_by_id(id), body).await
    }

    /// # Errors
    /// Propagates dispatcher errors.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: u64) -> Result<ApiResponse> {
        self.dispatcher.delete(&Endpoints::user_by_id(id)).await
    }

    /// Profile of one user, with bearer auth.
    ///
    /// # Errors
    /// Returns `ProbeError::TokenExpired` when there is no usable current
    /// token, otherwise propagates dispatcher errors.
    #[instrument(skip(self))]
    pub async fn get_user_profile(&self, id: u64) -> Result<ApiResponse> {
        let options = RequestOptions::new().auth(AuthMode::Bearer);
        self.dispatcher.get_with(&Endpoints::user_profile(id), options).await
    }

    /// # Errors
    /// Propagates dispatcher errors.
    pub async fn update_user_profile<T: Serialize + ?Sized>(&self, id: u64, profile: &T) -> Result<ApiResponse> {
        self.dispatcher.put(&Endpoints::user_profile(id), profile).await
    }

    /// # Errors
    /// Propagates dispatcher errors.
    #[instrument(skip(self))]
    pub async fn get_user_avatar(&self, id: u64) -> Result<ApiResponse> {
        self.dispatcher.get(&Endpoints::user_avatar(id)).await
    }

    /// Usage statistics for one user, with bearer auth.
    ///
    /// # Errors
    /// Returns `ProbeError::TokenExpired` when there is no usable current
    /// token, otherwise propagates dispatcher errors.
    #[instrument(skip(self))]
    pub async fn get_user_statistics(&self, id: u64) -> Result<ApiResponse> {
        let options = RequestOptions::new().auth(AuthMode::Bearer);
        self.dispatcher.get_with(&Endpoints::user_statistics(id), options).await
    }

    /// # Errors
    /// Propagates dispatcher errors.
    #[instrument(skip(self))]
    pub async fn get_user_activity_log(&self, id: u64) -> Result<ApiResponse> {
        let options = RequestOptions::new().query("user_id", id.to_string());
        self.dispatcher.get_with(Endpoints::user_activity(), options).await
    }

    /// POST every user in one JSON array.
    ///
    /// # Errors
    /// Propagates dispatcher errors.
    pub async fn bulk_create_users(&self, users: &[User]) -> Result<ApiResponse> {
        self.dispatcher.post(Endpoints::users_bulk(), users).await
    }

    /// PUT one JSON array of partial updates; each entry names its own `id`.
    ///
    /// # Errors
    /// Propagates dispatcher errors.
    pub async fn bulk_update_users<T: Serialize>(&self, updates: &[T]) -> Result<ApiResponse> {
        self.dispatcher.put(Endpoints::users_bulk(), updates).await
    }

    /// DELETE with the ids as a JSON array body.
    ///
    /// # Errors
    /// Propagates dispatcher errors.
    #[instrument(skip(self))]
    pub async fn bulk_delete_users(&self, ids: &[u64]) -> Result<ApiResponse> {
        let body = serde_json::to_value(ids)?;
        self.dispatcher
            .send(Method::DELETE, Endpoints::users_bulk(), Some(body), RequestOptions::default())
            .await
    }

    /// Body of a create/update echo (`{"name":..,"job":..,"id":..}`).
    ///
    /// # Errors
    /// Returns `ProbeError::Serialization` if the body is not a user.
    pub fn parse_user(response: &ApiResponse) -> Result<User> {
        response.json()
    }

    /// `data` of a single-user response.
    ///
    /// # Errors
    /// Returns `ProbeError::Serialization` on an unexpected shape.
    pub fn parse_single(response: &ApiResponse) -> Result<User> {
        Ok(response.json::<SingleResponse<User>>()?.data)
    }

    /// # Errors
    /// Returns `ProbeError::Serialization` on an unexpected shape.
    pub fn parse_list(response: &ApiResponse) -> Result<ListResponse<User>> {
        response.json()
    }
}
