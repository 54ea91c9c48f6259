//! Service layer over the dispatcher.

pub mod models;
pub mod users;

pub use models::{ListResponse, SingleResponse, Support, User};
pub use users::{Endpoints, UserService};
