//! Request dispatch against the API under test
//!
//! [`Dispatcher`] turns a verb, a path and an optional payload into one HTTP
//! exchange and hands back an [`ApiResponse`]. Retries and classification
//! are left to callers.

pub mod dispatcher;
pub mod response;

pub use dispatcher::Dispatcher;
pub use response::ApiResponse;
