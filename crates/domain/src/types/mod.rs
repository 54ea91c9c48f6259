//! Harness value types

pub mod request;
pub mod response;
pub mod token;

pub use request::{Headers, RequestBody, RequestSpec};
pub use response::ResponseClass;
pub use token::{ClaimValue, Claims, Token, RESERVED_CLAIMS};
