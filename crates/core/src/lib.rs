//! # restprobe Core
//!
//! Request construction and response classification - no transport code.
//!
//! This crate contains:
//! - The bearer token port ([`BearerTokenSource`])
//! - The request specification builder and per-call options
//! - The response classifier
//!
//! ## Architecture Principles
//! - Only depends on `restprobe-domain` and `restprobe-common`
//! - No network, file or environment access
//! - Token state is read through a trait, never mutated

pub mod auth;
pub mod request;
pub mod response;

pub use auth::{BearerTokenSource, StaticBearerToken};
pub use request::{RequestOptions, RequestSpecBuilder};
pub use response::{classify, ResponseOutcome};
