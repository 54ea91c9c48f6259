//! # restprobe Infrastructure
//!
//! Everything that touches the outside world.
//!
//! This crate contains:
//! - Configuration loading (`.properties` / `.toml` / `.json`, env
//!   overrides) and the reloadable [`ConfigSource`]
//! - The reqwest HTTP client and the request [`Dispatcher`]
//! - The wiremock-backed [`MockServer`]
//! - JSON helpers and the sample [`UserService`]
//! - Tracing subscriber setup
//! - The [`Harness`] composition root
//!
//! ## Architecture
//! - Builds requests with `restprobe-core`, tokens come from
//!   `restprobe-common`
//! - Contains all I/O: files, environment, network

pub mod api;
pub mod config;
pub mod errors;
pub mod harness;
pub mod http;
pub mod json;
pub mod mock;
pub mod observability;
pub mod services;

// Re-export commonly used items
pub use api::{ApiResponse, Dispatcher};
pub use config::ConfigSource;
pub use errors::InfraError;
pub use harness::Harness;
pub use http::{HttpClient, HttpClientBuilder};
pub use mock::MockServer;
pub use observability::init_tracing;
pub use services::{Endpoints, UserService};

/// Serializes tests that read or write process environment variables.
#[cfg(test)]
pub(crate) static ENV_LOCK: once_cell::sync::Lazy<std::sync::Mutex<()>> =
    once_cell::sync::Lazy::new(|| std::sync::Mutex::new(()));
