//! # restprobe Domain
//!
//! Value types and error taxonomy for the restprobe API test harness.
//!
//! This crate contains:
//! - Error types and the `Result` alias
//! - Validated harness settings (`Settings`, `AuthMode`)
//! - Token, request specification and response class value types
//! - Configuration key names and defaults
//!
//! ## Architecture
//! - No dependencies on other restprobe crates
//! - No I/O: loading settings from disk lives in `restprobe-infra`

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
