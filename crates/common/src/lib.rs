//! Common utilities shared across restprobe crates.
//!
//! - [`time`]: wall-clock abstraction so token expiry can be tested without
//!   waiting
//! - [`auth`]: HS256 token lifecycle manager
//! - `testing` (feature `test-utils`): mock clock

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod auth;
pub mod time;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(any(feature = "test-utils", test))]
pub mod testing;

// Re-export commonly used types and traits for convenience
pub use auth::{TokenManager, TokenManagerError};
#[cfg(any(feature = "test-utils", test))]
pub use testing::MockClock;
pub use time::{Clock, SystemClock};
