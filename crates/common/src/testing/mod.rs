//! Test utilities
//!
//! Available under `cfg(test)` and the `test-utils` feature.

pub mod time;

pub use time::MockClock;
