//! Structured logging setup.
//!
//! Library code only emits `tracing` events; binaries and test suites call
//! [`init_tracing`] once to get output.

pub mod logging;

pub use logging::{init_tracing, is_initialized};
