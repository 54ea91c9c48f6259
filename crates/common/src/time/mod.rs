//! Time abstractions
//!
//! Token expiry is a function of wall-clock time, so everything that reads
//! "now" goes through [`Clock`]. Production code uses [`SystemClock`]; tests
//! use `testing::MockClock` to move time forward without waiting.

pub mod clock;

pub use clock::{whole_seconds, Clock, SystemClock};
