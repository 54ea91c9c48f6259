//! Local stub server for dependencies the API under test calls out to.

pub mod server;

pub use server::MockServer;
