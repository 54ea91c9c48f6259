//! Outbound request construction

pub mod options;
pub mod spec_builder;

pub use options::RequestOptions;
pub use spec_builder::RequestSpecBuilder;
