//! Response classification

pub mod classifier;

pub use classifier::{classify, is_json_media_type, ResponseOutcome};
