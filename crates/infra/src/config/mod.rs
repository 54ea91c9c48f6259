//! Configuration loading and management
//!
//! This module provides utilities for loading harness settings from
//! environment-selected files and environment variables, plus a reloadable
//! holder for the loaded snapshot.

pub mod loader;
pub mod source;

// Re-export commonly used items
pub use loader::{load, load_for_env, load_from_env, load_from_file, probe_config_paths};
pub use source::ConfigSource;
