//! Bearer token lifecycle
//!
//! Issues, validates and renews HS256-signed JWTs and tracks the one
//! "current" token an authenticated session presents.
//!
//! # Lifecycle
//!
//! ```text
//! absent ──generate/set──► valid ──time──► renewal-window ──time──► expired
//!   ▲                        ▲                   │                     │
//!   └──────── clear ─────────┼───────────────────┴──── renew ──────────┘
//!                            └──────────────── (new token) ◄───────────┘
//! ```
//!
//! Validity is never cached: every predicate decodes the token and compares
//! its expiry against the manager's [`Clock`](crate::time::Clock).
//!
//! # Usage Example
//!
//! ```
//! use std::time::Duration;
//!
//! use restprobe_common::auth::TokenManager;
//!
//! let manager = TokenManager::new(
//!     b"0123456789abcdef0123456789abcdef",
//!     Duration::from_secs(3600),
//!     Duration::from_secs(300),
//! )?;
//!
//! let token = manager.generate("alice", "admin")?;
//! assert!(!manager.is_current_expired());
//! assert_eq!(manager.extract_username(token.as_str())?, "alice");
//! assert!(manager.authorization_header_value()?.starts_with("Bearer "));
//! # Ok::<(), restprobe_common::auth::TokenManagerError>(())
//! ```

mod codec;
pub mod token_manager;

pub use token_manager::{TokenManager, TokenManagerError};
