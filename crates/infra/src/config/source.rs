//! Reloadable configuration source

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;
use restprobe_domain::{Result, Settings};
use tracing::info;

use super::loader;

/// Holds the current [`Settings`] snapshot.
///
/// Snapshots are immutable; [`ConfigSource::reload`] swaps in a freshly
/// loaded one. Callers holding an older `Arc<Settings>` keep seeing the old
/// values, so a request in flight is never built from a half-updated view.
#[derive(Debug)]
pub struct ConfigSource {
    env: String,
    path: Option<PathBuf>,
    current: RwLock<Arc<Settings>>,
}

impl ConfigSource {
    /// Load from the standard locations for the `RESTPROBE_ENV` environment.
    ///
    /// # Errors
    /// Returns `ProbeError::Config` if loading fails.
    pub fn load() -> Result<Self> {
        Self::load_env(&loader::selected_env())
    }

    /// Load from the standard locations for `env`.
    ///
    /// # Errors
    /// Returns `ProbeError::Config` if loading fails.
    pub fn load_env(env: &str) -> Result<Self> {
        let settings = loader::load_for_env(env)?;
        Ok(Self { env: env.to_string(), path: None, current: RwLock::new(Arc::new(settings)) })
    }

    /// Load from an explicit file.
    ///
    /// # Errors
    /// Returns `ProbeError::Config` if loading fails.
    pub fn from_file(env: &str, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let settings = loader::load_from_file(env, Some(path.clone()))?;
        Ok(Self { env: env.to_string(), path: Some(path), current: RwLock::new(Arc::new(settings)) })
    }

    /// Wrap already-validated settings. `reload` re-probes the standard
    /// locations for the settings' environment.
    #[must_use]
    pub fn from_settings(settings: Settings) -> Self {
        Self { env: settings.env().to_string(), path: None, current: RwLock::new(Arc::new(settings)) }
    }

    /// Current snapshot.
    #[must_use]
    pub fn current(&self) -> Arc<Settings> {
        Arc::clone(&self.current.read())
    }

    /// Raw lookup against the current snapshot.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.current.read().get(key).map(str::to_string)
    }

    /// Re-read the configuration and replace the snapshot wholesale.
    ///
    /// On failure the previous snapshot stays in place.
    ///
    /// # Errors
    /// Returns `ProbeError::Config` if loading fails.
    pub fn reload(&self) -> Result<Arc<Settings>> {
        let settings = Arc::new(loader::load_from_file(&self.env, self.path.clone())?);
        *self.current.write() = Arc::clone(&settings);
        info!(env = %self.env, "Configuration reloaded");
        Ok(settings)
    }

    #[must_use]
    pub fn env(&self) -> &str {
        &self.env
    }
}
