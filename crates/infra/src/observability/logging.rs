//! Tracing subscriber setup.

use once_cell::sync::OnceCell;
use restprobe_domain::{LogFormat, LogSettings, ProbeError, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

static INSTALLED: OnceCell<()> = OnceCell::new();

/// Install the global fmt subscriber.
///
/// The filter is `RUST_LOG` when set, otherwise `settings.level`. Calls
/// after the first successful one do nothing.
///
/// # Errors
/// Returns `ProbeError::Config` if a different global subscriber is already
/// installed.
pub fn init_tracing(settings: &LogSettings) -> Result<()> {
    INSTALLED.get_or_try_init(|| install(settings)).map(|_| ())
}

/// Whether [`init_tracing`] has installed the subscriber.
#[must_use]
pub fn is_initialized() -> bool {
    INSTALLED.get().is_some()
}

fn install(settings: &LogSettings) -> Result<()> {
    let registry = tracing_subscriber::registry().with(build_env_filter(&settings.level));
    let installed = match settings.format {
        LogFormat::Json => registry.with(fmt::layer().json().with_target(true)).try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().with_target(true)).try_init(),
    };
    installed.map_err(|err| ProbeError::Config(format!("failed to install tracing subscriber: {err}")))
}

fn build_env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new(restprobe_domain::constants::DEFAULT_LOG_LEVEL))
}
