//! Configuration loader
//!
//! Loads harness settings from an environment-selected file, then applies
//! environment variable overrides.
//!
//! ## Loading Strategy
//! 1. Select the environment from `RESTPROBE_ENV` (default `qa`)
//! 2. Probe for `config/<env>.{properties,toml,json}` (or `<env>.*`)
//! 3. Parse the file into flat dotted keys
//! 4. Apply `RESTPROBE_<KEY>` overrides
//! 5. Validate into [`Settings`]
//!
//! ## Environment Variables
//! - `RESTPROBE_ENV`: environment name, selects the file
//! - `RESTPROBE_<KEY>`: overrides `<key>`, upper-cased with `.` replaced by
//!   `_` (e.g. `RESTPROBE_BASE_URI` overrides `base.uri`)
//!
//! ## File Locations
//! The loader probes the following paths (in order), for each of the
//! `.properties`, `.toml` and `.json` extensions:
//! 1. `./config/<env>.*`, then `./<env>.*` (current working directory)
//! 2. `../config/<env>.*`, then `../<env>.*` (parent directory)
//! 3. `../../config/<env>.*`, then `../../<env>.*` (grandparent directory)
//!
//! ## Formats
//! - `.properties`: `key=value` or `key: value` lines, `#`/`!` comments
//! - `.toml` / `.json`: nested tables are flattened into dotted keys, so
//!   `[base] uri = "..."` is the same as `base.uri=...`

use std::path::{Path, PathBuf};

use restprobe_domain::constants::{
    DEFAULT_ENV, ENV_OVERRIDE_PREFIX, ENV_SELECTOR, KEY_API_KEY_ENABLED, KEY_API_KEY_HEADER,
    KEY_API_KEY_VALUE, KEY_API_TIMEOUT, KEY_AUTH_TYPE, KEY_BASE_URI, KEY_BASE_URL,
    KEY_BASIC_PASSWORD, KEY_BASIC_USERNAME, KEY_BEARER_TOKEN, KEY_COOKIE_NAME, KEY_COOKIE_VALUE,
    KEY_JWT_EXPIRATION, KEY_JWT_RENEWAL_WINDOW, KEY_JWT_SECRET, KEY_LOG_FORMAT, KEY_LOG_LEVEL,
    KEY_MOCK_SERVER_ENABLED, KEY_MOCK_SERVER_PORT,
};
use restprobe_domain::{ProbeError, Properties, Result, Settings};
use serde_json::Value;

/// Keys that can be overridden from the environment even when the file does
/// not mention them.
const KNOWN_KEYS: &[&str] = &[
    KEY_BASE_URI,
    KEY_BASE_URL,
    KEY_AUTH_TYPE,
    KEY_BASIC_USERNAME,
    KEY_BASIC_PASSWORD,
    KEY_BEARER_TOKEN,
    KEY_COOKIE_NAME,
    KEY_COOKIE_VALUE,
    KEY_API_KEY_ENABLED,
    KEY_API_KEY_HEADER,
    KEY_API_KEY_VALUE,
    KEY_JWT_SECRET,
    KEY_JWT_EXPIRATION,
    KEY_JWT_RENEWAL_WINDOW,
    KEY_API_TIMEOUT,
    KEY_MOCK_SERVER_PORT,
    KEY_MOCK_SERVER_ENABLED,
    KEY_LOG_LEVEL,
    KEY_LOG_FORMAT,
];

const EXTENSIONS: [&str; 3] = ["properties", "toml", "json"];

/// Load settings for the environment named by `RESTPROBE_ENV`.
///
/// # Errors
/// Returns `ProbeError::Config` if no file is found, it cannot be parsed, or
/// the resulting settings are invalid.
pub fn load() -> Result<Settings> {
    load_for_env(&selected_env())
}

/// Load settings for `env`, probing the standard locations.
///
/// # Errors
/// See [`load`].
pub fn load_for_env(env: &str) -> Result<Settings> {
    load_from_file(env, None)
}

/// Load settings from a file
///
/// If `path` is `None`, probes the standard locations for `env`.
///
/// # Arguments
/// * `env` - Environment name recorded in the settings
/// * `path` - Optional explicit path. If `None`, uses [`probe_config_paths`].
///
/// # Errors
/// Returns `ProbeError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - Required keys are missing or invalid
pub fn load_from_file(env: &str, path: Option<PathBuf>) -> Result<Settings> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ProbeError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths(env).ok_or_else(|| {
            ProbeError::Config(format!(
                "No config file for environment '{env}' found in any of the standard locations"
            ))
        })?,
    };

    tracing::info!(env, path = %config_path.display(), "Loading configuration from file");

    let mut properties = load_properties(&config_path)?;
    let overridden = load_from_env(&mut properties);
    if overridden > 0 {
        tracing::debug!(count = overridden, "Applied environment overrides");
    }

    Settings::from_properties(env, properties)
}

/// Read and parse a config file into flat properties, without validation.
///
/// # Errors
/// Returns `ProbeError::Config` if the file cannot be read or parsed.
pub fn load_properties(path: &Path) -> Result<Properties> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        ProbeError::Config(format!("Failed to read config file {}: {e}", path.display()))
    })?;
    parse_config(&contents, path)
}

/// Apply `RESTPROBE_<KEY>` overrides to `properties`.
///
/// Every key already present plus every key the harness knows is checked.
/// Returns the number of keys overridden.
pub fn load_from_env(properties: &mut Properties) -> usize {
    let mut keys: Vec<String> = properties.keys().cloned().collect();
    keys.extend(KNOWN_KEYS.iter().map(|k| (*k).to_string()));
    keys.sort();
    keys.dedup();

    let mut count = 0;
    for key in keys {
        if let Ok(value) = std::env::var(env_var_name(&key)) {
            tracing::debug!(key = %key, "Overriding from environment");
            properties.insert(key, value);
            count += 1;
        }
    }
    count
}

/// Environment variable name that overrides `key`.
///
/// ```
/// use restprobe_infra::config::loader::env_var_name;
///
/// assert_eq!(env_var_name("jwt.renewal.window"), "RESTPROBE_JWT_RENEWAL_WINDOW");
/// ```
#[must_use]
pub fn env_var_name(key: &str) -> String {
    format!("{ENV_OVERRIDE_PREFIX}{}", key.replace(['.', '-'], "_").to_ascii_uppercase())
}

/// Environment selected by `RESTPROBE_ENV`, default `qa`.
#[must_use]
pub fn selected_env() -> String {
    std::env::var(ENV_SELECTOR)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_ENV.to_string())
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.properties`, `.toml` or `.json`).
///
/// # Errors
/// Returns `ProbeError::Config` if format is invalid or parsing fails.
pub fn parse_config(contents: &str, path: &Path) -> Result<Properties> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("properties");

    match extension {
        "properties" => Ok(parse_properties(contents)),
        "toml" => {
            let value: Value = toml::from_str(contents)
                .map_err(|e| ProbeError::Config(format!("Invalid TOML format: {e}")))?;
            flatten(&value)
        }
        "json" => {
            let value: Value = serde_json::from_str(contents)
                .map_err(|e| ProbeError::Config(format!("Invalid JSON format: {e}")))?;
            flatten(&value)
        }
        _ => Err(ProbeError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe the standard locations for `env`'s config file.
///
/// # Returns
/// The first config file found, or `None` if no file exists.
#[must_use]
pub fn probe_config_paths(env: &str) -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    candidate_paths(&cwd, env).into_iter().find(|path| path.is_file())
}

fn candidate_paths(root: &Path, env: &str) -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    for dir in [root.to_path_buf(), root.join(".."), root.join("../..")] {
        for base in [dir.join("config"), dir] {
            for ext in EXTENSIONS {
                candidates.push(base.join(format!("{env}.{ext}")));
            }
        }
    }
    candidates
}

/// `key=value` / `key: value` lines; first separator wins, `#`/`!` start a
/// comment line, later duplicates replace earlier ones.
fn parse_properties(contents: &str) -> Properties {
    let mut properties = Properties::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        let (key, value) = match line.find(['=', ':']) {
            Some(idx) => (&line[..idx], &line[idx + 1..]),
            None => (line, ""),
        };
        properties.insert(key.trim().to_string(), value.trim().to_string());
    }
    properties
}

fn flatten(value: &Value) -> Result<Properties> {
    let Value::Object(map) = value else {
        return Err(ProbeError::Config("Config root must be a table/object".into()));
    };
    let mut properties = Properties::new();
    for (key, child) in map {
        flatten_into(key, child, &mut properties);
    }
    Ok(properties)
}

fn flatten_into(prefix: &str, value: &Value, out: &mut Properties) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                flatten_into(&format!("{prefix}.{key}"), child, out);
            }
        }
        Value::Null => {}
        Value::String(s) => {
            out.insert(prefix.to_string(), s.clone());
        }
        other => {
            out.insert(prefix.to_string(), other.to_string());
        }
    }
}
