//! Process configuration.
//!
//! Loading order:
//!
//! 1. An explicit path (`--config` CLI flag).
//! 2. `SHIPNETSIM_CONFIG` environment variable (path to a TOML file).
//! 3. `shipnetsim.toml` in the current working directory.
//! 4. Built-in defaults ([`defaults`]).
//!
//! ## Usage
//!
//! ```ignore
//! config::init(Settings::load(None));
//! let host = &config::get().broker.host;
//! ```

pub mod defaults;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

static SETTINGS: OnceLock<Settings> = OnceLock::new();

/// Initialize the global settings. Must be called exactly once before any
/// call to [`get`]. A second call is ignored with a warning — this is a
/// process singleton set behind a once-guard.
pub fn init(settings: Settings) {
    if SETTINGS.set(settings).is_err() {
        tracing::warn!("config::init() called more than once — ignoring");
    }
}

/// Get a reference to the global settings.
///
/// Panics if [`init`] has not been called — a missing config is a fatal
/// startup error, not a recoverable condition.
pub fn get() -> &'static Settings {
    SETTINGS
        .get()
        .expect("config::get() called before config::init() — this is a startup bug")
}

pub fn is_initialized() -> bool {
    SETTINGS.get().is_some()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub exchange: String,
    pub command_queue: String,
    pub command_routing_key: String,
    pub response_queue: String,
    pub response_routing_key: String,
    pub connect_max_attempts: u32,
    pub connect_backoff_secs: u64,
    pub publish_max_attempts: u32,
    pub publish_retry_secs: u64,
    pub consume_poll_ms: u64,
    pub busy_yield_ms: u64,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            host: defaults::DEFAULT_HOST.to_string(),
            port: defaults::DEFAULT_PORT,
            username: defaults::DEFAULT_USERNAME.to_string(),
            password: defaults::DEFAULT_PASSWORD.to_string(),
            exchange: defaults::EXCHANGE_NAME.to_string(),
            command_queue: defaults::COMMAND_QUEUE.to_string(),
            command_routing_key: defaults::COMMAND_ROUTING_KEY.to_string(),
            response_queue: defaults::RESPONSE_QUEUE.to_string(),
            response_routing_key: defaults::RESPONSE_ROUTING_KEY.to_string(),
            connect_max_attempts: defaults::CONNECT_MAX_ATTEMPTS,
            connect_backoff_secs: defaults::CONNECT_BACKOFF_SECS,
            publish_max_attempts: defaults::PUBLISH_MAX_ATTEMPTS,
            publish_retry_secs: defaults::PUBLISH_RETRY_SECS,
            consume_poll_ms: defaults::CONSUME_POLL_MS,
            busy_yield_ms: defaults::BUSY_YIELD_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub broker: BrokerSettings,
    /// Output directory for trajectory/summary artifacts. Defaults to the
    /// user's home directory.
    pub output_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            broker: BrokerSettings::default(),
            output_dir: None,
        }
    }
}

impl Settings {
    /// Resolve the output directory, falling back to the user's home dir.
    pub fn resolved_output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| {
            std::env::var_os("HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."))
        })
    }

    /// Load settings following the four-tier precedence described above.
    pub fn load(explicit_path: Option<&Path>) -> Self {
        if let Some(path) = explicit_path {
            return Self::from_file(path).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "failed to load explicit config, using defaults");
                Self::default()
            });
        }

        if let Ok(env_path) = std::env::var("SHIPNETSIM_CONFIG") {
            return Self::from_file(Path::new(&env_path)).unwrap_or_else(|e| {
                tracing::warn!(path = %env_path, error = %e, "failed to load SHIPNETSIM_CONFIG, using defaults");
                Self::default()
            });
        }

        let cwd_path = Path::new("shipnetsim.toml");
        if cwd_path.exists() {
            if let Ok(settings) = Self::from_file(cwd_path) {
                return settings;
            }
        }

        Self::default()
    }

    fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&text)?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_constants() {
        let settings = Settings::default();
        assert_eq!(settings.broker.host, "localhost");
        assert_eq!(settings.broker.port, 5672);
        assert_eq!(settings.broker.exchange, "CargoNetSim.Exchange");
    }

    #[test]
    fn load_from_explicit_toml_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[broker]\nhost = \"broker.example\"\nport = 5673\n").unwrap();

        let settings = Settings::load(Some(&path));
        assert_eq!(settings.broker.host, "broker.example");
        assert_eq!(settings.broker.port, 5673);
        // Unset fields still fall back to defaults.
        assert_eq!(settings.broker.exchange, "CargoNetSim.Exchange");
    }
}
