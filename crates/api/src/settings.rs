//! Server settings
//!
//! Layered with the `config` crate: built-in defaults, then an optional TOML
//! file, then `PROCTOR__SECTION__KEY` environment variables.

use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment, File};
use detection::DetectionConfig;
use proctor::ProctorConfig;
use serde::{Deserialize, Serialize};
use storage::StorageConfig;

use crate::rate_limit::RateLimitConfig;

/// Default settings file, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "proctor.toml";

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Allow cross-origin requests from any origin (browser exam client)
    pub cors_any_origin: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_any_origin: true,
        }
    }
}

impl ServerSettings {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Max level (`trace`, `debug`, `info`, `warn`, `error`)
    pub level: String,
    /// Emit JSON lines instead of human-readable text
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Complete server settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub rate_limit: RateLimitConfig,
    pub proctor: ProctorConfig,
    pub detection: DetectionConfig,
    pub storage: StorageConfig,
}

impl Settings {
    /// Load settings from `path` (or the default file, if present) and the environment
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::with_name(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        channel_defaults(Config::builder())?
            .add_source(file)
            .add_source(
                Environment::with_prefix("PROCTOR")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

/// Seed every debounce channel's keys, so a table that sets only one of them
/// keeps that channel's own default for the other
fn channel_defaults(
    mut builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let defaults = ProctorConfig::default();
    let channels = [
        ("phone", defaults.phone),
        ("head", defaults.head),
        ("gaze", defaults.gaze),
        ("multiple_faces", defaults.multiple_faces),
    ];

    for (name, channel) in channels {
        builder = builder
            .set_default(format!("proctor.{name}.duration_ms"), channel.duration_ms)?
            .set_default(format!("proctor.{name}.cooldown_ms"), channel.cooldown_ms)?;
    }
    Ok(builder)
}
