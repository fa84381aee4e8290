//! Bridge configuration
//!
//! Loaded once per process from the TOML file named by `MEXBRIDGE_CONFIG`.
//! Every table is optional.

use super::logging::{parse_level, LogConfig};
use crate::conversion::OutputShape;
use crate::errors::{BridgeError, BridgeResult};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

static GLOBAL: Lazy<BridgeConfig> = Lazy::new(BridgeConfig::from_env);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub dispatch: DispatchConfig,

    #[serde(default)]
    pub options: OptionsConfig,

    #[serde(default)]
    pub conversion: ConversionConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,

    #[serde(default)]
    pub file: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Unknown method names raise instead of falling back to "default"
    #[serde(default)]
    pub throw_on_unknown: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionsConfig {
    #[serde(default = "default_true")]
    pub lowercase_keys: bool,

    /// Unread arguments raise instead of warning
    #[serde(default)]
    pub strict: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// Shape used by `to_matlab` when set; otherwise the message type decides
    #[serde(default)]
    pub format: Option<OutputShape>,

    /// Expand arrays of nested messages into one struct element per combination
    #[serde(default)]
    pub expand: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
            file: None,
        }
    }
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self {
            lowercase_keys: true,
            strict: false,
        }
    }
}

fn default_true() -> bool { true }
fn default_level() -> String { "warn".to_string() }

impl BridgeConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> BridgeResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            BridgeError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string
    pub fn parse(content: &str) -> BridgeResult<Self> {
        toml::from_str(content)
            .map_err(|e| BridgeError::Config(format!("failed to parse config: {}", e)))
    }

    /// The file named by `MEXBRIDGE_CONFIG`, or defaults
    ///
    /// A broken file is reported and replaced by defaults so the host session
    /// keeps working.
    pub fn from_env() -> Self {
        let Ok(path) = std::env::var("MEXBRIDGE_CONFIG") else {
            return Self::default();
        };

        match Self::load(Path::new(&path)) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(event = "config_error", error = %e, "Using default configuration");
                Self::default()
            }
        }
    }

    /// Process-wide configuration, created on first use
    pub fn global() -> &'static BridgeConfig {
        &GLOBAL
    }

    /// Logging settings, with environment variables taking precedence
    pub fn log_config(&self) -> LogConfig {
        let env = LogConfig::from_env();
        let defaults = LogConfig::default();

        LogConfig {
            level: if std::env::var("MEXBRIDGE_LOG_LEVEL").is_ok() {
                env.level
            } else {
                parse_level(&self.logging.level).unwrap_or(defaults.level)
            },
            log_path: env.log_path.or_else(|| self.logging.file.clone()),
            json_format: env.json_format || self.logging.json,
        }
    }

    /// Generate default configuration file content
    pub fn generate_default() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# failed to generate config"))
    }
}
