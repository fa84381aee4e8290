//! Logging infrastructure - structured tracing for the bridge
//!
//! The host's print channel is only a sink: every warning or lifecycle event
//! is a `tracing` event with an `event` field, and the subscriber decides
//! where it goes (stderr, JSON, rolling file).

use once_cell::sync::OnceCell;
use std::io;
use std::path::Path;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Global logging state; holds the file writer guard when file output is on
static LOGGER: OnceCell<Option<WorkerGuard>> = OnceCell::new();

/// Logging configuration
#[derive(Debug, Clone, PartialEq)]
pub struct LogConfig {
    /// Default log level
    pub level: Level,
    /// Log file path (rotated daily); stderr when unset
    pub log_path: Option<String>,
    /// JSON lines instead of human-readable output
    pub json_format: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            log_path: None,
            json_format: false,
        }
    }
}

impl LogConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // MEXBRIDGE_LOG_LEVEL: trace, debug, info, warn, error
        if let Ok(level) = std::env::var("MEXBRIDGE_LOG_LEVEL") {
            config.level = parse_level(&level).unwrap_or(config.level);
        }

        // MEXBRIDGE_LOG_FILE: path to log file
        if let Ok(path) = std::env::var("MEXBRIDGE_LOG_FILE") {
            config.log_path = Some(path);
        }

        // MEXBRIDGE_LOG_JSON: enable JSON format
        config.json_format = std::env::var("MEXBRIDGE_LOG_JSON").is_ok();

        config
    }

    /// Verbose config for debugging a host session
    pub fn debug() -> Self {
        Self {
            level: Level::TRACE,
            log_path: Some("mexbridge.log".to_string()),
            json_format: false,
        }
    }
}

pub fn parse_level(level: &str) -> Option<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// Initialize logging from the environment
pub fn init() {
    init_with_config(LogConfig::from_env());
}

/// Initialize logging with a custom configuration (first call wins)
pub fn init_with_config(config: LogConfig) {
    LOGGER.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("mexbridge={}", config.level.as_str().to_lowercase()))
        });

        let (writer, guard) = match &config.log_path {
            Some(path) => {
                let path = Path::new(path);
                let directory = path.parent().filter(|p| !p.as_os_str().is_empty());
                let prefix = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "mexbridge.log".to_string());
                let appender =
                    tracing_appender::rolling::daily(directory.unwrap_or(Path::new(".")), prefix);
                let (writer, guard) = tracing_appender::non_blocking(appender);
                (writer, Some(guard))
            }
            None => {
                let (writer, guard) = tracing_appender::non_blocking(io::stderr());
                (writer, Some(guard))
            }
        };

        let layer = if config.json_format {
            fmt::layer().with_writer(writer).json().with_filter(filter).boxed()
        } else {
            fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_filter(filter)
                .boxed()
        };

        // another subscriber may already be installed by the embedding host
        let _ = tracing_subscriber::registry().with(layer).try_init();
        guard
    });
}

/// Check if logging is initialized
pub fn is_initialized() -> bool {
    LOGGER.get().is_some()
}

// ============================================================================
// Bridge events
// ============================================================================

/// Log a dispatch into a native class
pub fn log_dispatch(class: &str, method: &str, inputs: usize) {
    use tracing::debug;
    debug!(
        event = "dispatch",
        class = class,
        method = method,
        inputs = inputs,
        "Dispatching method call"
    );
}

/// Log a failed call before it is handed to the host
pub fn log_dispatch_error(class: &str, method: &str, error: &str) {
    use tracing::error;
    error!(
        event = "dispatch_error",
        class = class,
        method = method,
        error = error,
        "Method call failed"
    );
}

pub fn log_object_created(class: &str, token: u64) {
    use tracing::info;
    info!(
        event = "object_created",
        class = class,
        handle = token,
        "Creating new object"
    );
}

pub fn log_object_destroyed(class: &str, token: u64) {
    use tracing::info;
    info!(
        event = "object_destroyed",
        class = class,
        handle = token,
        "Deleting object"
    );
}

/// Log an argument bag key that was never read
pub fn log_unused_argument(kind: &str, key: &str) {
    use tracing::warn;
    warn!(
        event = "unused_argument",
        kind = kind,
        key = key,
        "WARNING: unused {} argument '{}'",
        kind,
        key
    );
}

/// Log a message conversion
pub fn log_conversion(message_type: &str, shape: &str, instances: usize) {
    use tracing::trace;
    trace!(
        event = "conversion",
        message_type = message_type,
        shape = shape,
        instances = instances,
        "Message conversion performed"
    );
}
