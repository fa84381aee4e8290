// Infrastructure modules
pub mod config;
pub mod logging;

// Re-exports
pub use config::BridgeConfig;
pub use logging::{init_with_config, LogConfig};
