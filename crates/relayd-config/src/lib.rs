//! Configuration loading and validation for relayd.
//!
//! Supports JSON (with comments), YAML, and TOML config files. Every
//! section has serde-level defaults so a minimal file only needs the
//! values that differ from a stock deployment.

mod defaults;
mod loader;
mod overrides;
mod types;
mod validate;

pub use loader::{load_config, ConfigError};
pub use overrides::{apply_overrides, CliOverrides};
pub use types::{
    Config, IngestSettings, LoggingConfig, MetricsSettings, RelaySettings, StoreSettings,
};
pub use validate::validate_config;
