//! Configuration validation logic.

use crate::loader::ConfigError;
use crate::Config;

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.store.database_url.trim().is_empty() {
        return Err(ConfigError::Validation("store.database_url is empty".into()));
    }
    if config.store.max_connections == 0 {
        return Err(ConfigError::Validation(
            "store.max_connections must be > 0".into(),
        ));
    }
    if config.relay.control_addr.trim().is_empty() {
        return Err(ConfigError::Validation("relay.control_addr is empty".into()));
    }
    if config.relay.control_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "relay.control_timeout_secs must be > 0".into(),
        ));
    }
    if config.relay.binary.trim().is_empty() {
        return Err(ConfigError::Validation("relay.binary is empty".into()));
    }
    if config.relay.snapshot_path.trim().is_empty() {
        return Err(ConfigError::Validation("relay.snapshot_path is empty".into()));
    }
    if config.relay.access_log.trim().is_empty() {
        return Err(ConfigError::Validation("relay.access_log is empty".into()));
    }
    if config.ingest.flush_interval_secs == 0 {
        return Err(ConfigError::Validation(
            "ingest.flush_interval_secs must be > 0".into(),
        ));
    }
    if config.ingest.poll_interval_ms == 0 {
        return Err(ConfigError::Validation(
            "ingest.poll_interval_ms must be > 0".into(),
        ));
    }
    if config.reconcile_interval_secs == 0 {
        return Err(ConfigError::Validation(
            "reconcile_interval_secs must be > 0".into(),
        ));
    }
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.relay.log_level.as_str()) {
        return Err(ConfigError::Validation(format!(
            "relay.log_level must be one of: {:?}",
            valid_levels
        )));
    }
    Ok(())
}
