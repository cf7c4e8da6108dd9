//! Command-line overrides applied on top of the loaded config file.

use clap::Args;

use crate::Config;

/// CLI flags that override values from the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct CliOverrides {
    /// Override the database URL.
    #[arg(long, env = "RELAYD_DATABASE_URL")]
    pub database_url: Option<String>,

    /// Override the base log level (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override the relay access log path.
    #[arg(long)]
    pub access_log: Option<String>,

    /// Override the Prometheus exporter listen address.
    #[arg(long)]
    pub metrics_listen: Option<String>,
}

/// Apply CLI overrides to a loaded config in place.
pub fn apply_overrides(config: &mut Config, overrides: &CliOverrides) {
    if let Some(url) = &overrides.database_url {
        config.store.database_url = url.clone();
    }
    if let Some(level) = &overrides.log_level {
        config.logging.level = Some(level.clone());
    }
    if let Some(path) = &overrides.access_log {
        config.relay.access_log = path.clone();
    }
    if let Some(listen) = &overrides.metrics_listen {
        config.metrics.listen = Some(listen.clone());
    }
}
