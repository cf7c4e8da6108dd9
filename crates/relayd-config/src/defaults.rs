//! serde default helpers backed by the shared constants in `relayd-core`.

use relayd_core::defaults;

pub(crate) fn default_database_url() -> String {
    defaults::DEFAULT_DATABASE_URL.to_string()
}

pub(crate) fn default_max_connections() -> u32 {
    10
}

pub(crate) fn default_min_connections() -> u32 {
    1
}

pub(crate) fn default_connect_timeout_secs() -> u64 {
    30
}

pub(crate) fn default_relay_port() -> u16 {
    defaults::DEFAULT_RELAY_PORT
}

pub(crate) fn default_control_addr() -> String {
    defaults::DEFAULT_CONTROL_ADDR.to_string()
}

pub(crate) fn default_control_timeout_secs() -> u64 {
    defaults::DEFAULT_CONTROL_TIMEOUT_SECS
}

pub(crate) fn default_relay_binary() -> String {
    "relay-core".to_string()
}

pub(crate) fn default_snapshot_path() -> String {
    defaults::DEFAULT_SNAPSHOT_PATH.to_string()
}

pub(crate) fn default_access_log() -> String {
    defaults::DEFAULT_ACCESS_LOG.to_string()
}

pub(crate) fn default_error_log() -> String {
    defaults::DEFAULT_ERROR_LOG.to_string()
}

pub(crate) fn default_relay_log_level() -> String {
    "info".to_string()
}

pub(crate) fn default_flush_interval_secs() -> u64 {
    defaults::DEFAULT_FLUSH_INTERVAL_SECS
}

pub(crate) fn default_tail_poll_ms() -> u64 {
    defaults::DEFAULT_TAIL_POLL_MS
}

pub(crate) fn default_sample_interval_secs() -> u64 {
    defaults::DEFAULT_SAMPLE_INTERVAL_SECS
}

pub(crate) fn default_reconcile_interval_secs() -> u64 {
    defaults::DEFAULT_RECONCILE_INTERVAL_SECS
}
