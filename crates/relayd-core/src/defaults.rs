//! Default configuration values.

/// Default database URL (SQLite file, created on first run).
pub const DEFAULT_DATABASE_URL: &str = "sqlite:data/relayd.db?mode=rwc";

/// Default relay access log path.
pub const DEFAULT_ACCESS_LOG: &str = "/var/log/relay/access.log";

/// Default relay error log path.
pub const DEFAULT_ERROR_LOG: &str = "/var/log/relay/error.log";

/// Default relay control-plane address.
pub const DEFAULT_CONTROL_ADDR: &str = "127.0.0.1:10085";

/// Default generated relay config snapshot path.
pub const DEFAULT_SNAPSHOT_PATH: &str = "/var/run/relayd/relay.json";

/// Default relay listen port.
pub const DEFAULT_RELAY_PORT: u16 = 443;

/// Default control-plane call timeout in seconds.
pub const DEFAULT_CONTROL_TIMEOUT_SECS: u64 = 3;

/// Default traffic flush interval in seconds.
pub const DEFAULT_FLUSH_INTERVAL_SECS: u64 = 30;

/// Default log tail poll interval in milliseconds.
pub const DEFAULT_TAIL_POLL_MS: u64 = 500;

/// Default delay before retrying to open a missing log file, in milliseconds.
pub const DEFAULT_TAIL_REOPEN_MS: u64 = 1000;

/// How often tail unavailability is logged, in seconds.
pub const TAIL_WARN_INTERVAL_SECS: u64 = 30;

/// Default metrics sample interval in seconds.
pub const DEFAULT_SAMPLE_INTERVAL_SECS: u64 = 15;

/// Default registry reconcile interval in seconds.
pub const DEFAULT_RECONCILE_INTERVAL_SECS: u64 = 60;
