//! Error type constants for metrics labels and structured logging.

/// I/O error (file, socket).
pub const ERROR_IO: &str = "io";
/// Store/database error.
pub const ERROR_STORE: &str = "store";
/// Relay control-plane error.
pub const ERROR_CONTROL: &str = "control";
/// Configuration error.
pub const ERROR_CONFIG: &str = "config";
/// Log line parse failure.
pub const ERROR_PARSE: &str = "parse";
/// Operation timed out.
pub const ERROR_TIMEOUT: &str = "timeout";
