//! Manager error types.

/// Relay manager error.
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    /// `start()` called while the relay is not stopped.
    #[error("relay is already running")]
    AlreadyRunning,

    /// Operation requires a running relay.
    #[error("relay is not running")]
    NotRunning,

    /// Connection identifier failed format validation.
    #[error("invalid connection identifier: {0}")]
    InvalidIdentifier(String),

    /// Control-plane call failed.
    #[error("control: {0}")]
    Control(String),

    /// Control-plane call exceeded its timeout.
    #[error("control call timed out")]
    ControlTimeout,

    /// Relay process could not be launched.
    #[error("launch: {0}")]
    Launch(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}
