//! Ingestion error types.

use relayd_store::StoreError;

/// Ingestion pipeline error.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// `start()` called while the monitor is not idle.
    #[error("log monitor is already running")]
    AlreadyRunning,

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("store: {0}")]
    Store(#[from] StoreError),
}
