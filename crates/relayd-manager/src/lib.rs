//! Relay lifecycle management.
//!
//! The [`RelayManager`] owns the relay instance: it regenerates the
//! relay's declarative configuration from a subscriber snapshot and
//! starts, stops, or restarts the process (the cold path), and patches
//! the live authorized-user set through the relay's control plane
//! without a restart (the hot path).
//!
//! The hot path is best-effort: it does not update the last-applied
//! snapshot, so the live relay may transiently diverge from it. A
//! restart always regenerates from registry ground truth and wins.

mod control;
mod error;
mod manager;
mod process;
mod snapshot;

pub use control::{ControlClient, ControlOp, ControlRequest, ControlResponse};
pub use error::ManagerError;
pub use manager::{RelayManager, RelayStatus};
pub use process::{ProcessLauncher, RelayHandle, RelayLauncher};
pub use snapshot::{build_relay_config, write_snapshot};
