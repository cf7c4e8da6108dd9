//! Relay process launching.
//!
//! The relay is an opaque external program; all relayd needs is a way
//! to launch it against a config snapshot and to tear it down again.
//! That seam is the [`RelayLauncher`] trait so the reconciler can be
//! exercised without a real relay binary.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tracing::{debug, info};

use crate::error::ManagerError;

/// Handle to a launched relay instance.
#[async_trait]
pub trait RelayHandle: Send {
    /// Tear the instance down, waiting for it to exit.
    async fn shutdown(self: Box<Self>) -> Result<(), ManagerError>;
}

/// Launches relay instances from a config snapshot.
#[async_trait]
pub trait RelayLauncher: Send + Sync {
    async fn launch(&self, config_path: &Path) -> Result<Box<dyn RelayHandle>, ManagerError>;
}

/// Launches the relay as a child process: `<binary> -c <snapshot> [args..]`.
pub struct ProcessLauncher {
    binary: PathBuf,
    args: Vec<String>,
}

impl ProcessLauncher {
    pub fn new(binary: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            binary: binary.into(),
            args,
        }
    }
}

#[async_trait]
impl RelayLauncher for ProcessLauncher {
    async fn launch(&self, config_path: &Path) -> Result<Box<dyn RelayHandle>, ManagerError> {
        let child = Command::new(&self.binary)
            .arg("-c")
            .arg(config_path)
            .args(&self.args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ManagerError::Launch(format!(
                    "failed to spawn {}: {e}",
                    self.binary.display()
                ))
            })?;

        info!(
            binary = %self.binary.display(),
            pid = child.id(),
            "relay process launched"
        );
        Ok(Box::new(ProcessHandle { child }))
    }
}

struct ProcessHandle {
    child: Child,
}

#[async_trait]
impl RelayHandle for ProcessHandle {
    async fn shutdown(mut self: Box<Self>) -> Result<(), ManagerError> {
        if let Err(e) = self.child.start_kill() {
            debug!(error = %e, "relay process already gone");
        }
        let status = self.child.wait().await?;
        debug!(?status, "relay process exited");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_binary_fails_to_launch() {
        let launcher = ProcessLauncher::new("/nonexistent/relay-binary", Vec::new());
        let err = launcher.launch(Path::new("/tmp/relay.json")).await;
        assert!(matches!(err, Err(ManagerError::Launch(_))));
    }

    #[tokio::test]
    async fn launch_and_shutdown_child() {
        // `true` ignores the config argument and exits immediately;
        // shutdown must still reap it cleanly.
        let launcher = ProcessLauncher::new("true", Vec::new());
        let handle = launcher.launch(Path::new("/tmp/relay.json")).await.unwrap();
        handle.shutdown().await.unwrap();
    }
}
