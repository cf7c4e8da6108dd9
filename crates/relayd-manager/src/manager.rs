//! Relay reconciler: owns the relay instance lifecycle.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, warn};

use relayd_config::RelaySettings;
use relayd_store::{now_unix, Subscriber};

use crate::control::ControlClient;
use crate::error::ManagerError;
use crate::process::{RelayHandle, RelayLauncher};
use crate::snapshot::{build_relay_config, write_snapshot};

/// Relay runtime status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayStatus {
    Stopped,
    Starting,
    Running,
    Restarting,
}

#[derive(Default)]
struct Inner {
    handle: Option<Box<dyn RelayHandle>>,
}

/// Owns the relay process lifecycle and the two reconciliation paths.
///
/// Structural operations (`start`/`stop`/`restart`) serialize on an
/// internal async mutex and may block on process I/O. Hot patches do
/// not take that lock; callers must not race a hot patch against a
/// structural operation on the same instance.
pub struct RelayManager {
    settings: RelaySettings,
    control: ControlClient,
    launcher: Box<dyn RelayLauncher>,
    inner: AsyncMutex<Inner>,
    status: RwLock<RelayStatus>,
    last_applied: Mutex<HashSet<String>>,
}

impl RelayManager {
    pub fn new(settings: RelaySettings, launcher: Box<dyn RelayLauncher>) -> Self {
        let control = ControlClient::new(
            settings.control_addr.clone(),
            Duration::from_secs(settings.control_timeout_secs),
        );
        Self {
            settings,
            control,
            launcher,
            inner: AsyncMutex::new(Inner::default()),
            status: RwLock::new(RelayStatus::Stopped),
            last_applied: Mutex::new(HashSet::new()),
        }
    }

    /// Current relay status.
    pub fn status(&self) -> RelayStatus {
        *self.status.read()
    }

    /// Whether the relay is currently running.
    pub fn is_running(&self) -> bool {
        self.status() == RelayStatus::Running
    }

    /// Connection identifiers recorded at the last full regeneration.
    ///
    /// Hot patches do not update this set, so it can lag the live
    /// relay until the next restart.
    pub fn last_applied(&self) -> HashSet<String> {
        self.last_applied.lock().clone()
    }

    /// Regenerate the relay config from the subscriber snapshot and
    /// launch the instance. Only admissible subscribers are authorized.
    pub async fn start(&self, subscribers: &[Subscriber]) -> Result<(), ManagerError> {
        let mut inner = self.inner.lock().await;
        if self.status() != RelayStatus::Stopped {
            return Err(ManagerError::AlreadyRunning);
        }
        self.start_locked(&mut inner, subscribers).await
    }

    /// Tear the relay down.
    ///
    /// Always transitions to `Stopped`, even when teardown reports an
    /// error: a half-torn-down relay must not be treated as running.
    /// The error is still surfaced to the caller.
    pub async fn stop(&self) -> Result<(), ManagerError> {
        let mut inner = self.inner.lock().await;
        if self.status() != RelayStatus::Running {
            return Err(ManagerError::NotRunning);
        }
        let result = Self::teardown(&mut inner).await;
        self.set_status(RelayStatus::Stopped);
        relayd_metrics::set_relay_running(false);
        info!("relay stopped");
        result
    }

    /// Full resynchronization: stop (tolerating a stopped relay), then
    /// start from the given snapshot.
    pub async fn restart(&self, subscribers: &[Subscriber]) -> Result<(), ManagerError> {
        let mut inner = self.inner.lock().await;
        info!("restarting relay");
        if self.status() == RelayStatus::Running {
            self.set_status(RelayStatus::Restarting);
            if let Err(e) = Self::teardown(&mut inner).await {
                warn!(error = %e, "relay teardown reported an error");
            }
        }
        self.set_status(RelayStatus::Stopped);
        let result = self.start_locked(&mut inner, subscribers).await;
        if result.is_ok() {
            relayd_metrics::record_relay_restart();
        }
        result
    }

    /// Add one authorized user to the live relay without a restart.
    ///
    /// Best-effort: does not update the last-applied snapshot.
    pub async fn add_user_hot(&self, subscriber: &Subscriber) -> Result<(), ManagerError> {
        if !self.is_running() {
            return Err(ManagerError::NotRunning);
        }
        self.control
            .add_user(&subscriber.connection_id, &subscriber.username)
            .await
    }

    /// Remove one authorized user from the live relay without a restart.
    ///
    /// Best-effort: does not update the last-applied snapshot.
    pub async fn remove_user_hot(&self, subscriber: &Subscriber) -> Result<(), ManagerError> {
        if !self.is_running() {
            return Err(ManagerError::NotRunning);
        }
        self.control
            .remove_user(&subscriber.connection_id, &subscriber.username)
            .await
    }

    fn set_status(&self, status: RelayStatus) {
        *self.status.write() = status;
    }

    async fn teardown(inner: &mut Inner) -> Result<(), ManagerError> {
        match inner.handle.take() {
            Some(handle) => handle.shutdown().await,
            None => Ok(()),
        }
    }

    /// Shared start path; caller holds the structural-op lock.
    async fn start_locked(
        &self,
        inner: &mut Inner,
        subscribers: &[Subscriber],
    ) -> Result<(), ManagerError> {
        self.set_status(RelayStatus::Starting);

        let now = now_unix();
        let admissible: HashSet<String> = subscribers
            .iter()
            .filter(|s| s.can_connect(now))
            .map(|s| s.connection_id.clone())
            .collect();

        let config = build_relay_config(subscribers, &self.settings);
        let path = Path::new(&self.settings.snapshot_path);

        let launched = match write_snapshot(path, &config).await {
            Ok(()) => self.launcher.launch(path).await,
            Err(e) => Err(e),
        };

        match launched {
            Ok(handle) => {
                inner.handle = Some(handle);
                let user_count = admissible.len();
                *self.last_applied.lock() = admissible;
                self.set_status(RelayStatus::Running);
                relayd_metrics::set_relay_running(true);
                info!(users = user_count, port = self.settings.port, "relay started");
                Ok(())
            }
            Err(e) => {
                // Fail-safe: never claim Running after a failed start.
                inner.handle = None;
                self.set_status(RelayStatus::Stopped);
                relayd_metrics::set_relay_running(false);
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for RelayManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayManager")
            .field("status", &self.status())
            .field("control_addr", &self.settings.control_addr)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;

    #[derive(Default)]
    struct FakeCounters {
        launches: AtomicUsize,
        shutdowns: AtomicUsize,
    }

    struct FakeLauncher {
        counters: Arc<FakeCounters>,
        fail_launch: bool,
        fail_shutdown: bool,
    }

    struct FakeHandle {
        counters: Arc<FakeCounters>,
        fail_shutdown: bool,
    }

    #[async_trait]
    impl RelayLauncher for FakeLauncher {
        async fn launch(&self, _config_path: &Path) -> Result<Box<dyn RelayHandle>, ManagerError> {
            self.counters.launches.fetch_add(1, Ordering::SeqCst);
            if self.fail_launch {
                return Err(ManagerError::Launch("fake launch failure".into()));
            }
            Ok(Box::new(FakeHandle {
                counters: self.counters.clone(),
                fail_shutdown: self.fail_shutdown,
            }))
        }
    }

    #[async_trait]
    impl RelayHandle for FakeHandle {
        async fn shutdown(self: Box<Self>) -> Result<(), ManagerError> {
            self.counters.shutdowns.fetch_add(1, Ordering::SeqCst);
            if self.fail_shutdown {
                return Err(ManagerError::Launch("fake teardown failure".into()));
            }
            Ok(())
        }
    }

    fn test_manager(
        dir: &tempfile::TempDir,
        fail_launch: bool,
        fail_shutdown: bool,
    ) -> (RelayManager, Arc<FakeCounters>) {
        let counters = Arc::new(FakeCounters::default());
        let mut settings = RelaySettings::default();
        settings.snapshot_path = dir
            .path()
            .join("relay.json")
            .to_string_lossy()
            .into_owned();
        let launcher = FakeLauncher {
            counters: counters.clone(),
            fail_launch,
            fail_shutdown,
        };
        (RelayManager::new(settings, Box::new(launcher)), counters)
    }

    fn subscriber(id: i64, username: &str, active: bool) -> Subscriber {
        Subscriber {
            id,
            username: username.to_string(),
            connection_id: format!("550e8400-e29b-41d4-a716-44665544{id:04}"),
            active,
            expires_at: 0,
            traffic_limit: 0,
            traffic_used: 0,
            traffic_up: 0,
            traffic_down: 0,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[tokio::test]
    async fn start_records_admissible_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, counters) = test_manager(&dir, false, false);

        let subs = vec![
            subscriber(1, "alice", true),
            subscriber(2, "bob", false),
        ];
        manager.start(&subs).await.unwrap();

        assert_eq!(manager.status(), RelayStatus::Running);
        assert_eq!(counters.launches.load(Ordering::SeqCst), 1);
        let applied = manager.last_applied();
        assert_eq!(applied.len(), 1);
        assert!(applied.contains(&subs[0].connection_id));
    }

    #[tokio::test]
    async fn double_start_rejected_and_state_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, counters) = test_manager(&dir, false, false);

        manager.start(&[subscriber(1, "alice", true)]).await.unwrap();
        let err = manager.start(&[]).await.unwrap_err();

        assert!(matches!(err, ManagerError::AlreadyRunning));
        assert_eq!(manager.status(), RelayStatus::Running);
        assert_eq!(counters.launches.load(Ordering::SeqCst), 1);
        assert_eq!(manager.last_applied().len(), 1);
    }

    #[tokio::test]
    async fn failed_start_lands_in_stopped() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, _) = test_manager(&dir, true, false);

        let err = manager.start(&[]).await.unwrap_err();
        assert!(matches!(err, ManagerError::Launch(_)));
        assert_eq!(manager.status(), RelayStatus::Stopped);
        assert!(!manager.is_running());
    }

    #[tokio::test]
    async fn stop_while_stopped_is_not_running() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, _) = test_manager(&dir, false, false);

        let err = manager.stop().await.unwrap_err();
        assert!(matches!(err, ManagerError::NotRunning));
        assert_eq!(manager.status(), RelayStatus::Stopped);
    }

    #[tokio::test]
    async fn stop_tears_down_instance() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, counters) = test_manager(&dir, false, false);

        manager.start(&[]).await.unwrap();
        manager.stop().await.unwrap();

        assert_eq!(manager.status(), RelayStatus::Stopped);
        assert_eq!(counters.shutdowns.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stop_surfaces_teardown_error_but_transitions() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, _) = test_manager(&dir, false, true);

        manager.start(&[]).await.unwrap();
        let err = manager.stop().await;

        assert!(err.is_err());
        // a half-torn-down relay is still not Running
        assert_eq!(manager.status(), RelayStatus::Stopped);
    }

    #[tokio::test]
    async fn restart_replaces_instance_and_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, counters) = test_manager(&dir, false, false);

        manager.start(&[subscriber(1, "alice", true)]).await.unwrap();
        manager
            .restart(&[subscriber(2, "bob", true)])
            .await
            .unwrap();

        assert_eq!(manager.status(), RelayStatus::Running);
        assert_eq!(counters.launches.load(Ordering::SeqCst), 2);
        assert_eq!(counters.shutdowns.load(Ordering::SeqCst), 1);
        let applied = manager.last_applied();
        assert_eq!(applied.len(), 1);
        assert!(applied.contains(&subscriber(2, "bob", true).connection_id));
    }

    #[tokio::test]
    async fn restart_tolerates_stopped_relay() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, counters) = test_manager(&dir, false, false);

        manager.restart(&[subscriber(1, "alice", true)]).await.unwrap();

        assert_eq!(manager.status(), RelayStatus::Running);
        assert_eq!(counters.launches.load(Ordering::SeqCst), 1);
        assert_eq!(counters.shutdowns.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn hot_ops_require_running_relay() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, _) = test_manager(&dir, false, false);
        let sub = subscriber(1, "alice", true);

        // no network call is attempted; the status check fails first
        assert!(matches!(
            manager.add_user_hot(&sub).await,
            Err(ManagerError::NotRunning)
        ));
        assert!(matches!(
            manager.remove_user_hot(&sub).await,
            Err(ManagerError::NotRunning)
        ));
    }

    #[tokio::test]
    async fn hot_ops_do_not_touch_last_applied() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, _) = test_manager(&dir, false, false);

        let alice = subscriber(1, "alice", true);
        manager.start(std::slice::from_ref(&alice)).await.unwrap();
        let before = manager.last_applied();

        // the control endpoint is not listening, so the hot call fails;
        // either way the snapshot must be untouched
        let _ = manager.remove_user_hot(&alice).await;
        assert_eq!(manager.last_applied(), before);
    }
}
