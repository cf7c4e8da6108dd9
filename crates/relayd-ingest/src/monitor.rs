//! Log monitor: owns the tail and flush duties.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use relayd_core::defaults;
use relayd_store::{StoreError, SubscriberStore};

use crate::aggregate::{Aggregate, TrafficTable};
use crate::error::IngestError;
use crate::tail::{run_tail, TailConfig};

/// Monitor lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorStatus {
    Idle,
    Running,
    Stopping,
}

enum State {
    Idle,
    Running {
        shutdown: CancellationToken,
        tasks: Vec<JoinHandle<()>>,
    },
    Stopping,
}

/// Follows the relay access log and periodically commits accumulated
/// traffic to the store.
pub struct LogMonitor {
    log_path: PathBuf,
    store: SubscriberStore,
    flush_interval: Duration,
    poll_interval: Duration,
    table: TrafficTable,
    state: Mutex<State>,
}

impl LogMonitor {
    pub fn new(
        log_path: impl Into<PathBuf>,
        store: SubscriberStore,
        flush_interval: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            log_path: log_path.into(),
            store,
            flush_interval,
            poll_interval,
            table: TrafficTable::new(),
            state: Mutex::new(State::Idle),
        }
    }

    /// Current lifecycle status.
    pub fn status(&self) -> MonitorStatus {
        match *self.state.lock() {
            State::Idle => MonitorStatus::Idle,
            State::Running { .. } => MonitorStatus::Running,
            State::Stopping => MonitorStatus::Stopping,
        }
    }

    /// Whether the monitor is currently running.
    pub fn is_running(&self) -> bool {
        self.status() == MonitorStatus::Running
    }

    /// Start the tail and flush duties.
    ///
    /// A missing log file is created empty (the relay may not have
    /// produced output yet) rather than treated as an error.
    pub async fn start(&self) -> Result<(), IngestError> {
        if !matches!(*self.state.lock(), State::Idle) {
            return Err(IngestError::AlreadyRunning);
        }

        self.ensure_log_file().await?;

        // Spawning is synchronous, so the duties are created and the
        // running slot claimed under one lock; a concurrent start()
        // sees either Idle or the fully-populated Running state.
        let mut state = self.state.lock();
        if !matches!(*state, State::Idle) {
            return Err(IngestError::AlreadyRunning);
        }

        let shutdown = CancellationToken::new();
        let tail_task = tokio::spawn(run_tail(
            TailConfig {
                path: self.log_path.clone(),
                poll_interval: self.poll_interval,
                reopen_delay: Duration::from_millis(defaults::DEFAULT_TAIL_REOPEN_MS),
            },
            self.table.clone(),
            shutdown.clone(),
        ));
        let flush_task = tokio::spawn(run_flush(
            self.store.clone(),
            self.table.clone(),
            self.flush_interval,
            shutdown.clone(),
        ));

        *state = State::Running {
            shutdown,
            tasks: vec![tail_task, flush_task],
        };
        drop(state);

        info!(path = %self.log_path.display(), "log monitor started");
        Ok(())
    }

    /// Stop both duties and run one final flush.
    ///
    /// A no-op when the monitor is not running.
    pub async fn stop(&self) {
        let (shutdown, tasks) = {
            let mut state = self.state.lock();
            match std::mem::replace(&mut *state, State::Stopping) {
                State::Running { shutdown, tasks } => (shutdown, tasks),
                other => {
                    *state = other;
                    return;
                }
            }
        };

        shutdown.cancel();
        for task in tasks {
            let _ = task.await;
        }

        // Final flush so deltas observed since the last tick are not lost.
        let flushed = flush_table(&self.store, &self.table).await;
        debug!(entries = flushed, "final flush complete");

        *self.state.lock() = State::Idle;
        info!("log monitor stopped");
    }

    /// Commit all pending deltas to the store immediately.
    ///
    /// Returns the number of entries written.
    pub async fn flush_now(&self) -> usize {
        flush_table(&self.store, &self.table).await
    }

    /// Copy of the current aggregate table.
    pub fn stats(&self) -> HashMap<String, Aggregate> {
        self.table.stats()
    }

    async fn ensure_log_file(&self) -> Result<(), IngestError> {
        if tokio::fs::metadata(&self.log_path).await.is_ok() {
            return Ok(());
        }
        info!(path = %self.log_path.display(), "log file does not exist yet, creating");
        if let Some(parent) = self.log_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .await?;
        Ok(())
    }
}

/// Flush duty loop: commit on every interval tick until cancelled.
async fn run_flush(
    store: SubscriberStore,
    table: TrafficTable,
    interval: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                debug!("flush duty shutting down");
                return;
            }

            _ = ticker.tick() => {
                flush_table(&store, &table).await;
            }
        }
    }
}

/// Snapshot the aggregate table and commit non-zero deltas.
///
/// Keys that look like connection identifiers resolve by connection id,
/// everything else by username. Unresolvable entries are logged and
/// dropped; their deltas are already zeroed and will not be retried.
async fn flush_table(store: &SubscriberStore, table: &TrafficTable) -> usize {
    let entries = table.snapshot_deltas();
    let mut flushed = 0;

    for entry in entries {
        let lookup = if Uuid::parse_str(&entry.key).is_ok() {
            store.get_by_connection_id(&entry.key).await
        } else {
            store.get_by_username(&entry.key).await
        };

        let subscriber = match lookup {
            Ok(subscriber) => subscriber,
            Err(StoreError::NotFound) => {
                warn!(key = %entry.key, "dropping traffic for unknown subscriber");
                relayd_metrics::record_flush_dropped();
                continue;
            }
            Err(e) => {
                warn!(key = %entry.key, error = %e, "subscriber lookup failed, dropping deltas");
                relayd_metrics::record_error(relayd_metrics::ERROR_STORE);
                continue;
            }
        };

        match store
            .record_traffic(&subscriber.connection_id, entry.upload, entry.download)
            .await
        {
            Ok(deactivated) => {
                debug!(
                    username = %subscriber.username,
                    upload = entry.upload,
                    download = entry.download,
                    "traffic committed"
                );
                if deactivated {
                    info!(
                        username = %subscriber.username,
                        "subscriber reached traffic limit and was deactivated"
                    );
                }
                relayd_metrics::record_flushed_bytes("upload", entry.upload.max(0) as u64);
                relayd_metrics::record_flushed_bytes("download", entry.download.max(0) as u64);
                flushed += 1;
            }
            Err(StoreError::NotFound) => {
                warn!(key = %entry.key, "subscriber vanished mid-flush, dropping deltas");
                relayd_metrics::record_flush_dropped();
            }
            Err(e) => {
                warn!(key = %entry.key, error = %e, "traffic commit failed, dropping deltas");
                relayd_metrics::record_error(relayd_metrics::ERROR_STORE);
            }
        }
    }

    relayd_metrics::record_flush_cycle();
    flushed
}
