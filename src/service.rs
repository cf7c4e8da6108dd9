//! Subscriber service: registry mutations plus reconciliation policy.
//!
//! Every registry write commits first; keeping the live relay in sync
//! is best-effort and failures are logged as warnings, never rolled
//! back. Single-subscriber changes go through the hot path while the
//! relay is running, falling back to a full restart when a hot patch
//! fails. The periodic reconcile loop repairs any remaining drift with
//! a full resynchronization; restart always wins.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use relayd_manager::RelayManager;
use relayd_store::{
    now_unix, NewSubscriber, StoreError, Subscriber, SubscriberStore, UpdateSubscriber,
};

/// Point-in-time registry statistics. Counts are independent
/// snapshots, not a consistent cross-section.
#[derive(Debug, Clone)]
pub struct ServiceStats {
    pub total: i64,
    pub active: i64,
    pub expired: i64,
    pub over_limit: i64,
    pub relay_running: bool,
}

/// Health snapshot.
#[derive(Debug, Clone)]
pub struct Health {
    pub healthy: bool,
    pub database_ok: bool,
    pub relay_running: bool,
}

/// Registry operations with relay synchronization.
#[derive(Clone)]
pub struct SubscriberService {
    store: SubscriberStore,
    manager: Arc<RelayManager>,
}

impl SubscriberService {
    pub fn new(store: SubscriberStore, manager: Arc<RelayManager>) -> Self {
        Self { store, manager }
    }

    pub fn store(&self) -> &SubscriberStore {
        &self.store
    }

    pub fn manager(&self) -> &RelayManager {
        &self.manager
    }

    /// Create a subscriber and authorize it on the live relay.
    pub async fn create(&self, new: NewSubscriber) -> Result<Subscriber, StoreError> {
        let subscriber = self.store.create(new).await?;
        info!(username = %subscriber.username, id = subscriber.id, "subscriber created");
        if subscriber.can_connect(now_unix()) {
            self.sync_added(&subscriber).await;
        }
        Ok(subscriber)
    }

    /// Apply a partial update, syncing the relay when admissibility
    /// changed either way.
    pub async fn update(
        &self,
        id: i64,
        update: UpdateSubscriber,
    ) -> Result<Subscriber, StoreError> {
        let before = self.store.get_by_id(id).await?;
        let after = self.store.update(id, update).await?;

        let now = now_unix();
        match (before.can_connect(now), after.can_connect(now)) {
            (false, true) => self.sync_added(&after).await,
            (true, false) => self.sync_removed(&after).await,
            _ => {}
        }
        Ok(after)
    }

    /// Delete a subscriber and revoke it from the live relay.
    pub async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let subscriber = self.store.get_by_id(id).await?;
        self.store.delete(id).await?;
        info!(username = %subscriber.username, id, "subscriber deleted");
        self.sync_removed(&subscriber).await;
        Ok(())
    }

    /// Flip the active flag.
    pub async fn set_active(&self, id: i64, active: bool) -> Result<Subscriber, StoreError> {
        self.update(
            id,
            UpdateSubscriber {
                active: Some(active),
                ..Default::default()
            },
        )
        .await
    }

    /// Zero the traffic counters. Admissibility can recover as a
    /// result (the limit clause no longer fails), in which case the
    /// relay is re-synchronized.
    pub async fn reset_traffic(&self, id: i64) -> Result<Subscriber, StoreError> {
        let before = self.store.get_by_id(id).await?;
        self.store.reset_traffic(id).await?;
        let after = self.store.get_by_id(id).await?;

        let now = now_unix();
        if !before.can_connect(now) && after.can_connect(now) {
            self.sync_added(&after).await;
        }
        Ok(after)
    }

    /// One reconcile cycle: compare registry admissibility against the
    /// last fully-applied relay snapshot and resynchronize on drift.
    ///
    /// Drift is repaired with a full restart rather than hot patches:
    /// hot patches intentionally do not update the durable snapshot,
    /// so the diff cannot tell a pending patch from real divergence.
    /// Returns whether drift was found.
    pub async fn reconcile_once(&self) -> Result<bool, StoreError> {
        if !self.manager.is_running() {
            return Ok(false);
        }

        let subscribers = self.store.list().await?;
        let now = now_unix();
        let admissible: HashSet<String> = subscribers
            .iter()
            .filter(|s| s.can_connect(now))
            .map(|s| s.connection_id.clone())
            .collect();
        let applied = self.manager.last_applied();

        if admissible == applied {
            debug!("relay in sync with registry");
            return Ok(false);
        }

        let added = admissible.difference(&applied).count();
        let removed = applied.difference(&admissible).count();
        info!(added, removed, "registry drift detected, resynchronizing relay");

        if let Err(e) = self.manager.restart(&subscribers).await {
            warn!(error = %e, "drift resynchronization failed");
        }
        Ok(true)
    }

    /// Registry statistics plus relay state.
    pub async fn stats(&self) -> Result<ServiceStats, StoreError> {
        Ok(ServiceStats {
            total: self.store.count_total().await?,
            active: self.store.count_active().await?,
            expired: self.store.count_expired().await?,
            over_limit: self.store.count_over_limit().await?,
            relay_running: self.manager.is_running(),
        })
    }

    /// Service health snapshot.
    pub async fn health(&self) -> Health {
        let database_ok = self.store.count_total().await.is_ok();
        let relay_running = self.manager.is_running();
        Health {
            healthy: database_ok,
            database_ok,
            relay_running,
        }
    }

    async fn sync_added(&self, subscriber: &Subscriber) {
        if !self.manager.is_running() {
            return;
        }
        if let Err(e) = self.manager.add_user_hot(subscriber).await {
            warn!(
                username = %subscriber.username,
                error = %e,
                "hot add failed, falling back to full restart"
            );
            self.full_restart().await;
        }
    }

    async fn sync_removed(&self, subscriber: &Subscriber) {
        if !self.manager.is_running() {
            return;
        }
        if let Err(e) = self.manager.remove_user_hot(subscriber).await {
            warn!(
                username = %subscriber.username,
                error = %e,
                "hot remove failed, falling back to full restart"
            );
            self.full_restart().await;
        }
    }

    /// Full regeneration from registry ground truth. Reconciliation is
    /// best-effort for callers: errors are warnings here.
    async fn full_restart(&self) {
        let subscribers = match self.store.list().await {
            Ok(subscribers) => subscribers,
            Err(e) => {
                warn!(error = %e, "cannot list subscribers for relay restart");
                return;
            }
        };
        if let Err(e) = self.manager.restart(&subscribers).await {
            warn!(error = %e, "relay restart failed");
        }
    }
}

/// Run the periodic reconcile loop until cancelled.
pub async fn run_reconcile_loop(
    service: SubscriberService,
    interval: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                debug!("reconcile loop shutting down");
                return;
            }

            _ = ticker.tick() => {
                if let Err(e) = service.reconcile_once().await {
                    warn!(error = %e, "reconcile cycle failed");
                }
            }
        }
    }
}
