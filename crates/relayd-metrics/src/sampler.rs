//! Periodic registry sampler.
//!
//! Publishes point-in-time registry gauges from the store. Counts are
//! independent snapshots; a sample is not a consistent cross-section.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use relayd_store::SubscriberStore;

/// Run the sampler loop until the shutdown token is cancelled.
///
/// Samples once immediately, then on every interval tick.
pub async fn run_sampler(store: SubscriberStore, interval: Duration, shutdown: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                debug!("sampler shutting down");
                return;
            }

            _ = ticker.tick() => {
                sample_once(&store).await;
            }
        }
    }
}

async fn sample_once(store: &SubscriberStore) {
    let total = match store.count_total().await {
        Ok(n) => n,
        Err(e) => {
            warn!(error = %e, "failed to count subscribers");
            crate::record_error(crate::ERROR_STORE);
            return;
        }
    };
    let active = store.count_active().await.unwrap_or(0);
    let expired = store.count_expired().await.unwrap_or(0);
    let over_limit = store.count_over_limit().await.unwrap_or(0);
    crate::set_subscriber_counts(total, active, expired, over_limit);

    let subscribers = match store.list().await {
        Ok(subs) => subs,
        Err(e) => {
            warn!(error = %e, "failed to list subscribers for sampling");
            return;
        }
    };

    for sub in &subscribers {
        crate::set_subscriber_traffic(&sub.username, "upload", sub.traffic_up);
        crate::set_subscriber_traffic(&sub.username, "download", sub.traffic_down);

        let remaining = sub.remaining_traffic();
        if remaining >= 0 {
            crate::set_subscriber_limit_remaining(&sub.username, remaining);
        }
    }
}
