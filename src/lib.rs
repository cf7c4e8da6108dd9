//! # relayd
//!
//! A managed network-relay node: subscriber registry with bandwidth
//! quotas and expiry, live relay synchronization, and traffic
//! accounting harvested from the relay's activity log.
//!
//! ## Crates
//!
//! - [`relayd_core`] - Shared defaults and constants
//! - [`relayd_config`] - Configuration loading and validation
//! - [`relayd_store`] - Subscriber registry and traffic ledger
//! - [`relayd_ingest`] - Activity log ingestion pipeline
//! - [`relayd_manager`] - Relay lifecycle and control-plane client
//! - [`relayd_metrics`] - Prometheus metrics and registry sampler

pub mod serve;
pub mod service;
pub mod users;

pub use relayd_config as config;
pub use relayd_core as core;
pub use relayd_ingest as ingest;
pub use relayd_manager as manager;
pub use relayd_metrics as metrics;
pub use relayd_store as store;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use relayd_config::{load_config, validate_config, Config};
    pub use relayd_ingest::LogMonitor;
    pub use relayd_manager::{ProcessLauncher, RelayManager, RelayStatus};
    pub use relayd_store::{NewSubscriber, StoreConfig, Subscriber, SubscriberStore};

    pub use crate::service::SubscriberService;
}
