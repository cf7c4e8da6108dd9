//! `relayd serve`: boot the managed relay node.
//!
//! Boot order: config → tracing → metrics exporter → store → relay →
//! log monitor → sampler → reconcile loop, then wait for a shutdown
//! signal and tear down in reverse.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use relayd_config::{apply_overrides, load_config, validate_config, CliOverrides, LoggingConfig};
use relayd_ingest::LogMonitor;
use relayd_manager::{ProcessLauncher, RelayManager};
use relayd_store::{StoreConfig, SubscriberStore};

use crate::service::{run_reconcile_loop, SubscriberService};

/// Relay node daemon arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "relayd-serve", version, about = "Run the managed relay node")]
pub struct ServeArgs {
    /// Config file path (json/yaml/toml)
    #[arg(short, long, default_value = "relayd.toml")]
    pub config: PathBuf,

    #[command(flatten)]
    pub overrides: CliOverrides,
}

/// Run the relay node with the given arguments.
pub async fn run(args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(&args.config)?;
    apply_overrides(&mut config, &args.overrides);
    validate_config(&config)?;

    init_tracing(&config.logging);
    info!(version = relayd_core::VERSION, "starting relayd");

    if let Some(listen) = &config.metrics.listen {
        match relayd_metrics::init_prometheus(listen) {
            Ok(()) => info!("metrics exporter listening on {}", listen),
            Err(e) => warn!("failed to start metrics exporter: {}", e),
        }
    }

    // Durable store
    let store = SubscriberStore::connect(
        StoreConfig::new(&config.store.database_url)
            .max_connections(config.store.max_connections)
            .min_connections(config.store.min_connections)
            .connect_timeout(Duration::from_secs(config.store.connect_timeout_secs)),
    )
    .await?;
    store.ensure_schema().await?;

    // Relay, started from registry ground truth
    let launcher = ProcessLauncher::new(&config.relay.binary, config.relay.args.clone());
    let manager = Arc::new(RelayManager::new(config.relay.clone(), Box::new(launcher)));

    let subscribers = store.list().await?;
    manager.start(&subscribers).await?;
    info!(subscribers = subscribers.len(), "relay started");

    // Traffic accounting
    let log_path = if config.ingest.log_path.is_empty() {
        config.relay.access_log.clone()
    } else {
        config.ingest.log_path.clone()
    };
    let monitor = Arc::new(LogMonitor::new(
        log_path,
        store.clone(),
        Duration::from_secs(config.ingest.flush_interval_secs),
        Duration::from_millis(config.ingest.poll_interval_ms),
    ));
    if let Err(e) = monitor.start().await {
        // traffic accounting degrades; subscriber management still works
        warn!(error = %e, "failed to start log monitor");
    }

    let shutdown = CancellationToken::new();

    tokio::spawn(relayd_metrics::run_sampler(
        store.clone(),
        Duration::from_secs(config.metrics.sample_interval_secs),
        shutdown.clone(),
    ));

    let service = SubscriberService::new(store.clone(), manager.clone());
    tokio::spawn(run_reconcile_loop(
        service,
        Duration::from_secs(config.reconcile_interval_secs),
        shutdown.clone(),
    ));

    shutdown_signal().await;
    info!("shutdown signal received");
    shutdown.cancel();

    // Final flush happens inside stop()
    monitor.stop().await;
    if let Err(e) = manager.stop().await {
        warn!(error = %e, "error stopping relay");
    }

    info!("relayd stopped");
    Ok(())
}

/// Wait for shutdown signals (SIGTERM, SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for Ctrl+C: {}", e);
            // Fall back to waiting forever
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("failed to listen for SIGTERM: {}", e);
                // Fall back to waiting forever
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// Initialize tracing subscriber with the given logging configuration.
///
/// Supports:
/// - `level`: Base log level (trace, debug, info, warn, error)
/// - `format`: Output format (json, pretty, compact). Default: pretty
/// - `output`: Output target (stdout, stderr). Default: stderr
/// - `filters`: Per-module log level overrides
fn init_tracing(config: &LoggingConfig) {
    // Build the env filter from base level and per-module filters
    let base_level = config.level.as_deref().unwrap_or("info");
    let mut filter_str = base_level.to_string();

    for (module, level) in &config.filters {
        filter_str.push(',');
        filter_str.push_str(module);
        filter_str.push('=');
        filter_str.push_str(level);
    }

    let filter = EnvFilter::try_new(&filter_str).unwrap_or_else(|_| EnvFilter::new("info"));

    let format = config.format.as_deref().unwrap_or("pretty");
    let output = config.output.as_deref().unwrap_or("stderr");

    // Create the subscriber based on format and output
    match (format, output) {
        ("json", "stdout") => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(io::stdout))
                .init();
        }
        ("json", _) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(io::stderr))
                .init();
        }
        ("compact", "stdout") => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().compact().with_writer(io::stdout))
                .init();
        }
        ("compact", _) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().compact().with_writer(io::stderr))
                .init();
        }
        (_, "stdout") => {
            // pretty is default
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(io::stdout))
                .init();
        }
        _ => {
            // pretty to stderr is default
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(io::stderr))
                .init();
        }
    }
}
