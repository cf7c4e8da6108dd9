//! `relayd user`: manage subscribers in the registry.
//!
//! The daemon's periodic reconcile loop picks registry changes up, so
//! this CLI only touches the database.
//!
//! ```bash
//! # Add a subscriber
//! relayd user add -d sqlite:data/relayd.db -u alice --traffic-limit 10GB --expires 30d
//!
//! # List subscribers
//! relayd user list -d sqlite:data/relayd.db
//!
//! # Reset a traffic counter
//! relayd user reset-traffic -d sqlite:data/relayd.db -i 3
//! ```

use clap::{Parser, Subcommand};
use tabled::{Table, Tabled};

use relayd_store::{now_unix, NewSubscriber, StoreConfig, Subscriber, SubscriberStore, UpdateSubscriber};

/// Subscriber management CLI arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "relayd-user", version, about = "Manage relay subscribers")]
pub struct UserArgs {
    #[command(subcommand)]
    pub command: UserCommands,
}

/// Subscriber CLI subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum UserCommands {
    /// Initialize the database schema.
    Init {
        /// Database connection URL.
        #[arg(short, long, env = "RELAYD_DATABASE_URL")]
        database: String,
    },

    /// Add a new subscriber.
    Add {
        /// Database connection URL.
        #[arg(short, long, env = "RELAYD_DATABASE_URL")]
        database: String,

        /// Username (unique).
        #[arg(short, long)]
        username: String,

        /// Traffic limit (e.g., "10GB", "500MB", "0" for unlimited).
        #[arg(short, long, default_value = "0")]
        traffic_limit: String,

        /// Expiration ("30d" for 30 days, a unix timestamp, "0" for never).
        #[arg(short, long, default_value = "0")]
        expires: String,
    },

    /// List all subscribers.
    List {
        /// Database connection URL.
        #[arg(short, long, env = "RELAYD_DATABASE_URL")]
        database: String,

        /// Output format (table, json).
        #[arg(short, long, default_value = "table")]
        format: String,

        /// Show only currently admissible subscribers.
        #[arg(long)]
        admissible: bool,
    },

    /// Update subscriber settings.
    Update {
        /// Database connection URL.
        #[arg(short, long, env = "RELAYD_DATABASE_URL")]
        database: String,

        /// Subscriber ID to update.
        #[arg(short, long)]
        id: i64,

        /// New traffic limit (e.g., "10GB", "500MB").
        #[arg(short, long)]
        traffic_limit: Option<String>,

        /// New expiration ("30d", unix timestamp, "0" for never).
        #[arg(short, long)]
        expires: Option<String>,

        /// Activate the subscriber.
        #[arg(long, conflicts_with = "deactivate")]
        activate: bool,

        /// Deactivate the subscriber.
        #[arg(long)]
        deactivate: bool,
    },

    /// Remove a subscriber.
    Remove {
        /// Database connection URL.
        #[arg(short, long, env = "RELAYD_DATABASE_URL")]
        database: String,

        /// Subscriber ID to remove.
        #[arg(short, long)]
        id: i64,
    },

    /// Reset a subscriber's traffic counters.
    ResetTraffic {
        /// Database connection URL.
        #[arg(short, long, env = "RELAYD_DATABASE_URL")]
        database: String,

        /// Subscriber ID to reset.
        #[arg(short, long)]
        id: i64,
    },
}

/// Subscriber row for table display.
#[derive(Tabled)]
struct SubscriberDisplay {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Username")]
    username: String,
    #[tabled(rename = "Connection ID")]
    connection_id: String,
    #[tabled(rename = "Active")]
    active: String,
    #[tabled(rename = "Used / Limit")]
    traffic: String,
    #[tabled(rename = "Expires")]
    expires: String,
}

impl SubscriberDisplay {
    fn from_subscriber(sub: &Subscriber) -> Self {
        let limit = if sub.traffic_limit == 0 {
            "unlimited".to_string()
        } else {
            format_bytes(sub.traffic_limit)
        };
        let expires = if sub.expires_at == 0 {
            "never".to_string()
        } else if sub.is_expired(now_unix()) {
            format!("{} (expired)", sub.expires_at)
        } else {
            sub.expires_at.to_string()
        };
        Self {
            id: sub.id,
            username: sub.username.clone(),
            connection_id: sub.connection_id.clone(),
            active: if sub.active { "yes" } else { "no" }.to_string(),
            traffic: format!("{} / {}", format_bytes(sub.traffic_used), limit),
            expires,
        }
    }
}

/// Run the subscriber CLI with the given arguments.
pub async fn run(args: UserArgs) -> Result<(), Box<dyn std::error::Error>> {
    match args.command {
        UserCommands::Init { database } => {
            let store = connect(&database).await?;
            store.ensure_schema().await?;
            println!("Database schema initialized.");
            Ok(())
        }
        UserCommands::Add {
            database,
            username,
            traffic_limit,
            expires,
        } => {
            let store = connect(&database).await?;
            let subscriber = store
                .create(NewSubscriber {
                    username,
                    traffic_limit: parse_traffic(&traffic_limit)?,
                    expires_at: parse_expires(&expires)?,
                })
                .await?;
            println!(
                "Subscriber '{}' created (id {}, connection id {}).",
                subscriber.username, subscriber.id, subscriber.connection_id
            );
            Ok(())
        }
        UserCommands::List {
            database,
            format,
            admissible,
        } => {
            let store = connect(&database).await?;
            let subscribers = if admissible {
                store.list_admissible().await?
            } else {
                store.list().await?
            };
            match format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&subscribers)?),
                _ => {
                    let rows: Vec<SubscriberDisplay> = subscribers
                        .iter()
                        .map(SubscriberDisplay::from_subscriber)
                        .collect();
                    println!("{}", Table::new(rows));
                }
            }
            Ok(())
        }
        UserCommands::Update {
            database,
            id,
            traffic_limit,
            expires,
            activate,
            deactivate,
        } => {
            let store = connect(&database).await?;
            let active = if activate {
                Some(true)
            } else if deactivate {
                Some(false)
            } else {
                None
            };
            let update = UpdateSubscriber {
                traffic_limit: traffic_limit.as_deref().map(parse_traffic).transpose()?,
                expires_at: expires.as_deref().map(parse_expires).transpose()?,
                active,
            };
            let subscriber = store.update(id, update).await?;
            println!("Subscriber '{}' updated.", subscriber.username);
            Ok(())
        }
        UserCommands::Remove { database, id } => {
            let store = connect(&database).await?;
            store.delete(id).await?;
            println!("Subscriber {} removed.", id);
            Ok(())
        }
        UserCommands::ResetTraffic { database, id } => {
            let store = connect(&database).await?;
            store.reset_traffic(id).await?;
            println!("Traffic counters for subscriber {} reset.", id);
            Ok(())
        }
    }
}

/// Connect with a minimal single-connection pool.
async fn connect(url: &str) -> Result<SubscriberStore, Box<dyn std::error::Error>> {
    Ok(SubscriberStore::connect(StoreConfig::new(url).max_connections(1)).await?)
}

/// Parse a traffic size string (e.g., "10GB", "500MB") to bytes.
fn parse_traffic(s: &str) -> Result<i64, Box<dyn std::error::Error>> {
    let s = s.trim().to_uppercase();
    if s == "0" || s.is_empty() {
        return Ok(0);
    }

    let (num, unit) = if let Some(stripped) = s.strip_suffix("TB") {
        (stripped, 1024i64 * 1024 * 1024 * 1024)
    } else if let Some(stripped) = s.strip_suffix("GB") {
        (stripped, 1024i64 * 1024 * 1024)
    } else if let Some(stripped) = s.strip_suffix("MB") {
        (stripped, 1024i64 * 1024)
    } else if let Some(stripped) = s.strip_suffix("KB") {
        (stripped, 1024i64)
    } else if let Some(stripped) = s.strip_suffix('B') {
        (stripped, 1i64)
    } else {
        // Assume bytes if no unit
        (s.as_str(), 1i64)
    };

    let value: f64 = num.trim().parse()?;
    Ok((value * unit as f64) as i64)
}

/// Parse an expiration string to a unix timestamp.
fn parse_expires(s: &str) -> Result<i64, Box<dyn std::error::Error>> {
    let s = s.trim();
    if s == "0" || s.is_empty() {
        return Ok(0);
    }

    // Relative durations: "30d", "6m", "1y"
    if let Some(stripped) = s.strip_suffix(['d', 'D']) {
        let days: i64 = stripped.parse()?;
        return Ok(now_unix() + days * 24 * 60 * 60);
    }
    if let Some(stripped) = s.strip_suffix(['m', 'M']) {
        let months: i64 = stripped.parse()?;
        return Ok(now_unix() + months * 30 * 24 * 60 * 60);
    }
    if let Some(stripped) = s.strip_suffix(['y', 'Y']) {
        let years: i64 = stripped.parse()?;
        return Ok(now_unix() + years * 365 * 24 * 60 * 60);
    }

    // Absolute unix timestamp
    if let Ok(ts) = s.parse::<i64>() {
        return Ok(ts);
    }

    Err(format!("invalid expiration format: {}", s).into())
}

/// Format bytes to a human-readable string.
fn format_bytes(bytes: i64) -> String {
    const KB: i64 = 1024;
    const MB: i64 = KB * 1024;
    const GB: i64 = MB * 1024;
    const TB: i64 = GB * 1024;

    if bytes >= TB {
        format!("{:.2} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
