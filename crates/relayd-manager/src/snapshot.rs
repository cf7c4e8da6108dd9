//! Relay config snapshot generation.
//!
//! The snapshot is the relay's full declarative configuration,
//! regenerated from the registry on every cold start. Only admissible
//! subscribers appear in the authorized-user list.
//!
//! Atomic write (tmp + rename) ensures the relay never reads a
//! half-written file.

use std::path::Path;

use serde_json::{json, Value};
use tracing::debug;

use relayd_config::RelaySettings;
use relayd_store::{now_unix, Subscriber};

use crate::error::ManagerError;

/// Build the relay's declarative config from a subscriber snapshot.
pub fn build_relay_config(subscribers: &[Subscriber], settings: &RelaySettings) -> Value {
    let now = now_unix();
    let users: Vec<Value> = subscribers
        .iter()
        .filter(|s| s.can_connect(now))
        .map(|s| {
            json!({
                "id": s.connection_id,
                "label": s.username,
            })
        })
        .collect();

    json!({
        "log": {
            "level": settings.log_level,
            "access": settings.access_log,
            "error": settings.error_log,
        },
        "listen": {
            "port": settings.port,
        },
        "control": {
            "listen": settings.control_addr,
        },
        "users": users,
    })
}

/// Write the config snapshot atomically.
pub async fn write_snapshot(path: &Path, config: &Value) -> Result<(), ManagerError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let tmp = path.with_extension("json.tmp");
    let data = serde_json::to_string_pretty(config)?;

    tokio::fs::write(&tmp, data.as_bytes()).await?;
    tokio::fs::rename(&tmp, path).await?;

    debug!(path = %path.display(), "relay config snapshot written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn only_admissible_subscribers_included() {
        let mut over_limit = subscriber(3, "carol", true);
        over_limit.traffic_limit = 100;
        over_limit.traffic_used = 150;
        let mut expired = subscriber(4, "dave", true);
        expired.expires_at = 1;

        let subscribers = vec![
            subscriber(1, "alice", true),
            subscriber(2, "bob", false),
            over_limit,
            expired,
        ];

        let config = build_relay_config(&subscribers, &RelaySettings::default());
        let users = config["users"].as_array().unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0]["label"], "alice");
    }

    #[test]
    fn config_carries_relay_settings() {
        let mut settings = RelaySettings::default();
        settings.port = 8443;
        settings.log_level = "debug".to_string();

        let config = build_relay_config(&[], &settings);
        assert_eq!(config["listen"]["port"], 8443);
        assert_eq!(config["log"]["level"], "debug");
        assert_eq!(config["control"]["listen"], "127.0.0.1:10085");
        assert!(config["users"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn snapshot_write_is_atomic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay/relay.json");
        let config = build_relay_config(&[subscriber(1, "alice", true)], &RelaySettings::default());

        write_snapshot(&path, &config).await.unwrap();

        let written: Value =
            serde_json::from_str(&tokio::fs::read_to_string(&path).await.unwrap()).unwrap();
        assert_eq!(written["users"].as_array().unwrap().len(), 1);
        assert!(!path.with_extension("json.tmp").exists());
    }
}
