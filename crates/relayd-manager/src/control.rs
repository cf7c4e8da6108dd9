//! Thin control-plane client.
//!
//! Each call opens one bounded-timeout TCP connection, issues exactly
//! one newline-delimited JSON operation, and closes the connection.
//! No pooling, no retries; retry policy belongs to the caller.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::debug;
use uuid::Uuid;

use crate::error::ManagerError;

/// Control-plane operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlOp {
    AddUser,
    RemoveUser,
}

/// One control-plane request: operation, connection identifier, and a
/// human-readable label for the relay's own logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlRequest {
    pub op: ControlOp,
    pub id: String,
    pub label: String,
}

/// Control-plane acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Client for the relay's control-plane endpoint.
#[derive(Debug, Clone)]
pub struct ControlClient {
    addr: String,
    timeout: Duration,
}

impl ControlClient {
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
        }
    }

    /// Add a single authorized user to the live relay.
    pub async fn add_user(&self, connection_id: &str, label: &str) -> Result<(), ManagerError> {
        self.round_trip(ControlRequest {
            op: ControlOp::AddUser,
            id: connection_id.to_string(),
            label: label.to_string(),
        })
        .await
    }

    /// Remove a single authorized user from the live relay.
    pub async fn remove_user(&self, connection_id: &str, label: &str) -> Result<(), ManagerError> {
        self.round_trip(ControlRequest {
            op: ControlOp::RemoveUser,
            id: connection_id.to_string(),
            label: label.to_string(),
        })
        .await
    }

    async fn round_trip(&self, request: ControlRequest) -> Result<(), ManagerError> {
        // A malformed identifier is rejected locally, before any
        // network round trip.
        Uuid::parse_str(&request.id)
            .map_err(|_| ManagerError::InvalidIdentifier(request.id.clone()))?;

        let payload = serde_json::to_string(&request)?;
        let addr = self.addr.clone();

        let exchange = async move {
            let stream = TcpStream::connect(&addr).await?;
            let (read_half, mut write_half) = stream.into_split();
            write_half.write_all(payload.as_bytes()).await?;
            write_half.write_all(b"\n").await?;
            write_half.flush().await?;

            let mut line = String::new();
            BufReader::new(read_half).read_line(&mut line).await?;
            Ok::<String, std::io::Error>(line)
        };

        let line = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| ManagerError::ControlTimeout)?
            .map_err(|e| {
                ManagerError::Control(format!("connection to {} failed: {e}", self.addr))
            })?;

        let response: ControlResponse = serde_json::from_str(line.trim())
            .map_err(|e| ManagerError::Control(format!("invalid control response: {e}")))?;

        if response.ok {
            debug!(op = ?request.op, id = %request.id, "control operation acknowledged");
            Ok(())
        } else {
            Err(ManagerError::Control(
                response
                    .error
                    .unwrap_or_else(|| "unspecified control error".to_string()),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    const VALID_ID: &str = "550e8400-e29b-41d4-a716-446655440000";

    /// Spawn a one-shot control server that answers every request with
    /// the given response line and returns the received request.
    async fn one_shot_server(response: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (read_half, mut write_half) = stream.into_split();
            let mut line = String::new();
            BufReader::new(read_half).read_line(&mut line).await.unwrap();
            write_half.write_all(response.as_bytes()).await.unwrap();
            write_half.write_all(b"\n").await.unwrap();
            line
        });
        (addr, handle)
    }

    #[tokio::test]
    async fn add_user_acknowledged() {
        let (addr, server) = one_shot_server(r#"{"ok":true}"#).await;
        let client = ControlClient::new(addr, Duration::from_secs(2));

        client.add_user(VALID_ID, "alice").await.unwrap();

        let received = server.await.unwrap();
        let request: ControlRequest = serde_json::from_str(received.trim()).unwrap();
        assert_eq!(request.op, ControlOp::AddUser);
        assert_eq!(request.id, VALID_ID);
        assert_eq!(request.label, "alice");
    }

    #[tokio::test]
    async fn remove_user_error_response_surfaces() {
        let (addr, _server) =
            one_shot_server(r#"{"ok":false,"error":"no such user"}"#).await;
        let client = ControlClient::new(addr, Duration::from_secs(2));

        let err = client.remove_user(VALID_ID, "alice").await.unwrap_err();
        match err {
            ManagerError::Control(msg) => assert_eq!(msg, "no such user"),
            other => panic!("expected control error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_identifier_rejected_without_network() {
        // Address is never dialed; validation fails first.
        let client = ControlClient::new("127.0.0.1:9", Duration::from_secs(2));
        let err = client.add_user("not-a-uuid", "alice").await.unwrap_err();
        assert!(matches!(err, ManagerError::InvalidIdentifier(_)));
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        // Accept and hold the connection without replying.
        let _server = tokio::spawn(async move {
            let (_stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(60)).await;
        });

        let client = ControlClient::new(addr, Duration::from_millis(100));
        let err = client.add_user(VALID_ID, "alice").await.unwrap_err();
        assert!(matches!(err, ManagerError::ControlTimeout));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_control_error() {
        // Port 1 is essentially never listening.
        let client = ControlClient::new("127.0.0.1:1", Duration::from_secs(2));
        let err = client.add_user(VALID_ID, "alice").await.unwrap_err();
        assert!(matches!(
            err,
            ManagerError::Control(_) | ManagerError::ControlTimeout
        ));
    }
}
