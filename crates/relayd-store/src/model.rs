//! Subscriber model and derived admissibility predicates.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

/// Current unix timestamp in seconds.
#[inline]
pub fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// A relay subscriber: identity plus entitlement record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subscriber {
    /// Stable surrogate key.
    pub id: i64,
    /// Unique human-readable name; also the relay log correlation key
    /// when a line carries no connection identifier.
    pub username: String,
    /// Stable opaque token (UUID) the relay uses to admit traffic.
    /// Unique, immutable once issued, never reused.
    pub connection_id: String,
    /// Authoritative gate for relay admission.
    pub active: bool,
    /// Unix seconds; 0 = never expires.
    pub expires_at: i64,
    /// Bytes; 0 = unlimited.
    pub traffic_limit: i64,
    /// Combined used bytes; only grows, except on explicit reset.
    pub traffic_used: i64,
    /// Upload bytes, tracked separately.
    pub traffic_up: i64,
    /// Download bytes, tracked separately.
    pub traffic_down: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Subscriber {
    /// Whether the subscription has expired at `now`.
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at > 0 && now >= self.expires_at
    }

    /// Whether the traffic limit has been reached.
    pub fn is_over_limit(&self) -> bool {
        self.traffic_limit > 0 && self.traffic_used >= self.traffic_limit
    }

    /// Admissibility: may this subscriber be present in the relay's
    /// live authorized set? Pure derived predicate, recomputed on read.
    pub fn can_connect(&self, now: i64) -> bool {
        self.active && !self.is_expired(now) && !self.is_over_limit()
    }

    /// Remaining traffic in bytes. -1 = unlimited, floored at 0.
    pub fn remaining_traffic(&self) -> i64 {
        if self.traffic_limit == 0 {
            return -1;
        }
        (self.traffic_limit - self.traffic_used).max(0)
    }
}

/// Fields required to create a subscriber. The connection identifier
/// is issued by the store at creation time.
#[derive(Debug, Clone)]
pub struct NewSubscriber {
    pub username: String,
    pub traffic_limit: i64,
    /// Unix seconds; 0 = never expires.
    pub expires_at: i64,
}

/// Partial update for a subscriber. `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdateSubscriber {
    pub traffic_limit: Option<i64>,
    pub expires_at: Option<i64>,
    pub active: Option<bool>,
}
