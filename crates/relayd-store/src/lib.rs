//! Subscriber registry and traffic ledger.
//!
//! Backed by SQL databases (SQLite, PostgreSQL, MySQL) through SQLx's
//! `Any` driver. The store owns two concerns:
//!
//! - the **registry**: subscriber CRUD with unique usernames and
//!   connection identifiers;
//! - the **ledger**: atomic per-subscriber traffic increments with
//!   limit-triggered deactivation, traffic resets, and point-in-time
//!   counts.
//!
//! # Database schema
//!
//! [`SubscriberStore::ensure_schema`] bootstraps the table for the
//! connected dialect. The SQLite shape:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS relay_subscribers (
//!     id INTEGER PRIMARY KEY AUTOINCREMENT,
//!     username TEXT NOT NULL UNIQUE,
//!     connection_id TEXT NOT NULL UNIQUE,
//!     active INTEGER NOT NULL DEFAULT 1,
//!     expires_at INTEGER NOT NULL DEFAULT 0,     -- unix seconds, 0 = never
//!     traffic_limit INTEGER NOT NULL DEFAULT 0,  -- bytes, 0 = unlimited
//!     traffic_used INTEGER NOT NULL DEFAULT 0,
//!     traffic_up INTEGER NOT NULL DEFAULT 0,
//!     traffic_down INTEGER NOT NULL DEFAULT 0,
//!     created_at INTEGER NOT NULL DEFAULT 0,
//!     updated_at INTEGER NOT NULL DEFAULT 0
//! );
//! ```

mod backend;
mod config;
mod error;
mod model;
mod queries;

#[cfg(test)]
mod tests;

pub use backend::{DatabaseType, SubscriberStore};
pub use config::StoreConfig;
pub use error::StoreError;
pub use model::{now_unix, NewSubscriber, Subscriber, UpdateSubscriber};
