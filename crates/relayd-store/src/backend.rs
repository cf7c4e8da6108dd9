//! SQL subscriber store.

use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::{AnyPool, Row};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::model::{now_unix, NewSubscriber, Subscriber, UpdateSubscriber};
use crate::queries;

/// Database type enum for query selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseType {
    /// PostgreSQL database.
    PostgreSQL,
    /// MySQL/MariaDB database.
    MySQL,
    /// SQLite database.
    SQLite,
}

impl DatabaseType {
    /// Detect database type from URL.
    pub fn from_url(url: &str) -> Option<Self> {
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Some(Self::PostgreSQL)
        } else if url.starts_with("mysql://") || url.starts_with("mariadb://") {
            Some(Self::MySQL)
        } else if url.starts_with("sqlite:") {
            Some(Self::SQLite)
        } else {
            None
        }
    }
}

/// Subscriber registry + traffic ledger over SQLx.
///
/// Cheap to clone; clones share the underlying pool.
#[derive(Clone)]
pub struct SubscriberStore {
    pool: AnyPool,
    db_type: DatabaseType,
}

impl SubscriberStore {
    /// Connect to the database.
    pub async fn connect(config: StoreConfig) -> Result<Self, StoreError> {
        // Install database drivers for the "any" pool
        sqlx::any::install_default_drivers();

        let db_type = DatabaseType::from_url(&config.database_url)
            .ok_or_else(|| StoreError::backend("unsupported database URL scheme"))?;

        if db_type == DatabaseType::SQLite {
            prepare_sqlite_dir(&config.database_url).await;
        }

        let pool = AnyPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .connect(&config.database_url)
            .await?;

        info!(db = ?db_type, "subscriber store connected");
        Ok(Self { pool, db_type })
    }

    /// Create the subscriber table and indexes if they do not exist.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        let schema = match self.db_type {
            DatabaseType::PostgreSQL => queries::SCHEMA_PG,
            DatabaseType::MySQL => queries::SCHEMA_MYSQL,
            DatabaseType::SQLite => queries::SCHEMA_SQLITE,
        };
        for stmt in schema.split(';').filter(|s| !s.trim().is_empty()) {
            sqlx::query(stmt).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Create a subscriber. A fresh connection identifier is issued here
    /// and never reused, even after the subscriber is deleted.
    pub async fn create(&self, new: NewSubscriber) -> Result<Subscriber, StoreError> {
        let connection_id = Uuid::new_v4().to_string();
        let now = now_unix();

        let query = match self.db_type {
            DatabaseType::PostgreSQL => queries::INSERT_PG,
            DatabaseType::MySQL | DatabaseType::SQLite => queries::INSERT_MYSQL,
        };

        sqlx::query(query)
            .bind(&new.username)
            .bind(&connection_id)
            .bind(true)
            .bind(new.expires_at)
            .bind(new.traffic_limit)
            .bind(now)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(StoreError::from_write)?;

        self.get_by_connection_id(&connection_id).await
    }

    /// Fetch a subscriber by surrogate key.
    pub async fn get_by_id(&self, id: i64) -> Result<Subscriber, StoreError> {
        let query = match self.db_type {
            DatabaseType::PostgreSQL => queries::FIND_BY_ID_PG,
            DatabaseType::MySQL | DatabaseType::SQLite => queries::FIND_BY_ID_MYSQL,
        };
        let row = sqlx::query(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?;
        Self::parse_row(row)
    }

    /// Fetch a subscriber by username.
    pub async fn get_by_username(&self, username: &str) -> Result<Subscriber, StoreError> {
        let query = match self.db_type {
            DatabaseType::PostgreSQL => queries::FIND_BY_USERNAME_PG,
            DatabaseType::MySQL | DatabaseType::SQLite => queries::FIND_BY_USERNAME_MYSQL,
        };
        let row = sqlx::query(query)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?;
        Self::parse_row(row)
    }

    /// Fetch a subscriber by connection identifier.
    pub async fn get_by_connection_id(&self, connection_id: &str) -> Result<Subscriber, StoreError> {
        let query = match self.db_type {
            DatabaseType::PostgreSQL => queries::FIND_BY_CONNECTION_ID_PG,
            DatabaseType::MySQL | DatabaseType::SQLite => queries::FIND_BY_CONNECTION_ID_MYSQL,
        };
        let row = sqlx::query(query)
            .bind(connection_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?;
        Self::parse_row(row)
    }

    /// List all subscribers, newest first.
    pub async fn list(&self) -> Result<Vec<Subscriber>, StoreError> {
        let rows = sqlx::query(queries::LIST_ALL).fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::parse_row).collect()
    }

    /// List subscribers currently satisfying the admissibility predicate,
    /// newest first.
    pub async fn list_admissible(&self) -> Result<Vec<Subscriber>, StoreError> {
        let query = match self.db_type {
            DatabaseType::PostgreSQL => queries::LIST_ADMISSIBLE_PG,
            DatabaseType::MySQL | DatabaseType::SQLite => queries::LIST_ADMISSIBLE_MYSQL,
        };
        let rows = sqlx::query(query)
            .bind(now_unix())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Self::parse_row).collect()
    }

    /// Apply a partial update and return the new state.
    pub async fn update(&self, id: i64, update: UpdateSubscriber) -> Result<Subscriber, StoreError> {
        let current = self.get_by_id(id).await?;
        let traffic_limit = update.traffic_limit.unwrap_or(current.traffic_limit);
        let expires_at = update.expires_at.unwrap_or(current.expires_at);
        let active = update.active.unwrap_or(current.active);

        let query = match self.db_type {
            DatabaseType::PostgreSQL => queries::UPDATE_SUBSCRIBER_PG,
            DatabaseType::MySQL | DatabaseType::SQLite => queries::UPDATE_SUBSCRIBER_MYSQL,
        };
        sqlx::query(query)
            .bind(traffic_limit)
            .bind(expires_at)
            .bind(active)
            .bind(now_unix())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::from_write)?;

        self.get_by_id(id).await
    }

    /// Flip the `active` flag.
    pub async fn set_active(&self, id: i64, active: bool) -> Result<(), StoreError> {
        let query = match self.db_type {
            DatabaseType::PostgreSQL => queries::SET_ACTIVE_PG,
            DatabaseType::MySQL | DatabaseType::SQLite => queries::SET_ACTIVE_MYSQL,
        };
        let result = sqlx::query(query)
            .bind(active)
            .bind(now_unix())
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Delete a subscriber. The connection identifier is retired with it.
    pub async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let query = match self.db_type {
            DatabaseType::PostgreSQL => queries::DELETE_PG,
            DatabaseType::MySQL | DatabaseType::SQLite => queries::DELETE_MYSQL,
        };
        let result = sqlx::query(query).bind(id).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Zero the traffic counters. Does not alter `active`.
    pub async fn reset_traffic(&self, id: i64) -> Result<(), StoreError> {
        let query = match self.db_type {
            DatabaseType::PostgreSQL => queries::RESET_TRAFFIC_PG,
            DatabaseType::MySQL | DatabaseType::SQLite => queries::RESET_TRAFFIC_MYSQL,
        };
        let result = sqlx::query(query)
            .bind(now_unix())
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Atomically add traffic deltas to a subscriber's counters.
    ///
    /// After a successful increment the row is re-read; if the limit is
    /// now crossed and the subscriber is still active, `active` is
    /// flipped to false with an idempotent conditional write.
    ///
    /// Returns `true` when this call performed the deactivation.
    pub async fn record_traffic(
        &self,
        connection_id: &str,
        upload: i64,
        download: i64,
    ) -> Result<bool, StoreError> {
        let now = now_unix();
        let query = match self.db_type {
            DatabaseType::PostgreSQL => queries::ADD_TRAFFIC_PG,
            DatabaseType::MySQL | DatabaseType::SQLite => queries::ADD_TRAFFIC_MYSQL,
        };
        let result = sqlx::query(query)
            .bind(upload + download)
            .bind(upload)
            .bind(download)
            .bind(now)
            .bind(connection_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        let subscriber = self.get_by_connection_id(connection_id).await?;
        if subscriber.is_over_limit() && subscriber.active {
            let query = match self.db_type {
                DatabaseType::PostgreSQL => queries::DEACTIVATE_OVER_LIMIT_PG,
                DatabaseType::MySQL | DatabaseType::SQLite => queries::DEACTIVATE_OVER_LIMIT_MYSQL,
            };
            let result = sqlx::query(query)
                .bind(now)
                .bind(connection_id)
                .execute(&self.pool)
                .await?;
            // Zero rows affected means a concurrent increment won the
            // race and already deactivated; that is fine.
            if result.rows_affected() > 0 {
                debug!(
                    username = %subscriber.username,
                    used = subscriber.traffic_used,
                    limit = subscriber.traffic_limit,
                    "traffic limit reached, subscriber deactivated"
                );
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Total subscriber count.
    pub async fn count_total(&self) -> Result<i64, StoreError> {
        let row = sqlx::query(queries::COUNT_TOTAL)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get::<i64, _>(0)?)
    }

    /// Count of active, non-expired subscribers.
    pub async fn count_active(&self) -> Result<i64, StoreError> {
        let query = match self.db_type {
            DatabaseType::PostgreSQL => queries::COUNT_ACTIVE_PG,
            DatabaseType::MySQL | DatabaseType::SQLite => queries::COUNT_ACTIVE_MYSQL,
        };
        let row = sqlx::query(query)
            .bind(now_unix())
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get::<i64, _>(0)?)
    }

    /// Count of expired subscribers.
    pub async fn count_expired(&self) -> Result<i64, StoreError> {
        let query = match self.db_type {
            DatabaseType::PostgreSQL => queries::COUNT_EXPIRED_PG,
            DatabaseType::MySQL | DatabaseType::SQLite => queries::COUNT_EXPIRED_MYSQL,
        };
        let row = sqlx::query(query)
            .bind(now_unix())
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get::<i64, _>(0)?)
    }

    /// Count of subscribers at or over their traffic limit.
    pub async fn count_over_limit(&self) -> Result<i64, StoreError> {
        let row = sqlx::query(queries::COUNT_OVER_LIMIT)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get::<i64, _>(0)?)
    }

    /// Get the connection pool (for advanced usage).
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// Get database type.
    pub fn database_type(&self) -> DatabaseType {
        self.db_type
    }

    /// Parse a subscriber row from AnyRow.
    fn parse_row(row: AnyRow) -> Result<Subscriber, StoreError> {
        // SQLite stores booleans as integers, so try both types
        let active = row
            .try_get::<bool, _>("active")
            .or_else(|_| row.try_get::<i32, _>("active").map(|v| v != 0))
            .or_else(|_| row.try_get::<i64, _>("active").map(|v| v != 0))
            .map_err(StoreError::backend)?;

        Ok(Subscriber {
            id: row.try_get("id").map_err(StoreError::backend)?,
            username: row.try_get("username").map_err(StoreError::backend)?,
            connection_id: row
                .try_get("connection_id")
                .map_err(StoreError::backend)?,
            active,
            expires_at: row.try_get("expires_at").unwrap_or(0),
            traffic_limit: row.try_get("traffic_limit").unwrap_or(0),
            traffic_used: row.try_get("traffic_used").unwrap_or(0),
            traffic_up: row.try_get("traffic_up").unwrap_or(0),
            traffic_down: row.try_get("traffic_down").unwrap_or(0),
            created_at: row.try_get("created_at").unwrap_or(0),
            updated_at: row.try_get("updated_at").unwrap_or(0),
        })
    }
}

/// SQLite will not create the parent directory of a fresh database
/// file; do it here so first runs work out of the box. No-op for
/// in-memory databases.
async fn prepare_sqlite_dir(database_url: &str) {
    let path = match database_url.strip_prefix("sqlite:") {
        Some(rest) => rest.trim_start_matches("//"),
        None => return,
    };
    if path.starts_with(':') {
        return; // sqlite::memory:
    }
    let path = path.split('?').next().unwrap_or(path);
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                warn!(error = %e, "failed to create database directory");
            }
        }
    }
}

// Debug implementation (don't leak credentials)
impl std::fmt::Debug for SubscriberStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberStore")
            .field("db_type", &self.db_type)
            .finish_non_exhaustive()
    }
}
