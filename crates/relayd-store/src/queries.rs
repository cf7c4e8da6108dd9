//! SQL statements for the supported dialects.
//!
//! PostgreSQL uses `$n` placeholders; MySQL and SQLite use `?`.

pub const INSERT_PG: &str = r#"
INSERT INTO relay_subscribers
    (username, connection_id, active, expires_at, traffic_limit, created_at, updated_at)
VALUES ($1, $2, $3, $4, $5, $6, $7)
"#;

pub const INSERT_MYSQL: &str = r#"
INSERT INTO relay_subscribers
    (username, connection_id, active, expires_at, traffic_limit, created_at, updated_at)
VALUES (?, ?, ?, ?, ?, ?, ?)
"#;

pub const FIND_BY_ID_PG: &str = r#"
SELECT id, username, connection_id, active, expires_at, traffic_limit,
       traffic_used, traffic_up, traffic_down, created_at, updated_at
FROM relay_subscribers WHERE id = $1
"#;

pub const FIND_BY_ID_MYSQL: &str = r#"
SELECT id, username, connection_id, active, expires_at, traffic_limit,
       traffic_used, traffic_up, traffic_down, created_at, updated_at
FROM relay_subscribers WHERE id = ?
"#;

pub const FIND_BY_USERNAME_PG: &str = r#"
SELECT id, username, connection_id, active, expires_at, traffic_limit,
       traffic_used, traffic_up, traffic_down, created_at, updated_at
FROM relay_subscribers WHERE username = $1
"#;

pub const FIND_BY_USERNAME_MYSQL: &str = r#"
SELECT id, username, connection_id, active, expires_at, traffic_limit,
       traffic_used, traffic_up, traffic_down, created_at, updated_at
FROM relay_subscribers WHERE username = ?
"#;

pub const FIND_BY_CONNECTION_ID_PG: &str = r#"
SELECT id, username, connection_id, active, expires_at, traffic_limit,
       traffic_used, traffic_up, traffic_down, created_at, updated_at
FROM relay_subscribers WHERE connection_id = $1
"#;

pub const FIND_BY_CONNECTION_ID_MYSQL: &str = r#"
SELECT id, username, connection_id, active, expires_at, traffic_limit,
       traffic_used, traffic_up, traffic_down, created_at, updated_at
FROM relay_subscribers WHERE connection_id = ?
"#;

pub const LIST_ALL: &str = r#"
SELECT id, username, connection_id, active, expires_at, traffic_limit,
       traffic_used, traffic_up, traffic_down, created_at, updated_at
FROM relay_subscribers ORDER BY created_at DESC
"#;

pub const LIST_ADMISSIBLE_PG: &str = r#"
SELECT id, username, connection_id, active, expires_at, traffic_limit,
       traffic_used, traffic_up, traffic_down, created_at, updated_at
FROM relay_subscribers
WHERE active = TRUE
  AND (expires_at = 0 OR expires_at > $1)
  AND (traffic_limit = 0 OR traffic_used < traffic_limit)
ORDER BY created_at DESC
"#;

pub const LIST_ADMISSIBLE_MYSQL: &str = r#"
SELECT id, username, connection_id, active, expires_at, traffic_limit,
       traffic_used, traffic_up, traffic_down, created_at, updated_at
FROM relay_subscribers
WHERE active = TRUE
  AND (expires_at = 0 OR expires_at > ?)
  AND (traffic_limit = 0 OR traffic_used < traffic_limit)
ORDER BY created_at DESC
"#;

pub const UPDATE_SUBSCRIBER_PG: &str = r#"
UPDATE relay_subscribers
SET traffic_limit = $1, expires_at = $2, active = $3, updated_at = $4
WHERE id = $5
"#;

pub const UPDATE_SUBSCRIBER_MYSQL: &str = r#"
UPDATE relay_subscribers
SET traffic_limit = ?, expires_at = ?, active = ?, updated_at = ?
WHERE id = ?
"#;

pub const SET_ACTIVE_PG: &str = r#"
UPDATE relay_subscribers SET active = $1, updated_at = $2 WHERE id = $3
"#;

pub const SET_ACTIVE_MYSQL: &str = r#"
UPDATE relay_subscribers SET active = ?, updated_at = ? WHERE id = ?
"#;

pub const DELETE_PG: &str = "DELETE FROM relay_subscribers WHERE id = $1";

pub const DELETE_MYSQL: &str = "DELETE FROM relay_subscribers WHERE id = ?";

pub const ADD_TRAFFIC_PG: &str = r#"
UPDATE relay_subscribers
SET traffic_used = traffic_used + $1,
    traffic_up = traffic_up + $2,
    traffic_down = traffic_down + $3,
    updated_at = $4
WHERE connection_id = $5
"#;

pub const ADD_TRAFFIC_MYSQL: &str = r#"
UPDATE relay_subscribers
SET traffic_used = traffic_used + ?,
    traffic_up = traffic_up + ?,
    traffic_down = traffic_down + ?,
    updated_at = ?
WHERE connection_id = ?
"#;

/// Limit-triggered deactivation. The `active = TRUE` guard makes the
/// write idempotent under concurrent increments: losing the race means
/// zero rows affected, which is success, not an error.
pub const DEACTIVATE_OVER_LIMIT_PG: &str = r#"
UPDATE relay_subscribers SET active = FALSE, updated_at = $1
WHERE connection_id = $2 AND active = TRUE
"#;

pub const DEACTIVATE_OVER_LIMIT_MYSQL: &str = r#"
UPDATE relay_subscribers SET active = FALSE, updated_at = ?
WHERE connection_id = ? AND active = TRUE
"#;

pub const RESET_TRAFFIC_PG: &str = r#"
UPDATE relay_subscribers
SET traffic_used = 0, traffic_up = 0, traffic_down = 0, updated_at = $1
WHERE id = $2
"#;

pub const RESET_TRAFFIC_MYSQL: &str = r#"
UPDATE relay_subscribers
SET traffic_used = 0, traffic_up = 0, traffic_down = 0, updated_at = ?
WHERE id = ?
"#;

pub const COUNT_TOTAL: &str = "SELECT COUNT(*) FROM relay_subscribers";

pub const COUNT_ACTIVE_PG: &str = r#"
SELECT COUNT(*) FROM relay_subscribers
WHERE active = TRUE AND (expires_at = 0 OR expires_at > $1)
"#;

pub const COUNT_ACTIVE_MYSQL: &str = r#"
SELECT COUNT(*) FROM relay_subscribers
WHERE active = TRUE AND (expires_at = 0 OR expires_at > ?)
"#;

pub const COUNT_EXPIRED_PG: &str = r#"
SELECT COUNT(*) FROM relay_subscribers
WHERE expires_at > 0 AND expires_at <= $1
"#;

pub const COUNT_EXPIRED_MYSQL: &str = r#"
SELECT COUNT(*) FROM relay_subscribers
WHERE expires_at > 0 AND expires_at <= ?
"#;

pub const COUNT_OVER_LIMIT: &str = r#"
SELECT COUNT(*) FROM relay_subscribers
WHERE traffic_limit > 0 AND traffic_used >= traffic_limit
"#;

pub const SCHEMA_SQLITE: &str = r#"
CREATE TABLE IF NOT EXISTS relay_subscribers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    connection_id TEXT NOT NULL UNIQUE,
    active INTEGER NOT NULL DEFAULT 1,
    expires_at INTEGER NOT NULL DEFAULT 0,
    traffic_limit INTEGER NOT NULL DEFAULT 0,
    traffic_used INTEGER NOT NULL DEFAULT 0,
    traffic_up INTEGER NOT NULL DEFAULT 0,
    traffic_down INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL DEFAULT 0,
    updated_at INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_relay_subscribers_username ON relay_subscribers(username);
CREATE INDEX IF NOT EXISTS idx_relay_subscribers_connection_id ON relay_subscribers(connection_id)
"#;

pub const SCHEMA_PG: &str = r#"
CREATE TABLE IF NOT EXISTS relay_subscribers (
    id BIGSERIAL PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    connection_id TEXT NOT NULL UNIQUE,
    active BOOLEAN NOT NULL DEFAULT TRUE,
    expires_at BIGINT NOT NULL DEFAULT 0,
    traffic_limit BIGINT NOT NULL DEFAULT 0,
    traffic_used BIGINT NOT NULL DEFAULT 0,
    traffic_up BIGINT NOT NULL DEFAULT 0,
    traffic_down BIGINT NOT NULL DEFAULT 0,
    created_at BIGINT NOT NULL DEFAULT 0,
    updated_at BIGINT NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_relay_subscribers_username ON relay_subscribers(username);
CREATE INDEX IF NOT EXISTS idx_relay_subscribers_connection_id ON relay_subscribers(connection_id)
"#;

pub const SCHEMA_MYSQL: &str = r#"
CREATE TABLE IF NOT EXISTS relay_subscribers (
    id BIGINT AUTO_INCREMENT PRIMARY KEY,
    username VARCHAR(255) NOT NULL UNIQUE,
    connection_id VARCHAR(64) NOT NULL UNIQUE,
    active BOOLEAN NOT NULL DEFAULT TRUE,
    expires_at BIGINT NOT NULL DEFAULT 0,
    traffic_limit BIGINT NOT NULL DEFAULT 0,
    traffic_used BIGINT NOT NULL DEFAULT 0,
    traffic_up BIGINT NOT NULL DEFAULT 0,
    traffic_down BIGINT NOT NULL DEFAULT 0,
    created_at BIGINT NOT NULL DEFAULT 0,
    updated_at BIGINT NOT NULL DEFAULT 0
)
"#;
