//! Alert Store
//!
//! Durable record of price alerts and their fired state. `mark_fired` is a
//! single conditional update; its changed-row count decides which caller
//! owns the firing, so no other lock is needed around alert evaluation.

use chrono::{DateTime, Utc};
use pricewatch_core::{Alert, AlertId, Direction, NewAlert};
use rusqlite::{params, types::Type, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;
use tracing::debug;

/// Storage for price alerts
pub trait AlertStore: Send + Sync {
    /// Persist a new, unfired alert and return its id
    fn create(&self, alert: &NewAlert) -> Result<AlertId, AlertStoreError>;

    fn get(&self, id: AlertId) -> Result<Option<Alert>, AlertStoreError>;

    /// Unfired alerts for one asset, oldest first
    fn list_pending(&self, asset_id: &str) -> Result<Vec<Alert>, AlertStoreError>;

    /// Unfired alerts belonging to one owner, oldest first
    fn list_pending_for_owner(&self, owner_id: &str) -> Result<Vec<Alert>, AlertStoreError>;

    /// Atomically flip `fired` from false to true.
    ///
    /// Fails with `AlreadyFired` if another caller got there first and
    /// `NotFound` if no such alert exists.
    fn mark_fired(&self, id: AlertId) -> Result<(), AlertStoreError>;
}

const ALERT_COLUMNS: &str =
    "id, owner_id, asset_id, target_price, direction, fired, created_at, fired_at";

/// SQLite-backed alert store
pub struct SqliteAlertStore {
    conn: Mutex<Connection>,
}

impl SqliteAlertStore {
    /// Open (or create) the alert database at `db_path`
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, AlertStoreError> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    AlertStoreError::Io(format!("Failed to create database directory: {}", e))
                })?;
            }
        }

        let conn = Connection::open(db_path).map_err(AlertStoreError::Database)?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;

        Ok(store)
    }

    /// Create an in-memory store (useful for testing)
    pub fn new_in_memory() -> Result<Self, AlertStoreError> {
        let conn = Connection::open_in_memory().map_err(AlertStoreError::Database)?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;

        Ok(store)
    }

    fn init_schema(&self) -> Result<(), AlertStoreError> {
        let conn = self.conn.lock().map_err(|_| AlertStoreError::LockError)?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS price_alerts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id TEXT NOT NULL,
                asset_id TEXT NOT NULL,
                target_price TEXT NOT NULL,
                direction TEXT NOT NULL,
                fired INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                fired_at INTEGER
            );

            CREATE INDEX IF NOT EXISTS idx_price_alerts_pending
            ON price_alerts(asset_id) WHERE fired = 0;

            CREATE INDEX IF NOT EXISTS idx_price_alerts_owner
            ON price_alerts(owner_id, fired);
            "#,
        )
        .map_err(AlertStoreError::Database)?;

        Ok(())
    }

    fn query_alerts(
        &self,
        filter: &str,
        param: &str,
    ) -> Result<Vec<Alert>, AlertStoreError> {
        let conn = self.conn.lock().map_err(|_| AlertStoreError::LockError)?;

        let sql = format!(
            "SELECT {} FROM price_alerts WHERE {} AND fired = 0 ORDER BY id ASC",
            ALERT_COLUMNS, filter
        );
        let mut stmt = conn.prepare(&sql).map_err(AlertStoreError::Database)?;

        let alerts = stmt
            .query_map(params![param], alert_from_row)
            .map_err(AlertStoreError::Database)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(AlertStoreError::Database)?;

        Ok(alerts)
    }
}

impl AlertStore for SqliteAlertStore {
    fn create(&self, alert: &NewAlert) -> Result<AlertId, AlertStoreError> {
        let conn = self.conn.lock().map_err(|_| AlertStoreError::LockError)?;

        conn.execute(
            r#"
            INSERT INTO price_alerts (owner_id, asset_id, target_price, direction, fired, created_at)
            VALUES (?1, ?2, ?3, ?4, 0, ?5)
            "#,
            params![
                alert.owner_id,
                alert.asset_id,
                alert.target_price.to_string(),
                alert.direction.as_str(),
                Utc::now().timestamp(),
            ],
        )
        .map_err(AlertStoreError::Database)?;

        let id = conn.last_insert_rowid();
        debug!(
            "Created alert {} for {}: {} {} {}",
            id, alert.owner_id, alert.asset_id, alert.direction, alert.target_price
        );

        Ok(id)
    }

    fn get(&self, id: AlertId) -> Result<Option<Alert>, AlertStoreError> {
        let conn = self.conn.lock().map_err(|_| AlertStoreError::LockError)?;

        conn.query_row(
            &format!("SELECT {} FROM price_alerts WHERE id = ?1", ALERT_COLUMNS),
            params![id],
            alert_from_row,
        )
        .optional()
        .map_err(AlertStoreError::Database)
    }

    fn list_pending(&self, asset_id: &str) -> Result<Vec<Alert>, AlertStoreError> {
        self.query_alerts("asset_id = ?1", asset_id)
    }

    fn list_pending_for_owner(&self, owner_id: &str) -> Result<Vec<Alert>, AlertStoreError> {
        self.query_alerts("owner_id = ?1", owner_id)
    }

    fn mark_fired(&self, id: AlertId) -> Result<(), AlertStoreError> {
        let conn = self.conn.lock().map_err(|_| AlertStoreError::LockError)?;

        let changed = conn
            .execute(
                "UPDATE price_alerts SET fired = 1, fired_at = ?2 WHERE id = ?1 AND fired = 0",
                params![id, Utc::now().timestamp()],
            )
            .map_err(AlertStoreError::Database)?;

        if changed == 1 {
            return Ok(());
        }

        let exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM price_alerts WHERE id = ?1)",
                params![id],
                |row| row.get(0),
            )
            .map_err(AlertStoreError::Database)?;

        if exists {
            Err(AlertStoreError::AlreadyFired(id))
        } else {
            Err(AlertStoreError::NotFound(id))
        }
    }
}

fn alert_from_row(row: &Row<'_>) -> rusqlite::Result<Alert> {
    let target_price: String = row.get(3)?;
    let direction: String = row.get(4)?;
    let created_at: i64 = row.get(6)?;
    let fired_at: Option<i64> = row.get(7)?;

    Ok(Alert {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        asset_id: row.get(2)?,
        target_price: Decimal::from_str(&target_price)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?,
        direction: Direction::from_str(&direction)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?,
        fired: row.get(5)?,
        created_at: DateTime::from_timestamp(created_at, 0).unwrap_or_else(Utc::now),
        fired_at: fired_at.and_then(|ts| DateTime::from_timestamp(ts, 0)),
    })
}

/// Errors that can occur during alert storage operations
#[derive(Debug, thiserror::Error)]
pub enum AlertStoreError {
    #[error("Alert {0} not found")]
    NotFound(AlertId),

    #[error("Alert {0} has already fired")]
    AlreadyFired(AlertId),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Failed to acquire lock")]
    LockError,
}
