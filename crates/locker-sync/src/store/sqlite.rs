//! SQLite package store (sqlx)

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;

use crate::error::SyncResult;
use crate::model::{PackageRecord, Reconciled};
use crate::store::PackageStore;

const RETURNING: &str = "tracking_id, locker_id, status, drop_off_timestamp, \
     sync_attempt_timestamp, server_received_at, last_sync_attempt";

/// SQLite storage backend
///
/// SQLite has no way to tell an inserted row from an updated one inside a
/// single `ON CONFLICT DO UPDATE`, so the upsert runs as one transaction:
/// an `INSERT .. ON CONFLICT DO NOTHING` that takes the write lock, followed
/// by an `UPDATE` of the sync metadata when nothing was inserted.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Wrap an existing pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open a pool for a `sqlite:` URL or a `.db` path, creating the file if needed
    pub async fn connect(database_url: &str, max_connections: u32) -> SyncResult<Self> {
        let url = if database_url.starts_with("sqlite:") {
            database_url.to_string()
        } else {
            format!("sqlite://{}", database_url)
        };

        let options = SqliteConnectOptions::from_str(&url)?.create_if_missing(true);

        // Every connection to `:memory:` shares one database only while the
        // pool keeps a connection open; pin it to one long-lived connection.
        let pool_options = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections.max(1))
        };

        let pool = pool_options.connect_with(options).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn record_from_row(row: &SqliteRow) -> Result<PackageRecord, sqlx::Error> {
    Ok(PackageRecord {
        tracking_id: row.try_get("tracking_id")?,
        locker_id: row.try_get("locker_id")?,
        status: row.try_get("status")?,
        drop_off_timestamp: row.try_get("drop_off_timestamp")?,
        sync_attempt_timestamp: row.try_get("sync_attempt_timestamp")?,
        server_received_at: row.try_get("server_received_at")?,
        last_sync_attempt: row.try_get("last_sync_attempt")?,
    })
}

#[async_trait]
impl PackageStore for SqliteStore {
    async fn ensure_schema(&self) -> SyncResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS packages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tracking_id TEXT NOT NULL UNIQUE,
                locker_id TEXT NOT NULL,
                status TEXT NOT NULL,
                drop_off_timestamp DATETIME NOT NULL,
                sync_attempt_timestamp DATETIME NOT NULL,
                server_received_at DATETIME NOT NULL,
                last_sync_attempt INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_packages_locker_id ON packages(locker_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn upsert(&self, record: &PackageRecord) -> SyncResult<Reconciled> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(&format!(
            r#"
            INSERT INTO packages (tracking_id, locker_id, status, drop_off_timestamp,
                                  sync_attempt_timestamp, server_received_at, last_sync_attempt)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (tracking_id) DO NOTHING
            RETURNING {RETURNING}
            "#
        ))
        .bind(&record.tracking_id)
        .bind(&record.locker_id)
        .bind(&record.status)
        .bind(record.drop_off_timestamp)
        .bind(record.sync_attempt_timestamp)
        .bind(record.server_received_at)
        .bind(record.last_sync_attempt)
        .fetch_optional(&mut *tx)
        .await?;

        let reconciled = match inserted {
            Some(row) => Reconciled::inserted(record_from_row(&row)?),
            None => {
                let row = sqlx::query(&format!(
                    r#"
                    UPDATE packages
                    SET sync_attempt_timestamp = ?, last_sync_attempt = ?
                    WHERE tracking_id = ?
                    RETURNING {RETURNING}
                    "#
                ))
                .bind(record.sync_attempt_timestamp)
                .bind(record.last_sync_attempt)
                .bind(&record.tracking_id)
                .fetch_one(&mut *tx)
                .await?;

                Reconciled::updated(record_from_row(&row)?)
            }
        };

        tx.commit().await?;
        Ok(reconciled)
    }

    async fn get(&self, tracking_id: &str) -> SyncResult<Option<PackageRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {RETURNING} FROM packages WHERE tracking_id = ?"
        ))
        .bind(tracking_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(record_from_row).transpose()?)
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}
