//! PostgreSQL package store (sqlx)

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

use crate::error::SyncResult;
use crate::model::{PackageRecord, Reconciled};
use crate::store::PackageStore;

const RETURNING: &str = "tracking_id, locker_id, status, drop_off_timestamp, \
     sync_attempt_timestamp, server_received_at, last_sync_attempt";

/// PostgreSQL storage backend (PRIMARY)
///
/// The upsert is one `INSERT .. ON CONFLICT (tracking_id) DO UPDATE`
/// statement. `xmax = 0` on the returned row tells a fresh insert from an
/// update of an existing row.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Wrap an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new PostgreSQL connection pool
    pub async fn connect(database_url: &str, max_connections: u32) -> SyncResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect(database_url)
            .await?;

        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn record_from_row(row: &PgRow) -> Result<PackageRecord, sqlx::Error> {
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
impl PackageStore for PostgresStore {
    async fn ensure_schema(&self) -> SyncResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS packages (
                id BIGSERIAL PRIMARY KEY,
                tracking_id TEXT NOT NULL UNIQUE,
                locker_id TEXT NOT NULL,
                status TEXT NOT NULL,
                drop_off_timestamp TIMESTAMPTZ NOT NULL,
                sync_attempt_timestamp TIMESTAMPTZ NOT NULL,
                server_received_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                last_sync_attempt BIGINT NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_packages_locker_id ON packages (locker_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn upsert(&self, record: &PackageRecord) -> SyncResult<Reconciled> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO packages (tracking_id, locker_id, status, drop_off_timestamp,
                                  sync_attempt_timestamp, server_received_at, last_sync_attempt)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (tracking_id) DO UPDATE
            SET sync_attempt_timestamp = EXCLUDED.sync_attempt_timestamp,
                last_sync_attempt = EXCLUDED.last_sync_attempt
            RETURNING {RETURNING}, (xmax = 0) AS inserted
            "#
        ))
        .bind(&record.tracking_id)
        .bind(&record.locker_id)
        .bind(&record.status)
        .bind(record.drop_off_timestamp)
        .bind(record.sync_attempt_timestamp)
        .bind(record.server_received_at)
        .bind(record.last_sync_attempt)
        .fetch_one(&self.pool)
        .await?;

        let stored = record_from_row(&row)?;
        let inserted: bool = row.try_get("inserted")?;

        Ok(if inserted {
            Reconciled::inserted(stored)
        } else {
            Reconciled::updated(stored)
        })
    }

    async fn get(&self, tracking_id: &str) -> SyncResult<Option<PackageRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {RETURNING} FROM packages WHERE tracking_id = $1"
        ))
        .bind(tracking_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(record_from_row).transpose()?)
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
