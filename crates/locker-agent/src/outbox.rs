// File: locker-agent/src/outbox.rs
// Purpose: Local SQLite outbox of packages waiting for a server ack

use std::path::Path;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;

/// Where a package stands in the handoff to the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Waiting for an ack; the worker keeps resending
    Pending,
    /// Server acked with a matching tracking ID
    Synced,
    /// Ran out of attempts; only `retry-failed` brings it back
    Failed,
}

impl SyncState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncState::Pending => "pending",
            SyncState::Synced => "synced",
            SyncState::Failed => "failed",
        }
    }
}

impl FromStr for SyncState {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(SyncState::Pending),
            "synced" => Ok(SyncState::Synced),
            "failed" => Ok(SyncState::Failed),
            other => bail!("Unknown sync state: {}", other),
        }
    }
}

impl std::fmt::Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One package in the outbox
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboxPackage {
    pub id: i64,
    pub tracking_id: String,
    pub locker_id: String,
    pub status: String,
    pub sync_state: SyncState,
    /// Drop-off time by the locker's clock
    pub created_at: DateTime<Utc>,
    /// Sends made so far
    pub sync_attempt_count: i64,
    pub last_attempt_at: Option<DateTime<Utc>>,
}

/// Number of packages per sync state
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StateCounts {
    pub pending: i64,
    pub synced: i64,
    pub failed: i64,
}

const COLUMNS: &str = "id, tracking_id, locker_id, status, sync_state, created_at, \
     sync_attempt_count, last_attempt_at";

fn package_from_row(row: &SqliteRow) -> Result<OutboxPackage> {
    let state: String = row.try_get("sync_state")?;
    Ok(OutboxPackage {
        id: row.try_get("id")?,
        tracking_id: row.try_get("tracking_id")?,
        locker_id: row.try_get("locker_id")?,
        status: row.try_get("status")?,
        sync_state: state.parse()?,
        created_at: row.try_get("created_at")?,
        sync_attempt_count: row.try_get("sync_attempt_count")?,
        last_attempt_at: row.try_get("last_attempt_at")?,
    })
}

/// The locker's local queue
#[derive(Clone)]
pub struct Outbox {
    pool: SqlitePool,
}

impl Outbox {
    /// Open (and create if needed) the outbox database file
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open outbox database: {:?}", path))?;

        let outbox = Self { pool };
        outbox.init().await?;
        Ok(outbox)
    }

    /// Outbox that lives only as long as the process
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .context("Failed to open in-memory outbox")?;

        let outbox = Self { pool };
        outbox.init().await?;
        Ok(outbox)
    }

    /// Back up an existing outbox file to `<name>.db.bak` and start a fresh one.
    ///
    /// Returns the backup path when there was something to back up.
    pub async fn reset(path: impl AsRef<Path>) -> Result<(Self, Option<std::path::PathBuf>)> {
        let path = path.as_ref();
        let mut backup = None;

        if path.exists() {
            let backup_path = path.with_extension("db.bak");
            std::fs::copy(path, &backup_path)
                .with_context(|| format!("Failed to back up {:?} to {:?}", path, backup_path))?;
            std::fs::remove_file(path)
                .with_context(|| format!("Failed to remove old outbox {:?}", path))?;
            backup = Some(backup_path);
        }

        let outbox = Self::open(path).await?;
        Ok((outbox, backup))
    }

    /// Close every connection to the outbox file
    pub async fn close(self) {
        self.pool.close().await;
    }

    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS packages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tracking_id TEXT NOT NULL UNIQUE,
                locker_id TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'dropped_off',
                sync_state TEXT NOT NULL DEFAULT 'pending',
                created_at DATETIME NOT NULL,
                sync_attempt_count INTEGER NOT NULL DEFAULT 0,
                last_attempt_at DATETIME
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create outbox table")?;

        Ok(())
    }

    /// Queue a dropped-off package
    pub async fn enqueue(
        &self,
        tracking_id: &str,
        locker_id: &str,
        status: &str,
        created_at: DateTime<Utc>,
    ) -> Result<OutboxPackage> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO packages (tracking_id, locker_id, status, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(tracking_id)
        .bind(locker_id)
        .bind(status)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("Failed to queue package {}", tracking_id))?;

        package_from_row(&row)
    }

    /// Packages still waiting for an ack, oldest first
    pub async fn pending(&self) -> Result<Vec<OutboxPackage>> {
        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM packages WHERE sync_state = ? ORDER BY id ASC"
        ))
        .bind(SyncState::Pending.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(package_from_row).collect()
    }

    pub async fn get(&self, tracking_id: &str) -> Result<Option<OutboxPackage>> {
        let row = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM packages WHERE tracking_id = ?"
        ))
        .bind(tracking_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(package_from_row).transpose()
    }

    /// Count one more send for the package and return the new total
    pub async fn record_attempt(&self, id: i64, at: DateTime<Utc>) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            UPDATE packages
            SET sync_attempt_count = sync_attempt_count + 1, last_attempt_at = ?
            WHERE id = ?
            RETURNING sync_attempt_count
            "#,
        )
        .bind(at)
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    pub async fn set_state(&self, id: i64, state: SyncState) -> Result<()> {
        sqlx::query("UPDATE packages SET sync_state = ? WHERE id = ?")
            .bind(state.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Put every failed package back in the queue with a clean attempt count
    pub async fn reset_failed(&self) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE packages
            SET sync_state = ?, sync_attempt_count = 0, last_attempt_at = NULL
            WHERE sync_state = ?
            "#,
        )
        .bind(SyncState::Pending.as_str())
        .bind(SyncState::Failed.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn counts(&self) -> Result<StateCounts> {
        let rows = sqlx::query("SELECT sync_state, COUNT(*) AS n FROM packages GROUP BY sync_state")
            .fetch_all(&self.pool)
            .await?;

        let mut counts = StateCounts::default();
        for row in rows {
            let state: String = row.try_get("sync_state")?;
            let n: i64 = row.try_get("n")?;
            match state.parse()? {
                SyncState::Pending => counts.pending = n,
                SyncState::Synced => counts.synced = n,
                SyncState::Failed => counts.failed = n,
            }
        }
        Ok(counts)
    }
}
