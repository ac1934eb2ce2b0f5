// File: locker-sync/src/store/mod.rs
// Purpose: Durable package store abstraction and backend selection

//! Storage backends for package records
//!
//! Every backend exposes the same atomic insert-or-update primitive. The
//! unique-key check and the write happen in one statement or one
//! transaction, never as a read followed by a separate write.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{SyncError, SyncResult};
use crate::model::{PackageRecord, Reconciled};

pub mod memory;
pub mod postgres;
pub mod sqlite;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use sqlite::SqliteStore;

/// Trait for package storage backends
#[async_trait]
pub trait PackageStore: Send + Sync {
    /// Create the package table and its indexes if they do not exist
    async fn ensure_schema(&self) -> SyncResult<()>;

    /// Insert the record, or on a tracking ID conflict update only
    /// `sync_attempt_timestamp` and `last_sync_attempt`.
    ///
    /// Returns the stored row after the write and which branch was taken.
    async fn upsert(&self, record: &PackageRecord) -> SyncResult<Reconciled>;

    /// Get a stored record by tracking ID
    async fn get(&self, tracking_id: &str) -> SyncResult<Option<PackageRecord>>;

    /// Get storage backend name
    fn name(&self) -> &'static str;
}

/// Open a store from a database URL.
///
/// The backend is picked from the URL scheme: `postgres://` and
/// `postgresql://` for PostgreSQL, `sqlite:` or a `.db` path for SQLite,
/// `memory://` for the in-process store.
pub async fn connect(database_url: &str, max_connections: u32) -> SyncResult<Arc<dyn PackageStore>> {
    if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        let store = PostgresStore::connect(database_url, max_connections).await?;
        Ok(Arc::new(store))
    } else if database_url.starts_with("sqlite:") || database_url.ends_with(".db") {
        let store = SqliteStore::connect(database_url, max_connections).await?;
        Ok(Arc::new(store))
    } else if database_url.starts_with("memory://") {
        Ok(Arc::new(MemoryStore::new()))
    } else {
        Err(SyncError::Storage(format!(
            "unsupported database URL format: {}",
            database_url
        )))
    }
}
