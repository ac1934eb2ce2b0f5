//! In-memory package store

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::SyncResult;
use crate::model::{PackageRecord, Reconciled};
use crate::store::PackageStore;

/// In-memory storage backend
///
/// Keeps records in a HashMap behind one lock. The conflict check and the
/// write share a single write guard, which gives the same atomicity as the
/// SQL backends. Non-persistent: everything is lost on restart.
#[derive(Clone, Default)]
pub struct MemoryStore {
    records: Arc<RwLock<HashMap<String, PackageRecord>>>,
}

impl MemoryStore {
    /// Create a new memory storage backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl PackageStore for MemoryStore {
    async fn ensure_schema(&self) -> SyncResult<()> {
        Ok(())
    }

    async fn upsert(&self, record: &PackageRecord) -> SyncResult<Reconciled> {
        let mut records = self.records.write().await;

        match records.get_mut(&record.tracking_id) {
            Some(existing) => {
                existing.sync_attempt_timestamp = record.sync_attempt_timestamp;
                existing.last_sync_attempt = record.last_sync_attempt;
                Ok(Reconciled::updated(existing.clone()))
            }
            None => {
                records.insert(record.tracking_id.clone(), record.clone());
                Ok(Reconciled::inserted(record.clone()))
            }
        }
    }

    async fn get(&self, tracking_id: &str) -> SyncResult<Option<PackageRecord>> {
        let records = self.records.read().await;
        Ok(records.get(tracking_id).cloned())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
