// File: locker-sync/src/reconciler.rs
// Purpose: Idempotent reconciliation of locker events against server state

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::SyncResult;
use crate::model::{PackageCandidate, PackageRecord, Reconciled, UpsertOutcome};
use crate::store::PackageStore;

/// Source of the server's authoritative time
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Turns any number of deliveries of one locker event into exactly one record
///
/// A locker resends until it gets an ack, so the same tracking ID can arrive
/// many times and in any order. The first arrival is stored whole and stamped
/// with the server clock. Later arrivals only refresh the sync metadata.
/// Storage failures go back to the caller untouched; retrying is the
/// locker's job.
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn PackageStore>,
    clock: Clock,
}

impl Reconciler {
    /// Create a reconciler over the given store, using the system clock
    pub fn new(store: Arc<dyn PackageStore>) -> Self {
        Self {
            store,
            clock: Arc::new(Utc::now),
        }
    }

    /// Replace the server clock
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &Arc<dyn PackageStore> {
        &self.store
    }

    /// Record one delivery of a locker event
    pub async fn reconcile(&self, candidate: PackageCandidate) -> SyncResult<Reconciled> {
        let record = candidate.into_record((self.clock)());

        let reconciled = self.store.upsert(&record).await.map_err(|e| {
            tracing::error!(
                tracking_id = %record.tracking_id,
                store = self.store.name(),
                "Failed to reconcile package: {}",
                e
            );
            e
        })?;

        match reconciled.outcome {
            UpsertOutcome::Inserted => {
                tracing::info!(
                    tracking_id = %reconciled.record.tracking_id,
                    locker_id = %reconciled.record.locker_id,
                    status = %reconciled.record.status,
                    "Recorded new package"
                );
            }
            UpsertOutcome::Updated => {
                let drift = record.sync_attempt_timestamp - reconciled.record.drop_off_timestamp;
                tracing::debug!(
                    tracking_id = %reconciled.record.tracking_id,
                    locker_id = %record.locker_id,
                    attempt = record.last_sync_attempt,
                    drift_secs = drift.num_seconds(),
                    "Package already on record, refreshed sync metadata"
                );
            }
        }

        Ok(reconciled)
    }

    /// Look up the stored record for a tracking ID
    pub async fn lookup(&self, tracking_id: &str) -> SyncResult<Option<PackageRecord>> {
        self.store.get(tracking_id).await
    }
}
