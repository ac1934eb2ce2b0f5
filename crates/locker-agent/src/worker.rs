// File: locker-agent/src/worker.rs
// Purpose: Resend pending packages until the server acks them

use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use locker_sync::{PackageCandidate, SyncRequest};

use crate::client::SyncClient;
use crate::outbox::{Outbox, OutboxPackage, SyncState};

/// Outcome of one pass over the outbox
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    /// Acked by the server and marked synced
    pub synced: usize,
    /// Not acked, will be sent again next pass
    pub deferred: usize,
    /// Not acked and out of attempts
    pub failed: usize,
}

impl SyncReport {
    pub fn is_idle(&self) -> bool {
        self.synced == 0 && self.deferred == 0 && self.failed == 0
    }
}

/// Send every pending package once.
///
/// A package is marked synced only on an ack that carries its own tracking
/// ID. Each send reports the number of earlier sends as `last_sync_attempt`,
/// so the server sees 0 for the first delivery and 1.. for resends.
pub async fn sync_once(outbox: &Outbox, client: &SyncClient, max_retries: u32) -> Result<SyncReport> {
    let mut report = SyncReport::default();

    for package in outbox.pending().await? {
        let now = Utc::now();
        let attempts = outbox.record_attempt(package.id, now).await?;
        let request = SyncRequest::from(&candidate_for(&package, now));

        let give_up = match client.submit(&request).await {
            Ok(ack) if ack.ack && ack.tracking_id == package.tracking_id => {
                outbox.set_state(package.id, SyncState::Synced).await?;
                tracing::info!(
                    tracking_id = %package.tracking_id,
                    attempts,
                    server_received_at = %ack.server_received_at,
                    "Package synced"
                );
                report.synced += 1;
                continue;
            }
            Ok(ack) => {
                tracing::warn!(
                    tracking_id = %package.tracking_id,
                    acked_id = %ack.tracking_id,
                    ack = ack.ack,
                    "Invalid ack, will retry"
                );
                false
            }
            Err(e) => {
                tracing::warn!(tracking_id = %package.tracking_id, attempts, "Sync failed: {}", e);
                e.is_permanent()
            }
        };

        if give_up || attempts >= i64::from(max_retries) {
            outbox.set_state(package.id, SyncState::Failed).await?;
            tracing::error!(
                tracking_id = %package.tracking_id,
                attempts,
                "Giving up on package; run retry-failed once the problem is fixed"
            );
            report.failed += 1;
        } else {
            report.deferred += 1;
        }
    }

    Ok(report)
}

/// Run `sync_once` every `interval` until Ctrl-C
pub async fn run(outbox: &Outbox, client: &SyncClient, max_retries: u32, interval: Duration) -> Result<()> {
    tracing::info!(
        "Sync worker started. Target={}, interval={}s",
        client.url(),
        interval.as_secs()
    );

    loop {
        match sync_once(outbox, client, max_retries).await {
            Ok(report) if !report.is_idle() => {
                tracing::info!(
                    synced = report.synced,
                    deferred = report.deferred,
                    failed = report.failed,
                    "Sync pass finished"
                );
            }
            Ok(_) => {}
            Err(e) => tracing::error!("Sync pass aborted: {:#}", e),
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Sync worker stopped");
                return Ok(());
            }
        }
    }
}

fn candidate_for(package: &OutboxPackage, attempted_at: chrono::DateTime<Utc>) -> PackageCandidate {
    PackageCandidate {
        tracking_id: package.tracking_id.clone(),
        locker_id: package.locker_id.clone(),
        status: package.status.clone(),
        drop_off_timestamp: package.created_at,
        sync_attempt_timestamp: attempted_at,
        last_sync_attempt: package.sync_attempt_count,
    }
}
