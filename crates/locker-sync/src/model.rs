// File: locker-sync/src/model.rs
// Purpose: Package records and upsert outcomes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The single authoritative record for one tracking ID
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    /// Client-generated idempotency key
    pub tracking_id: String,

    /// Locker that first reported the package (informational)
    pub locker_id: String,

    /// Lifecycle state as reported by the locker
    pub status: String,

    /// When the package was dropped off, by the locker's clock. Write-once.
    pub drop_off_timestamp: DateTime<Utc>,

    /// When the locker made the latest sync attempt, by the locker's clock
    pub sync_attempt_timestamp: DateTime<Utc>,

    /// When the server first stored the record, by the server's clock. Write-once.
    pub server_received_at: DateTime<Utc>,

    /// Retry counter of the latest attempt seen
    pub last_sync_attempt: i64,
}

/// A validated event from a locker that has not been stored yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageCandidate {
    pub tracking_id: String,
    pub locker_id: String,
    pub status: String,
    pub drop_off_timestamp: DateTime<Utc>,
    pub sync_attempt_timestamp: DateTime<Utc>,
    pub last_sync_attempt: i64,
}

impl PackageCandidate {
    /// Stamp the candidate with the server's receipt time.
    ///
    /// The stamp only survives if this turns out to be the first arrival.
    pub fn into_record(self, server_received_at: DateTime<Utc>) -> PackageRecord {
        PackageRecord {
            tracking_id: self.tracking_id,
            locker_id: self.locker_id,
            status: self.status,
            drop_off_timestamp: self.drop_off_timestamp,
            sync_attempt_timestamp: self.sync_attempt_timestamp,
            server_received_at,
            last_sync_attempt: self.last_sync_attempt,
        }
    }
}

/// Which branch of the conditional upsert was taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertOutcome {
    /// First arrival for the tracking ID
    Inserted,
    /// Retry of an event already on record; only sync metadata changed
    Updated,
}

impl std::fmt::Display for UpsertOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpsertOutcome::Inserted => write!(f, "inserted"),
            UpsertOutcome::Updated => write!(f, "updated"),
        }
    }
}

/// The stored record after an upsert, plus the branch that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    pub record: PackageRecord,
    pub outcome: UpsertOutcome,
}

impl Reconciled {
    pub fn inserted(record: PackageRecord) -> Self {
        Self {
            record,
            outcome: UpsertOutcome::Inserted,
        }
    }

    pub fn updated(record: PackageRecord) -> Self {
        Self {
            record,
            outcome: UpsertOutcome::Updated,
        }
    }

    /// True when this arrival was a retry of a known event
    pub fn is_retry(&self) -> bool {
        self.outcome == UpsertOutcome::Updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_candidate_into_record_keeps_device_fields() {
        let dropped = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let received = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 3).unwrap();

        let record = PackageCandidate {
            tracking_id: "T1".to_string(),
            locker_id: "L7".to_string(),
            status: "dropped_off".to_string(),
            drop_off_timestamp: dropped,
            sync_attempt_timestamp: dropped,
            last_sync_attempt: 0,
        }
        .into_record(received);

        assert_eq!(record.tracking_id, "T1");
        assert_eq!(record.drop_off_timestamp, dropped);
        assert_eq!(record.server_received_at, received);
        assert_eq!(record.last_sync_attempt, 0);
    }

    #[test]
    fn test_outcome_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&UpsertOutcome::Inserted).unwrap(),
            "\"inserted\""
        );
        assert_eq!(UpsertOutcome::Updated.to_string(), "updated");
    }
}
