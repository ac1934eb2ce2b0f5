// File: locker-sync/src/validation.rs
// Purpose: Wire format of a sync request and its validation

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::model::PackageCandidate;

/// Body of `POST /sync` as it arrives on the wire
///
/// Every field is optional at the serde level so that a missing field is
/// reported by name instead of as a generic deserialization failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locker_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drop_off_timestamp: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_attempt_timestamp: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync_attempt: Option<i64>,
}

impl SyncRequest {
    /// Check required fields and parse timestamps.
    ///
    /// Fields are checked in wire order so the first problem is reported.
    pub fn validate(self) -> Result<PackageCandidate, ValidationError> {
        let tracking_id = required_text("tracking_id", self.tracking_id)?;
        let locker_id = required_text("locker_id", self.locker_id)?;
        let status = required_text("status", self.status)?;
        let drop_off_timestamp = required_timestamp("drop_off_timestamp", self.drop_off_timestamp)?;
        let sync_attempt_timestamp =
            required_timestamp("sync_attempt_timestamp", self.sync_attempt_timestamp)?;

        let last_sync_attempt = self.last_sync_attempt.unwrap_or(0);
        if last_sync_attempt < 0 {
            return Err(ValidationError::NegativeAttempt(last_sync_attempt));
        }

        Ok(PackageCandidate {
            tracking_id,
            locker_id,
            status,
            drop_off_timestamp,
            sync_attempt_timestamp,
            last_sync_attempt,
        })
    }
}

impl From<&PackageCandidate> for SyncRequest {
    fn from(candidate: &PackageCandidate) -> Self {
        Self {
            tracking_id: Some(candidate.tracking_id.clone()),
            locker_id: Some(candidate.locker_id.clone()),
            status: Some(candidate.status.clone()),
            drop_off_timestamp: Some(format_timestamp(candidate.drop_off_timestamp)),
            sync_attempt_timestamp: Some(format_timestamp(candidate.sync_attempt_timestamp)),
            last_sync_attempt: Some(candidate.last_sync_attempt),
        }
    }
}

fn required_text(field: &'static str, value: Option<String>) -> Result<String, ValidationError> {
    let value = value.ok_or(ValidationError::MissingField(field))?;
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    Ok(value)
}

fn required_timestamp(
    field: &'static str,
    value: Option<String>,
) -> Result<DateTime<Utc>, ValidationError> {
    let value = required_text(field, value)?;
    DateTime::parse_from_rfc3339(value.trim())
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| ValidationError::InvalidTimestamp { field, value })
}

/// RFC 3339 in UTC with sub-second precision kept
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}
