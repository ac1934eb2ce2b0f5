// File: locker-sync/src/api.rs
// Purpose: HTTP API endpoints for package sync

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::error::{SyncError, SyncResult, ValidationError};
use crate::model::PackageRecord;
use crate::reconciler::Reconciler;
use crate::validation::SyncRequest;

/// Acknowledgment sent back to the locker
///
/// The locker only marks a package as synced after it sees `ack: true`
/// with its own tracking ID echoed back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncAck {
    pub tracking_id: String,
    pub server_received_at: DateTime<Utc>,
    pub ack: bool,
}

/// Response for GET /health
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub store: String,
}

/// Build the sync API routes
pub fn router(reconciler: Reconciler) -> Router {
    Router::new()
        .route("/sync", post(post_sync_handler))
        .route("/packages/:tracking_id", get(get_package_handler))
        .route("/health", get(health_handler))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(reconciler)
}

/// Handler for POST /sync
///
/// Validates the event, reconciles it and acks with the server's receipt
/// time. First arrivals and retries get the same `201` ack.
pub async fn post_sync_handler(
    State(reconciler): State<Reconciler>,
    payload: Result<Json<SyncRequest>, JsonRejection>,
) -> SyncResult<(StatusCode, Json<SyncAck>)> {
    let Json(request) =
        payload.map_err(|rejection| ValidationError::MalformedBody(rejection.body_text()))?;

    let candidate = request.validate().map_err(|e| {
        tracing::warn!("Rejected sync request: {}", e);
        e
    })?;

    let reconciled = reconciler.reconcile(candidate).await?;

    Ok((
        StatusCode::CREATED,
        Json(SyncAck {
            tracking_id: reconciled.record.tracking_id,
            server_received_at: reconciled.record.server_received_at,
            ack: true,
        }),
    ))
}

/// Handler for GET /packages/:tracking_id
pub async fn get_package_handler(
    State(reconciler): State<Reconciler>,
    Path(tracking_id): Path<String>,
) -> SyncResult<Json<PackageRecord>> {
    match reconciler.lookup(&tracking_id).await? {
        Some(record) => Ok(Json(record)),
        None => Err(SyncError::NotFound(tracking_id)),
    }
}

/// Handler for GET /health
pub async fn health_handler(State(reconciler): State<Reconciler>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        store: reconciler.store().name().to_string(),
    })
}
