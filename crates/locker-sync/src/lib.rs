// File: locker-sync/src/lib.rs
// Purpose: Main entry point for locker-sync library

//! # locker-sync
//!
//! Idempotent ingestion of package events from lockers that lose their
//! connection at any moment and resend until they see an ack.
//!
//! Every event is keyed by its client-generated tracking ID. The first arrival
//! inserts the record and stamps it with the server clock; every later arrival
//! only refreshes the sync metadata (`sync_attempt_timestamp` and
//! `last_sync_attempt`). Drop-off time and server receipt time never change.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use locker_sync::{api, store, Reconciler};
//!
//! let store = store::connect("sqlite://packages.db", 5).await?;
//! store.ensure_schema().await?;
//!
//! let app = api::router(Reconciler::new(store));
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod model;
pub mod reconciler;
pub mod store;
pub mod validation;

// Re-export main types
pub use api::{router, SyncAck};
pub use config::Config;
pub use error::{SyncError, SyncResult, ValidationError};
pub use model::{PackageCandidate, PackageRecord, Reconciled, UpsertOutcome};
pub use reconciler::Reconciler;
pub use store::{MemoryStore, PackageStore, PostgresStore, SqliteStore};
pub use validation::SyncRequest;
