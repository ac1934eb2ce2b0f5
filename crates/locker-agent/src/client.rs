// File: locker-agent/src/client.rs
// Purpose: HTTP client for the server's sync endpoint

use std::time::Duration;

use locker_sync::{SyncAck, SyncRequest};
use reqwest::StatusCode;
use thiserror::Error;

/// Why a send did not produce an ack
#[derive(Debug, Error)]
pub enum SubmitError {
    /// Timeout, refused connection, unreadable body
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with something other than `201 Created`
    #[error("server responded {status}: {body}")]
    Rejected { status: StatusCode, body: String },
}

impl SubmitError {
    /// A 4xx will come back the same on every resend
    pub fn is_permanent(&self) -> bool {
        matches!(self, SubmitError::Rejected { status, .. } if status.is_client_error())
    }
}

/// Posts sync requests to one server URL
#[derive(Clone)]
pub struct SyncClient {
    http: reqwest::Client,
    url: String,
}

impl SyncClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, SubmitError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send one sync attempt and parse the ack
    pub async fn submit(&self, request: &SyncRequest) -> Result<SyncAck, SubmitError> {
        let response = self.http.post(&self.url).json(request).send().await?;

        let status = response.status();
        if status != StatusCode::CREATED {
            let body = response.text().await.unwrap_or_default();
            return Err(SubmitError::Rejected { status, body });
        }

        Ok(response.json::<SyncAck>().await?)
    }
}
