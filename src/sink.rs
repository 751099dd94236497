//! Ingestion sinks that receive emitted snapshots.
//!
//! The simulator only knows the [`SnapshotSink`] trait. [`HttpSink`] posts
//! JSON to the ingestion endpoint; [`RecordingSink`] keeps snapshots in
//! memory for tests and local runs.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

use crate::models::TelemetrySnapshot;

// ---

/// Longest response body kept in a [`SinkError::Status`].
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("ingestion request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("ingestion endpoint returned {status}: {body}")]
    Status { status: StatusCode, body: String },
}

#[async_trait]
pub trait SnapshotSink: Send + Sync {
    async fn send(&self, snapshot: &TelemetrySnapshot) -> Result<(), SinkError>;
}

/// Posts each snapshot as JSON to a fixed endpoint.
pub struct HttpSink {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl HttpSink {
    pub fn new(url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self, SinkError> {
        // ---
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl SnapshotSink for HttpSink {
    async fn send(&self, snapshot: &TelemetrySnapshot) -> Result<(), SinkError> {
        // ---
        let mut request = self.client.post(&self.url).json(snapshot);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            tracing::debug!(
                flock = %snapshot.flock_id,
                snapshot = %snapshot.snapshot_id,
                %status,
                "Snapshot delivered"
            );
            return Ok(());
        }

        let body = match response.text().await {
            Ok(text) => text.chars().take(MAX_ERROR_BODY).collect(),
            Err(e) => format!("[failed to read response body: {e}]"),
        };
        Err(SinkError::Status { status, body })
    }
}

/// Keeps every snapshot it receives.
#[derive(Clone, Default)]
pub struct RecordingSink {
    snapshots: Arc<Mutex<Vec<TelemetrySnapshot>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshots(&self) -> Vec<TelemetrySnapshot> {
        self.snapshots
            .lock()
            .map(|s| s.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn len(&self) -> usize {
        self.snapshots
            .lock()
            .map(|s| s.len())
            .unwrap_or_else(|poisoned| poisoned.into_inner().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SnapshotSink for RecordingSink {
    async fn send(&self, snapshot: &TelemetrySnapshot) -> Result<(), SinkError> {
        let mut snapshots = self
            .snapshots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        snapshots.push(snapshot.clone());
        Ok(())
    }
}
