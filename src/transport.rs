// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Ingest endpoint transport.

use crate::error::AgentError;
use reqwest::Client;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of a single upload attempt. The agent treats [`UploadOutcome::Rejected`]
/// identically to a transient network failure: both mean "keep the entry
/// buffered, try again next drain pass."
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The endpoint accepted the payload (2xx response).
    Accepted,
    /// The request failed to complete, or the endpoint returned a non-2xx
    /// status. Not distinguished further -- no retry backoff differentiates
    /// between transport errors and rejections.
    Rejected,
}

/// Uploads an encoded [`crate::codec::TransmissionRecord`] to the ingest
/// endpoint for a single vehicle. The agent is generic over this trait
/// rather than boxing it, so no real dispatch cost and a fake can stand in
/// for integration tests.
pub trait Transport: Send + Sync {
    fn upload(&self, payload: &[u8]) -> impl std::future::Future<Output = UploadOutcome> + Send;
}

/// HTTP transport backed by a single pooled [`reqwest::Client`], shared
/// across every upload call rather than constructed per-request.
pub struct HttpTransport {
    client: Client,
    endpoint: String,
    vin: String,
}

impl HttpTransport {
    /// Build a transport posting to `{endpoint}/telemetry` on behalf of `vin`.
    pub fn new(endpoint: impl Into<String>, vin: impl Into<String>) -> Result<Self, AgentError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AgentError::FatalInit(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            vin: vin.into(),
        })
    }
}

impl Transport for HttpTransport {
    async fn upload(&self, payload: &[u8]) -> UploadOutcome {
        let url = format!("{}/telemetry", self.endpoint.trim_end_matches('/'));

        let result = self
            .client
            .post(&url)
            .header("Content-Type", "application/octet-stream")
            .header("X-Compressed", "true")
            .header("X-Vehicle-VIN", &self.vin)
            .body(payload.to_vec())
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => UploadOutcome::Accepted,
            Ok(response) => {
                tracing::warn!(status = %response.status(), vin = %self.vin, "ingest endpoint rejected upload");
                UploadOutcome::Rejected
            }
            Err(e) => {
                let err = AgentError::TransportFailure(e.to_string());
                tracing::warn!(error = %err, vin = %self.vin, "upload request failed");
                UploadOutcome::Rejected
            }
        }
    }
}

/// A scriptable in-process transport, analogous to this project's
/// mock DDS interface: exercises the agent's store-and-forward logic end
/// to end without a real network call. Public rather than `#[cfg(test)]`
/// so integration tests in `tests/` can use it too.
pub struct ScriptedTransport {
    outcomes: Mutex<Vec<UploadOutcome>>,
    calls: AtomicUsize,
    uploaded: Mutex<Vec<Vec<u8>>>,
}

impl ScriptedTransport {
    /// Each call to `upload` consumes the next scripted outcome; once the
    /// script is exhausted, the last outcome repeats.
    pub fn new(outcomes: Vec<UploadOutcome>) -> Self {
        assert!(!outcomes.is_empty(), "ScriptedTransport needs at least one outcome");
        Self {
            outcomes: Mutex::new(outcomes),
            calls: AtomicUsize::new(0),
            uploaded: Mutex::new(Vec::new()),
        }
    }

    /// A transport that always returns the same outcome.
    pub fn always(outcome: UploadOutcome) -> Self {
        Self::new(vec![outcome])
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every payload passed to `upload`, in call order.
    pub fn uploaded_payloads(&self) -> Vec<Vec<u8>> {
        self.uploaded.lock().unwrap().clone()
    }
}

impl Transport for ScriptedTransport {
    async fn upload(&self, payload: &[u8]) -> UploadOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.uploaded.lock().unwrap().push(payload.to_vec());
        let mut outcomes = self.outcomes.lock().unwrap();
        if outcomes.len() > 1 {
            outcomes.remove(0)
        } else {
            outcomes[0]
        }
    }
}
