// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Shared error taxonomy.
//!
//! Every fallible boundary in this crate returns a [`Result<T, AgentError>`]
//! or a narrower error that `From`-converts into it at the call site.

use thiserror::Error;

/// Errors surfaced by the agent's subsystems.
#[derive(Debug, Error)]
pub enum AgentError {
    /// A sample line could not be parsed or failed field-domain validation.
    #[error("source error: {0}")]
    Source(String),

    /// A buffer append or remove failed.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// The ingest endpoint timed out or returned a non-success response.
    #[error("transport failure: {0}")]
    TransportFailure(String),

    /// An in-buffer payload failed to decode during drain.
    #[error("malformed record in buffer entry {entry_id}: {reason}")]
    MalformedRecord {
        /// The buffer entry id that failed to decode.
        entry_id: i64,
        /// Human-readable decode failure reason.
        reason: String,
    },

    /// Could not open the sample source or the buffer store at startup.
    #[error("fatal initialisation failure: {0}")]
    FatalInit(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_category_context() {
        let err = AgentError::MalformedRecord {
            entry_id: 7,
            reason: "truncated payload".to_string(),
        };
        assert!(err.to_string().contains("entry 7"));
        assert!(err.to_string().contains("truncated payload"));
    }
}
