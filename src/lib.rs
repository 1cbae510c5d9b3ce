// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fault-tolerant vehicle telemetry edge agent.
//!
//! Reads replayed samples for a single vehicle, runs each through a
//! per-field predictive compressor, and ships the result to an ingest
//! endpoint -- or, while the link is down, appends it to a durable local
//! buffer for later delivery.
//!
//! # Architecture
//!
//! ```text
//! Agent
//! +-- SampleSource     (JSON-lines replay log)
//! +-- Predictor        (per-field exponential smoothing + resync clock)
//! +-- TransmissionRecord codec (compact binary wire format)
//! +-- BufferStore      (SQLite-backed durable queue)
//! +-- Transport        (pooled HTTP client)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use telemetry_agent::{Agent, Config, HttpTransport, LinkState, ShutdownFlag, SqliteBufferStore};
//! use clap::Parser;
//!
//! let config = Config::parse();
//! let buffer = SqliteBufferStore::open(config.buffer_path())?;
//! let transport = HttpTransport::new(&config.endpoint, &config.vin)?;
//! let mut agent = Agent::new(&config.vin, buffer, transport, LinkState::new(), ShutdownFlag::new());
//! ```

pub mod agent;
pub mod buffer;
pub mod codec;
pub mod config;
pub mod error;
pub mod link;
pub mod predictor;
pub mod sample;
pub mod source;
pub mod transport;

pub use agent::Agent;
pub use buffer::{BufferEntry, BufferStore, SqliteBufferStore};
pub use codec::TransmissionRecord;
pub use config::Config;
pub use error::AgentError;
pub use link::{
    install_interrupt_handler, spawn_stdin_toggle, LinkState, LinkToggleHandle, ShutdownFlag,
};
pub use predictor::{Decisions, Predictor, Stats};
pub use sample::Sample;
pub use source::{resolve_source_path, SampleSource, SourceError};
pub use transport::{HttpTransport, ScriptedTransport, Transport, UploadOutcome};
