// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Main control loop: owns the predictor, buffer store, and transport, and
//! drives the per-sample algorithm to completion.

use crate::buffer::BufferStore;
use crate::codec::TransmissionRecord;
use crate::error::AgentError;
use crate::link::{LinkState, ShutdownFlag};
use crate::predictor::Predictor;
use crate::sample::Sample;
use crate::source::SampleSource;
use crate::transport::{Transport, UploadOutcome};
use std::collections::HashMap;
use std::time::Duration;

const STATS_CHECKPOINT_INTERVAL: u64 = 50;
const PACED_DRAIN_DELAY: Duration = Duration::from_millis(100);

/// Drives one vehicle's sample stream to completion against a buffer store
/// and transport, applying the predictive compression and store-and-forward
/// logic.
pub struct Agent<B: BufferStore, T: Transport> {
    vin: String,
    predictor: Predictor,
    buffer: B,
    transport: T,
    link_state: LinkState,
    shutdown: ShutdownFlag,
    was_offline: bool,
    pace: Duration,
    poison_counts: HashMap<i64, u32>,
}

impl<B: BufferStore, T: Transport> Agent<B, T> {
    pub fn new(
        vin: impl Into<String>,
        buffer: B,
        transport: T,
        link_state: LinkState,
        shutdown: ShutdownFlag,
    ) -> Self {
        // A non-empty buffer at construction means a prior run left entries
        // undrained (crash, or shutdown while offline); treat that the same
        // as an in-process offline excursion so the first online sample
        // drains them, rather than leaving them stranded until the next
        // explicit offline/online toggle.
        let was_offline = buffer.is_empty().map(|empty| !empty).unwrap_or(false);
        Self {
            vin: vin.into(),
            predictor: Predictor::new(),
            buffer,
            transport,
            link_state,
            shutdown,
            was_offline,
            pace: Duration::ZERO,
            poison_counts: HashMap::new(),
        }
    }

    /// Pace each sample in [`Self::run`] by `pace`, simulating the
    /// cadence of the source this agent replays from. Zero (the default)
    /// processes the source as fast as it can be read.
    pub fn with_pace(mut self, pace: Duration) -> Self {
        self.pace = pace;
        self
    }

    /// As [`Self::new`], but with a non-default predictor resync interval.
    /// Production code should use [`Self::new`]; this exists so tests can
    /// exercise the resync cadence without a real 30-second wait.
    pub fn with_resync_interval(
        vin: impl Into<String>,
        buffer: B,
        transport: T,
        link_state: LinkState,
        shutdown: ShutdownFlag,
        resync_interval: Duration,
    ) -> Self {
        Self {
            predictor: Predictor::with_resync_interval(resync_interval),
            ..Self::new(vin, buffer, transport, link_state, shutdown)
        }
    }

    /// Run the per-sample loop to completion, then the shutdown sequence.
    /// Returns once the source is exhausted or an operator interrupt is
    /// observed.
    pub async fn run(&mut self, mut source: SampleSource) {
        loop {
            if self.shutdown.is_set() {
                tracing::info!(vin = %self.vin, "interrupt observed, stopping");
                break;
            }

            let next = source.next_sample();
            let sample = match next {
                None => break,
                Some(Ok(sample)) => sample,
                Some(Err(e)) => {
                    let err = AgentError::from(e);
                    tracing::warn!(vin = %self.vin, error = %err, "skipping malformed sample line");
                    continue;
                }
            };

            self.process_sample(&sample).await;
            self.maybe_log_checkpoint();

            if !self.pace.is_zero() {
                tokio::time::sleep(self.pace).await;
            }
        }

        self.shutdown_sequence().await;
    }

    /// Run the predict-decide-ship (or buffer) steps for a single sample.
    async fn process_sample(&mut self, sample: &Sample) {
        let decision = self.predictor.decide(sample);

        if self.link_state.is_online() {
            if self.was_offline {
                self.drain().await;
                self.was_offline = false;
            }

            let compressed = compressed_record(sample, &decision);
            let bytes = compressed.encode();

            match self.transport.upload(&bytes).await {
                UploadOutcome::Accepted => {
                    tracing::debug!(vin = %self.vin, timestamp = sample.timestamp, "sample shipped");
                }
                UploadOutcome::Rejected => {
                    self.buffer_full_record(sample);
                }
            }
        } else {
            self.buffer_full_record(sample);
            self.was_offline = true;
        }
    }

    fn buffer_full_record(&mut self, sample: &Sample) {
        let full = full_record(sample);
        let bytes = full.encode();
        match self.buffer.store(sample.timestamp, bytes) {
            Ok(()) => {
                tracing::debug!(vin = %self.vin, timestamp = sample.timestamp, "sample buffered");
            }
            Err(e) => {
                tracing::error!(vin = %self.vin, timestamp = sample.timestamp, error = %e, "buffer append failed, sample lost");
            }
        }
    }

    /// Drain the buffer oldest-first, pacing each successful upload by
    /// [`PACED_DRAIN_DELAY`].
    async fn drain(&mut self) {
        let entries = match self.buffer.iter_oldest_first() {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!(vin = %self.vin, error = %e, "failed to iterate buffer for drain");
                return;
            }
        };

        for entry in entries {
            if let Err(e) = TransmissionRecord::decode_entry(&entry.payload, entry.id) {
                let count = self.poison_counts.entry(entry.id).or_insert(0);
                *count += 1;
                tracing::warn!(vin = %self.vin, entry_id = entry.id, error = %e, poison_count = *count, "malformed buffer entry, left in place");
                continue;
            }

            match self.transport.upload(&entry.payload).await {
                UploadOutcome::Accepted => {
                    if let Err(e) = self.buffer.remove(entry.id) {
                        tracing::error!(vin = %self.vin, entry_id = entry.id, error = %e, "failed to remove drained entry");
                    }
                    tokio::time::sleep(PACED_DRAIN_DELAY).await;
                }
                UploadOutcome::Rejected => {
                    tracing::warn!(vin = %self.vin, entry_id = entry.id, "drain upload failed, aborting drain");
                    return;
                }
            }
        }
    }

    /// Current predictor statistics.
    pub fn stats(&self) -> crate::predictor::Stats {
        self.predictor.stats()
    }

    /// Direct access to the buffer store, for callers that need to inspect
    /// or reopen it (e.g. across a simulated process restart).
    pub fn buffer(&self) -> &B {
        &self.buffer
    }

    /// Per-entry failed-decode counts accumulated across drain passes.
    /// Not persisted; reset if the process restarts.
    pub fn poison_counts(&self) -> &HashMap<i64, u32> {
        &self.poison_counts
    }

    fn maybe_log_checkpoint(&self) {
        let stats = self.predictor.stats();
        if stats.total > 0 && stats.total % STATS_CHECKPOINT_INTERVAL == 0 {
            tracing::info!(
                vin = %self.vin,
                total = stats.total,
                transmitted = stats.transmitted,
                skipped = stats.skipped,
                poisoned_entries = self.poison_counts.len(),
                "statistics checkpoint"
            );
        }
    }

    /// Final drain if needed, then a closing stats line.
    async fn shutdown_sequence(&mut self) {
        if self.link_state.is_online() && self.was_offline {
            self.drain().await;
            self.was_offline = false;
        }

        let stats = self.predictor.stats();
        tracing::info!(
            vin = %self.vin,
            total = stats.total,
            transmitted = stats.transmitted,
            skipped = stats.skipped,
            "agent shutting down"
        );
    }
}

fn compressed_record(sample: &Sample, decision: &crate::predictor::Decisions) -> TransmissionRecord {
    TransmissionRecord {
        timestamp: sample.timestamp,
        odometer: sample.odometer,
        is_resync: decision.is_resync,
        speed: decision.speed.then_some(sample.speed),
        power: decision.power.then_some(sample.power),
        battery: decision.battery.then_some(sample.battery),
        heading: decision.heading.then_some(sample.heading),
    }
}

fn full_record(sample: &Sample) -> TransmissionRecord {
    TransmissionRecord {
        timestamp: sample.timestamp,
        odometer: sample.odometer,
        is_resync: true,
        speed: Some(sample.speed),
        power: Some(sample.power),
        battery: Some(sample.battery),
        heading: Some(sample.heading),
    }
}
