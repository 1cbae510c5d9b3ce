// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-field exponential-smoothing predictor and transmit-decision logic.

use crate::sample::Sample;
use std::time::{Duration, Instant};

/// Smoothing factor alpha.
const ALPHA: f32 = 0.3;

/// Per-field tolerances.
const TOL_SPEED: f32 = 2.0;
const TOL_POWER: f32 = 5.0;
const TOL_BATTERY: f32 = 0.5;
const TOL_HEADING: f32 = 5.0;

/// Forced full-transmission interval.
const RESYNC_INTERVAL: Duration = Duration::from_secs(30);

/// Per-sample transmit decision, one flag per field plus the resync flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decisions {
    /// Send `speed` this sample.
    pub speed: bool,
    /// Send `power` this sample.
    pub power: bool,
    /// Send `battery` this sample.
    pub battery: bool,
    /// Send `heading` this sample.
    pub heading: bool,
    /// This decision is a forced full resync.
    pub is_resync: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct FieldState {
    predicted: f32,
    initialised: bool,
}

impl FieldState {
    fn decide(&self, actual: f32, tol: f32) -> bool {
        !self.initialised || (actual - self.predicted).abs() > tol
    }

    fn update(&mut self, actual: f32) {
        let prior = if self.initialised {
            self.predicted
        } else {
            actual
        };
        self.predicted = ALPHA * actual + (1.0 - ALPHA) * prior;
        self.initialised = true;
    }
}

/// Shared transmit-count statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stats {
    /// Total samples decided.
    pub total: u64,
    /// Samples with at least one field (or a resync) transmitted.
    pub transmitted: u64,
    /// Samples where every field matched the server's prediction.
    pub skipped: u64,
}

/// Exponential-smoothing predictor with per-field state and a shared resync
/// clock. Lives for the lifetime of the agent; never reset on link
/// transitions.
pub struct Predictor {
    speed: FieldState,
    power: FieldState,
    battery: FieldState,
    heading: FieldState,
    last_resync_at: Instant,
    resync_interval: Duration,
    stats: Stats,
}

impl Predictor {
    /// Construct a predictor whose resync clock starts now, so the first
    /// `decide` call is never itself treated as already 30s overdue.
    pub fn new() -> Self {
        Self::with_resync_interval(RESYNC_INTERVAL)
    }

    /// Construct a predictor with a non-default resync interval. Production
    /// code should use [`Self::new`]; this exists so tests can exercise the
    /// resync cadence without a real 30-second wait.
    pub fn with_resync_interval(resync_interval: Duration) -> Self {
        Self {
            speed: FieldState::default(),
            power: FieldState::default(),
            battery: FieldState::default(),
            heading: FieldState::default(),
            last_resync_at: Instant::now(),
            resync_interval,
            stats: Stats::default(),
        }
    }

    /// Current shared statistics, read by the periodic logging checkpoint.
    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Run the per-sample predict, decide, update algorithm.
    pub fn decide(&mut self, sample: &Sample) -> Decisions {
        self.stats.total += 1;

        let now = Instant::now();
        let is_resync = now.duration_since(self.last_resync_at) >= self.resync_interval;
        if is_resync {
            self.last_resync_at = now;
        }

        let decisions = if is_resync {
            Decisions {
                speed: true,
                power: true,
                battery: true,
                heading: true,
                is_resync: true,
            }
        } else {
            Decisions {
                speed: self.speed.decide(sample.speed, TOL_SPEED),
                power: self.power.decide(sample.power, TOL_POWER),
                battery: self.battery.decide(sample.battery as f32, TOL_BATTERY),
                heading: self.heading.decide(sample.heading as f32, TOL_HEADING),
                is_resync: false,
            }
        };

        if decisions.speed || decisions.power || decisions.battery || decisions.heading {
            self.stats.transmitted += 1;
        } else {
            self.stats.skipped += 1;
        }

        // Update happens after the decision is computed, using the
        // predictor's state as it stood before this sample, regardless of
        // whether the decision was a resync.
        self.speed.update(sample.speed);
        self.power.update(sample.power);
        self.battery.update(sample.battery as f32);
        self.heading.update(sample.heading as f32);

        decisions
    }
}

impl Default for Predictor {
    fn default() -> Self {
        Self::new()
    }
}
