// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Agent configuration: defaults, then environment variables, then CLI
//! flags -- narrowest wins. `clap`'s `derive` + `env` features
//! collapse the first two layers into one declaration; a flag only falls
//! back to its environment variable when absent on the command line, which
//! already gives CLI precedence over env.

use clap::Parser;
use std::path::PathBuf;

const DRAIN_PACE_MS: u64 = 100;

/// Telemetry agent configuration, resolved from CLI flags and environment
/// variables for a single vehicle.
#[derive(Parser, Debug, Clone)]
#[command(name = "telemetry-agent")]
#[command(author)]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Fault-tolerant vehicle telemetry edge agent")]
pub struct Config {
    /// Vehicle identifier.
    #[arg(long, env = "VEHICLE_VIN")]
    pub vin: String,

    /// Ingest endpoint base URL, e.g. `https://ingest.example.com`.
    #[arg(long, env = "TELEMETRY_ENDPOINT", default_value = "http://127.0.0.1:8080")]
    pub endpoint: String,

    /// Directory holding the per-VIN durable buffer file.
    #[arg(long, env = "TELEMETRY_BUFFER_DIR", default_value = "./buffer")]
    pub buffer_dir: PathBuf,

    /// Explicit sample source path. When unset, the candidate-path search
    /// is used.
    #[arg(long, env = "TELEMETRY_SOURCE")]
    pub source: Option<PathBuf>,

    /// Per-sample replay pacing delay, in milliseconds. This paces the
    /// replay harness only; it is unrelated to the fixed 100ms
    /// paced-drain delay the agent always applies while draining.
    #[arg(long, env = "TELEMETRY_PACE_MS", default_value_t = 100)]
    pub pace_ms: u64,
}

impl Config {
    /// Path of the per-VIN buffer file: `<buffer_dir>/<vin>.buffer.db`.
    pub fn buffer_path(&self) -> PathBuf {
        self.buffer_dir.join(format!("{}.buffer.db", self.vin))
    }

    /// The fixed paced-drain delay. Not configurable.
    pub fn drain_pace_ms(&self) -> u64 {
        DRAIN_PACE_MS
    }
}
