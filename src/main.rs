// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Telemetry Agent CLI
//!
//! # Usage
//!
//! ```bash
//! # Resolve the sample source from the candidate-path search
//! telemetry-agent --vin 1HGCM82633A004352 --endpoint https://ingest.example.com
//!
//! # Point at an explicit replay log and buffer directory
//! telemetry-agent --vin 1HGCM82633A004352 \
//!     --endpoint https://ingest.example.com \
//!     --source samples/1HGCM82633A004352.jsonl \
//!     --buffer-dir /var/lib/telemetry-agent
//! ```

use clap::Parser;
use std::process::ExitCode;
use std::time::Duration;
use telemetry_agent::{
    install_interrupt_handler, spawn_stdin_toggle, resolve_source_path, Agent, Config,
    HttpTransport, LinkState, SampleSource, ShutdownFlag, SqliteBufferStore,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,telemetry_agent=info")),
        )
        .init();

    let config = Config::parse();

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "fatal initialisation failure");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    tracing::info!(vin = %config.vin, endpoint = %config.endpoint, "telemetry agent starting");

    let source_path = resolve_source_path(&config.vin, config.source.as_deref())
        .ok_or_else(|| anyhow::anyhow!("no sample source found for VIN {}", config.vin))?;
    let source = SampleSource::open(&source_path)?;

    std::fs::create_dir_all(&config.buffer_dir)?;
    let buffer = SqliteBufferStore::open(config.buffer_path())?;
    let transport = HttpTransport::new(&config.endpoint, &config.vin)?;

    let link_state = LinkState::new();
    let shutdown = ShutdownFlag::new();

    install_interrupt_handler(shutdown.clone())?;
    spawn_stdin_toggle(link_state.toggle_handle());

    let mut agent = Agent::new(&config.vin, buffer, transport, link_state, shutdown)
        .with_pace(Duration::from_millis(config.pace_ms));
    agent.run(source).await;

    Ok(())
}
