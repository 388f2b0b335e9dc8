// ─────────────────────────────────────────────────────────────────────
// Elyzer Control Core — Comparison Cycle Demo
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Feeds a short synthetic telemetry trace through the standard
//! comparison harness and prints every publication as JSON.
//!
//! Usage: `elyzer-cycle [config.json]`. Logs go to stderr and honour
//! `RUST_LOG`.

use elyzer_control::sink::ChannelSink;
use elyzer_control::ComparisonHarness;
use elyzer_core::baseline;
use elyzer_types::config::ControlSuiteConfig;
use elyzer_types::error::ElyzerResult;
use elyzer_types::state::SystemState;
use tokio::sync::mpsc;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

/// A stack warming up from 62 °C while production lags its target.
fn synthetic_trace() -> Vec<SystemState> {
    (0..6)
        .map(|k| {
            let k = k as f64;
            SystemState {
                stack_temperature_c: 62.0 + 3.0 * k,
                o2_production_lph: 22.0 + 0.8 * k,
                efficiency_pct: 76.0 - 0.6 * k,
                safety_margin_pct: 90.0 - 3.0 * k,
                ..SystemState::default()
            }
        })
        .collect()
}

#[tokio::main]
async fn main() -> ElyzerResult<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let mut config = match std::env::args().nth(1) {
        Some(path) => {
            info!(path = %path, "loading configuration");
            ControlSuiteConfig::from_file(&path)?
        }
        None => ControlSuiteConfig::default(),
    };
    // Replay as fast as the controllers allow
    config.harness.cadence_ms = 0;

    let mut harness = ComparisonHarness::standard(&config)?;
    info!(controllers = ?harness.controller_names(), "harness ready");

    let trace = synthetic_trace();
    let (tx, mut rx) = mpsc::channel(trace.len());
    let (mut sink, mut publications) = ChannelSink::channel();

    let replay = trace.clone();
    let producer = tokio::spawn(async move {
        for state in replay {
            if tx.send(state).await.is_err() {
                break;
            }
        }
    });
    let published = harness.run(&mut rx, &mut sink).await;
    drop(sink);
    if let Err(e) = producer.await {
        warn!(error = %e, "telemetry producer aborted");
    }

    // Cadence is zero, so publication k answers trace state k
    let mut states = trace.iter();
    while let Some(publication) = publications.recv().await {
        let Some(state) = states.next() else { break };
        let reference = baseline::evaluate(
            harness.model(),
            state,
            config.harness.evaluation_horizon,
            config.harness.nominal_current_a,
        )?;
        info!(
            cycle = publication.snapshot.cycle,
            baseline_fitness = reference,
            "baseline reference"
        );
        println!("{}", serde_json::to_string_pretty(&publication)?);
    }

    let wins = harness.history().win_counts();
    info!(published, wins = ?wins, "replay complete");
    Ok(())
}
