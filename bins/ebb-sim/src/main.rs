//! Ebb locking simulator.
//!
//! Replays a JSON scenario of locks, unwinds, rewards and losses against an
//! in-memory controller and prints JSON reports to stdout.

mod scenario;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use ebb_core::wad::{format_wad, parse_wad};
use ebb_locking::snapshot;
use tracing::info;

use crate::scenario::{Scenario, Simulator};

#[derive(Parser, Debug)]
#[command(
    name = "ebb-sim",
    version,
    about = "Replay lock/unwind scenarios against the Ebb locking controller"
)]
struct Args {
    /// Scenario file (JSON)
    #[arg(long)]
    scenario: PathBuf,

    /// Override the catastrophic loss threshold (decimal, e.g. "0.95")
    #[arg(long)]
    max_loss: Option<String>,

    /// Write the final controller state to this file
    #[arg(long)]
    snapshot_out: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log output format ("text" or "json")
    #[arg(long, default_value = "text")]
    log_format: String,
}

impl Args {
    /// Load the scenario and apply CLI overrides to its config.
    fn into_scenario(self) -> Result<(Scenario, Option<PathBuf>)> {
        let mut scenario = Scenario::load(&self.scenario)?;
        if let Some(raw) = &self.max_loss {
            let Some(p) = parse_wad(raw) else {
                bail!("--max-loss must be a decimal, got {raw:?}");
            };
            scenario.config.max_loss_percentage = p;
        }
        Ok((scenario, self.snapshot_out))
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level, &args.log_format);

    let (scenario, snapshot_out) = args.into_scenario()?;
    info!(
        steps = scenario.steps.len(),
        max_loss = %format_wad(scenario.config.max_loss_percentage),
        "Ebb simulator v{}",
        env!("CARGO_PKG_VERSION")
    );

    let mut sim = Simulator::new(&scenario)?;
    for (i, step) in scenario.steps.iter().enumerate() {
        let report = sim
            .apply(step)
            .with_context(|| format!("step {i}: {step:?}"))?;
        if let Some(report) = report {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    println!("{}", serde_json::to_string_pretty(&sim.report()?)?);
    info!(rejected = sim.rejected, status = %sim.controller().status(), "scenario finished");

    if let Some(path) = snapshot_out {
        snapshot::save_to(&path, sim.controller().state())
            .with_context(|| format!("writing snapshot {}", path.display()))?;
        info!(path = %path.display(), "snapshot written");
    }
    Ok(())
}

/// Initialize tracing subscriber with the given log level and output format.
///
/// Pass `format = "json"` for structured JSON output. Any other value
/// defaults to human-readable text. Logs go to stderr so reports on stdout
/// stay machine-readable.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
