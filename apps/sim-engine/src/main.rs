//! Sim Engine Binary
//!
//! Runs a Monte Carlo batch over a historical price series and prints
//! the terminal P&L distribution summary as JSON.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin sim-engine -- params.yaml prices.json
//! cargo run --bin sim-engine -- params.yaml prices.json --reference-pnl 1250.0
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Log level (default: info)

use anyhow::{Context, bail};
use serde::Serialize;
use sim_engine::sim::MonteCarloDriver;
use sim_engine::telemetry::init_telemetry;
use sim_engine::{BatchResult, load_params, load_series};

/// Parsed command-line arguments.
struct CliArgs {
    params_path: String,
    prices_path: String,
    reference_pnl: Option<f64>,
}

/// Report printed to stdout after a batch.
#[derive(Serialize)]
struct BatchReport<'a> {
    summary: &'a sim_engine::PnlSummary,
    completed: u64,
    failed: u64,
    cancelled: u64,
    margin_called: u64,
    total_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    reference_percentile: Option<f64>,
}

fn main() -> anyhow::Result<()> {
    init_telemetry();

    let args = parse_args()?;

    let params = load_params(&args.params_path)
        .with_context(|| format!("loading parameters from '{}'", args.params_path))?;
    let series = load_series(&args.prices_path)
        .with_context(|| format!("loading price series from '{}'", args.prices_path))?;

    tracing::info!(
        params = %args.params_path,
        prices = %args.prices_path,
        timesteps = series.len(),
        assets = series.num_assets(),
        "Inputs loaded"
    );

    let driver = MonteCarloDriver::new(params)?;
    let result = driver.run(&series)?;

    print_report(&result, args.reference_pnl)?;
    Ok(())
}

/// Parse positional paths and the optional reference P&L flag.
fn parse_args() -> anyhow::Result<CliArgs> {
    let mut positional = Vec::new();
    let mut reference_pnl = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--reference-pnl" {
            let value = args
                .next()
                .context("--reference-pnl requires a value")?
                .parse::<f64>()
                .context("--reference-pnl value must be a number")?;
            reference_pnl = Some(value);
        } else {
            positional.push(arg);
        }
    }

    if positional.len() != 2 {
        bail!("usage: sim-engine <params.yaml> <prices.json> [--reference-pnl <value>]");
    }

    let mut positional = positional.into_iter();
    Ok(CliArgs {
        params_path: positional.next().unwrap_or_default(),
        prices_path: positional.next().unwrap_or_default(),
        reference_pnl,
    })
}

/// Serialize the batch summary to stdout.
// Truncation acceptable: outcome count fits in u64
#[allow(clippy::cast_possible_truncation)]
fn print_report(result: &BatchResult, reference_pnl: Option<f64>) -> anyhow::Result<()> {
    let margin_called = result
        .outcomes()
        .filter(|o| o.margin_call.is_some())
        .count() as u64;

    let report = BatchReport {
        summary: &result.summary,
        completed: result.completed,
        failed: result.failed,
        cancelled: result.cancelled,
        margin_called,
        total_time_ms: result.total_time_ms,
        reference_percentile: reference_pnl.map(|pnl| result.percentile_of(pnl)),
    };

    let json = serde_json::to_string_pretty(&report).context("serializing batch report")?;
    println!("{json}");
    Ok(())
}
