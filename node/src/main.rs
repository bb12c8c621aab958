//! Ledgerscan binary.

mod cli;
mod report;
mod util;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser as _;
use dotenvy::dotenv;
use lc_block_source::JsonRpcBlockSource;
use lc_scan::{run_scan, ScanReport};
use tracing::{error, info};

use cli::{CliArgs, RunConfig};
use util::logging::init_logging;

#[tokio::main]
#[allow(clippy::print_stderr)]
async fn main() -> ExitCode {
    dotenv().ok();
    if let Err(e) = init_logging() {
        // No subscriber yet, stderr is all we have.
        eprintln!("Failed to initialize logging: {e:#}");
        return ExitCode::FAILURE;
    }
    let args = CliArgs::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), error_chain = ?e, "Ledgerscan failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: CliArgs) -> anyhow::Result<()> {
    let config = RunConfig::try_from(args).context("Invalid configuration")?;
    let report = scan(&config).await?;
    report::write_report(&report, &mut std::io::stdout().lock()).context("Writing report")?;
    Ok(())
}

async fn scan(config: &RunConfig) -> anyhow::Result<ScanReport> {
    info!(
        window_size = config.scan.window_size.get(),
        failure_policy = ?config.scan.failure_policy,
        "Starting ledgerscan"
    );
    let source = JsonRpcBlockSource::new(config.endpoint.clone());
    let report = run_scan(Arc::new(source), &config.scan).await.context("Scanning block window")?;
    info!(
        tip = %report.tip,
        blocks_scanned = report.blocks_scanned,
        blocks_skipped = report.blocks_skipped,
        transfers = report.transfers,
        addresses = report.ranked.len(),
        "Scan complete"
    );
    Ok(report)
}
