//! pagelat - per-page memory-access latency under five cache/fault states.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use pagelat_core::{clock, probe, ExperimentResult, KernelCache, RunConfig, Runner};

mod report;

/// Measure per-page memory-access latency on a block device or large file.
///
/// Runs five scenarios in order: warm read, minor fault, major fault, major
/// fault under eviction pressure, and O_DIRECT reads. Dropping the page
/// cache needs root; without it the cold-cache scenarios run warm.
#[derive(Parser)]
#[command(name = "pagelat")]
#[command(author, version, about)]
struct Cli {
    /// Block device or file to measure (opened read-only)
    device: PathBuf,

    /// Pages sampled per scenario
    #[arg(short = 'n', long, default_value_t = 300)]
    samples: usize,

    /// Page size in bytes
    #[arg(long, default_value_t = 4096)]
    page_size: usize,

    /// Cap the eviction scenario's cache fill, in bytes
    /// (default: all available memory)
    #[arg(long)]
    fill_limit: Option<u64>,

    /// Emit one JSON report instead of the table
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run(&Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = RunConfig {
        samples: cli.samples,
        page_size: cli.page_size,
        fill_limit: cli.fill_limit,
    };

    let system_page = probe::system_page_size();
    if config.page_size != system_page {
        warn!(
            "--page-size {} differs from the system page size {}; fault boundaries will not line up",
            config.page_size, system_page
        );
    }
    debug!(
        "clock read overhead ~{:.1} ns",
        clock::clock_overhead_ns(10_000)
    );

    let cache = KernelCache::new();
    let mut runner = Runner::new(&cli.device, &cache, config)
        .with_context(|| format!("setting up {}", cli.device.display()))?;

    let mut report = report::Report::new(&cli.device, runner.device_size());
    if !cli.json {
        println!("{}", report.header());
        println!();
    }

    finish_phase(&mut report, cli.json, runner.warm_read())?;
    finish_phase(&mut report, cli.json, runner.minor_fault())?;
    finish_phase(&mut report, cli.json, runner.major_fault())?;
    finish_phase(&mut report, cli.json, runner.major_fault_evicted())?;
    finish_phase(&mut report, cli.json, runner.direct_read())?;

    report.set_sink(runner.sink());
    if cli.json {
        println!("{}", report.to_json()?);
    } else {
        println!("\n(sink={})", runner.sink());
    }
    Ok(())
}

/// Print a completed phase's line (table mode) and keep its result, or skip
/// the phase when its error is soft. Only the direct-read phase produces
/// soft errors.
fn finish_phase(
    report: &mut report::Report,
    json: bool,
    outcome: pagelat_core::Result<ExperimentResult>,
) -> anyhow::Result<()> {
    match outcome {
        Ok(result) => {
            if !json {
                println!("{}", report::render_line(&result));
            }
            report.push(result);
            Ok(())
        }
        Err(e) if e.is_soft() => {
            warn!("skipping direct-read phase: {e}");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
