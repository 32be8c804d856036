mod config;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use blotter_engine::{run_sync, JsonDirStorage, Scraper, SyncOptions, SyncReport};
use blotter_logging::{blotter_error, blotter_info, LevelFilter, LogDestination};
use chrono::NaiveDate;
use clap::Parser;

#[derive(Parser)]
#[command(name = "blotter")]
#[command(about = "Harvest the daily police activity log into per-day files")]
struct Cli {
    /// RON settings file; defaults apply without one
    #[arg(long)]
    config: Option<PathBuf>,

    /// First day to harvest (YYYY-MM-DD); defaults to where the last run stopped
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Last day to harvest (YYYY-MM-DD); defaults to today
    #[arg(long)]
    through: Option<NaiveDate>,

    /// Harvest and report without storing anything
    #[arg(long)]
    dry_run: bool,

    /// Also write the log to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let destination = match &cli.log_file {
        Some(path) => LogDestination::Both(path.clone()),
        None => LogDestination::Terminal,
    };
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    blotter_logging::initialize(&destination, level);

    match run(cli) {
        Ok(report) => {
            print_summary(&report);
            ExitCode::SUCCESS
        }
        Err(err) => {
            blotter_error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<SyncReport> {
    let settings = config::load_settings(cli.config.as_deref())?;
    let storage = JsonDirStorage::new(settings.storage_dir.clone(), settings.max_days);
    let scraper = Scraper::new(settings.fetch.clone());
    let options = SyncOptions {
        from: cli.from,
        through: cli.through,
        dry_run: cli.dry_run,
    };

    // One task drives every request; the runtime never needs more than a
    // single thread.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let report = runtime
        .block_on(run_sync(&scraper, &settings, &storage, options))
        .context("sync failed")?;
    blotter_info!("Data directory: {:?}", storage.dir());
    Ok(report)
}

fn print_summary(report: &SyncReport) {
    for batch in &report.batches {
        println!("{}  {} record(s)", batch.date, batch.len());
    }
    let verb = if report.stored { "stored" } else { "harvested (dry run)" };
    println!(
        "{} record(s) over {} day(s) {}; {} old day(s) pruned",
        report.record_count(),
        report.batches.len(),
        verb,
        report.pruned
    );
}
