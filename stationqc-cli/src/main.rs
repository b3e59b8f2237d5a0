//! Command-line runner for the station QC pipeline.
//!
//! Exit status: 0 when every station passed every stage, 1 when some
//! stations failed, 2 when the run could not complete.

mod progress;
mod summary;

use anyhow::{Context, Result};
use clap::Parser;
use progress::ProgressSink;
use stationqc::cancellation::CancellationToken;
use stationqc::config::PipelineConfig;
use stationqc::core::{PipelineReport, StationId};
use stationqc::events::{EventSink, LoggingEventSink};
use stationqc::pipeline::PipelineBuilder;
use stationqc::pool::{Concurrency, SequentialPool};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Staged quality control of daily climate-station records
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Pipeline configuration file (TOML)
    #[arg(short, long, env = "STATIONQC_CONFIG")]
    config: Option<PathBuf>,

    /// Directory of merged station files
    #[arg(long)]
    source: Option<PathBuf>,

    /// Station catalog CSV
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Only check these stations (comma separated)
    #[arg(long, value_delimiter = ',')]
    stations: Option<Vec<String>>,

    /// Workers per stage: a number, or "auto"
    #[arg(short = 'j', long)]
    concurrency: Option<Concurrency>,

    /// Check stations one at a time on the main task
    #[arg(long)]
    sequential: bool,

    /// Print the run report as JSON
    #[arg(long)]
    json: bool,

    /// Suppress progress and summary output
    #[arg(short, long)]
    quiet: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

impl Cli {
    /// Loads the configuration file, if any, and applies flag overrides.
    fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::load(path)
                .with_context(|| format!("loading configuration from {}", path.display()))?,
            None => PipelineConfig::default(),
        };

        if let Some(source) = &self.source {
            config.source_dir.clone_from(source);
        }
        if let Some(catalog) = &self.catalog {
            config.catalog = Some(catalog.clone());
        }
        if let Some(stations) = &self.stations {
            config.stations = Some(
                stations
                    .iter()
                    .map(|s| s.trim())
                    .filter(|s| !s.is_empty())
                    .map(StationId::from)
                    .collect(),
            );
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }

        config.validate()?;
        Ok(config)
    }
}

fn init_tracing(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if cli.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(cli: &Cli, cancel: CancellationToken) -> Result<PipelineReport> {
    let config = cli.pipeline_config()?;

    let catalog = config.load_catalog().context("loading station catalog")?;

    let events: Arc<dyn EventSink> = if cli.quiet || cli.json {
        Arc::new(LoggingEventSink)
    } else {
        Arc::new(ProgressSink::stderr())
    };
    let mut builder = PipelineBuilder::standard(&config, catalog)
        .event_sink(Arc::clone(&events))
        .cancellation(cancel);
    if cli.sequential {
        builder = builder.pool(Arc::new(SequentialPool::new().with_event_sink(events)));
    }
    let pipeline = builder.build().context("invalid pipeline layout")?;

    info!(source = %config.source_dir.display(), stages = ?pipeline.stage_names(), "Running pipeline");
    let report = pipeline
        .run(config.stations.clone())
        .await
        .with_context(|| format!("pipeline '{}' aborted", pipeline.name()))?;
    Ok(report)
}

/// What a Ctrl-C does at this point of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    /// Stop dispatching and let in-flight stations finish.
    Drain,
    /// A drain is already under way; exit now.
    Abort,
}

fn on_interrupt(cancel: &CancellationToken) -> Interrupt {
    if cancel.is_cancelled() {
        Interrupt::Abort
    } else {
        cancel.cancel("interrupted by user");
        Interrupt::Drain
    }
}

async fn watch_interrupts(cancel: CancellationToken) {
    while tokio::signal::ctrl_c().await.is_ok() {
        match on_interrupt(&cancel) {
            Interrupt::Drain => {
                warn!("Interrupted; finishing in-flight stations (press Ctrl-C again to abort)");
            }
            Interrupt::Abort => {
                error!("Interrupted twice; aborting");
                std::process::exit(2);
            }
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    let cancel = CancellationToken::new();
    tokio::spawn(watch_interrupts(cancel.clone()));

    match run(&cli, cancel).await {
        Ok(report) => {
            if cli.json {
                match serde_json::to_string_pretty(&report) {
                    Ok(json) => println!("{json}"),
                    Err(e) => {
                        eprintln!("Error: cannot serialize report: {e}");
                        return ExitCode::from(2);
                    }
                }
            } else if !cli.quiet {
                print!("{}", summary::render(&report));
            }
            if report.has_failures() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(2)
        }
    }
}
