use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use gcode_archiver_core::config::AppConfig;
use gcode_archiver_moonraker::{FetchError, MoonrakerClient, build_url};
use gcode_archiver_mover::{Mode, MoveError, MoveSummary, Mover};
use gcode_archiver_retention::{FileRecord, partition, records_from_index};
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

mod report;

/// Exit status for connection failures, timeouts and non-2xx responses.
const EXIT_NETWORK: u8 = 2;
const EXIT_FAILURE: u8 = 1;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Keep the N most recent G-code files known to Moonraker and archive the rest",
    long_about = "Queries Moonraker's gcode_metadata, ranks files by max(modified, print_start_time), \
                  keeps the most recent ones in place and moves the rest into the archive directory.\n\
                  Defaults can also come from gcode-archiver.toml or GCODE_ARCHIVER_* environment variables."
)]
struct Args {
    /// Moonraker host [default: localhost]
    #[arg(long)]
    host: Option<String>,

    /// Moonraker port [default: 7125]
    #[arg(long)]
    port: Option<u16>,

    /// Moonraker endpoint path [default: /server/database/item?namespace=gcode_metadata]
    #[arg(long)]
    endpoint: Option<String>,

    /// HTTP timeout in seconds [default: 10]
    #[arg(long, value_name = "SECONDS", value_parser = parse_timeout)]
    timeout: Option<f64>,

    /// Number of most-recent files to keep [default: 42]
    #[arg(long, value_name = "N")]
    keep: Option<usize>,

    /// Directory containing G-code files [default: ~/printer_data/gcode]
    #[arg(long, value_name = "DIR")]
    gcode_dir: Option<String>,

    /// Directory to move archived files into [default: ~/printer_data/gcode/archive]
    #[arg(long, value_name = "DIR")]
    archive_dir: Option<String>,

    /// Move files (the default)
    #[arg(long, conflicts_with = "dry_run")]
    execute: bool,

    /// Print mv commands without moving files
    #[arg(long)]
    dry_run: bool,

    /// Print keep/archive lists and skipped files
    #[arg(long, short)]
    verbose: bool,

    /// Also append logs to this file
    #[arg(long, value_name = "PATH")]
    log_file: Option<String>,
}

impl Args {
    fn mode(&self) -> Mode {
        if self.dry_run { Mode::DryRun } else { Mode::Execute }
    }

    /// Flags win over config file and environment.
    fn apply(&self, config: &mut AppConfig) {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }
        if let Some(keep) = self.keep {
            config.keep = keep;
        }
        if let Some(dir) = &self.gcode_dir {
            config.gcode_dir = dir.clone();
        }
        if let Some(dir) = &self.archive_dir {
            config.archive_dir = dir.clone();
        }
        if let Some(path) = &self.log_file {
            config.log_file = Some(path.clone());
        }
    }
}

fn parse_timeout(raw: &str) -> Result<f64, String> {
    let secs: f64 = raw.parse().map_err(|_| format!("not a number: {}", raw))?;
    if secs > 0.0 && Duration::try_from_secs_f64(secs).is_ok() {
        Ok(secs)
    } else {
        Err("timeout must be a positive, representable number of seconds".to_string())
    }
}

fn init_logging(verbose: bool, log_file: Option<&Path>) -> Option<WorkerGuard> {
    let level = if verbose { "debug" } else { "info" };
    let default_directives = format!(
        "warn,gcode_archiver={level},gcode_archiver_core={level},gcode_archiver_moonraker={level},\
         gcode_archiver_retention={level},gcode_archiver_mover={level}"
    );
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true);

    let mut guard = None;
    let file_layer = log_file.and_then(|path| {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path);
        match file {
            Ok(file) => {
                let (non_blocking, worker) = tracing_appender::non_blocking(file);
                guard = Some(worker);
                Some(
                    tracing_subscriber::fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(false),
                )
            }
            Err(e) => {
                eprintln!("⚠️ Cannot open log file {}: {}", path.display(), e);
                None
            }
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    guard
}

async fn run(args: &Args, config: &AppConfig) -> anyhow::Result<MoveSummary> {
    let url = build_url(&config.host, config.port, &config.endpoint);
    let client = MoonrakerClient::new(
        Duration::try_from_secs_f64(config.timeout_secs).context("Invalid timeout")?,
    )?;

    let index = client
        .fetch_gcode_index(&url)
        .await
        .with_context(|| format!("Failed to query Moonraker at {}", url))?;

    let partition = partition(records_from_index(&index), config.keep);
    info!(
        "🗂️ Keeping {} of {} files, archiving {}",
        partition.keep.len(),
        partition.total(),
        partition.archive.len()
    );

    let mode = args.mode();
    let mover = Mover::new(config.gcode_dir_path(), config.archive_dir_path(), mode);

    print!("{}", report::preamble(&partition, args.verbose, mode, mover.archive_dir()));

    let verbose = args.verbose;
    let summary = mover
        .archive(partition.archive.iter().map(FileRecord::name), |outcome| {
            if verbose || !outcome.is_quiet() {
                println!("{}", outcome);
            }
        })
        .await?;

    Ok(summary)
}

fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<FetchError>() {
        Some(fetch) if fetch.is_network() => EXIT_NETWORK,
        _ => EXIT_FAILURE,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    let mut config = match AppConfig::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("❌ Error: Configuration invalid: {}", e);
            return ExitCode::from(EXIT_FAILURE);
        }
    };
    args.apply(&mut config);

    let _guard = init_logging(args.verbose, config.log_file_path().as_deref());
    gcode_archiver_core::init();

    match run(&args, &config).await {
        Ok(summary) => {
            info!(
                "✅ Done: {} moved, {} planned, {} skipped, {} already archived, {} destination exists, {} failed",
                summary.moved,
                summary.planned,
                summary.missing + summary.refused,
                summary.archived,
                summary.existing,
                summary.failed
            );
            if summary.failed > 0 {
                warn!("⚠️ {} files could not be moved", summary.failed);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            if let Some(MoveError::SourceDirMissing(dir)) = e.downcast_ref::<MoveError>() {
                error!("G-code directory unavailable: {}", dir.display());
            }
            eprintln!("❌ {:#}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}
