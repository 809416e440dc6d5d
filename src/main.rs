use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use log::{info, warn, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use logsnap::cli::Args;
use logsnap::collectors::collector::{CollectionReport, Collector};
use logsnap::collectors::registry::{SourceKind, SourceRegistry};
use logsnap::config::{load_or_create_config, BuildInfo, LogsnapConfig};
use logsnap::utils::summary;

fn main() -> Result<()> {
    // Parse arguments
    let args = Args::parse();
    let build = BuildInfo::current();

    if args.version {
        println!("{}", build);
        return Ok(());
    }

    // Initialize logging
    initialize_logging(args.verbose)?;

    if args.list_sources {
        list_sources();
        return Ok(());
    }

    info!("Starting {}", build);

    let config = load_or_create_config(args.config.as_deref())?;
    let settings = RunSettings::merge(&args, &config);

    let window = args.resolve_window(Local::now())?;
    info!(
        "Collecting {} to {} from {}",
        window.start.format("%Y-%m-%d %H:%M:%S"),
        window.end.format("%Y-%m-%d %H:%M:%S"),
        settings.log_root.display()
    );

    let registry = SourceRegistry::with_builtin();
    let collector = Collector::from_registry(
        &registry,
        &settings.sources,
        &settings.log_root,
        &settings.output_dir,
    )?
    .with_max_workers(settings.max_workers);

    let report = match collector.collect(&window) {
        Ok(report) => report,
        Err(e) if e.is_empty_result() => {
            warn!("{}", e);
            return Err(e.into());
        }
        Err(e) => return Err(e).context("Log collection failed"),
    };

    report_results(&report);

    if args.json {
        println!("{}", summary::create_collection_summary(&report, &build)?);
    } else {
        println!("{}", report.archive_path.display());
    }

    Ok(())
}

/// Initialize logging with the specified verbosity level
fn initialize_logging(verbose: bool) -> Result<()> {
    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    TermLogger::init(
        log_level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .context("Failed to initialize logger")?;
    Ok(())
}

fn list_sources() {
    for kind in SourceKind::ALL {
        println!("{:<20} {:<24} {}", kind.as_str(), kind.subdir(), kind.description());
    }
}

/// Configuration file values with command-line overrides applied.
struct RunSettings {
    log_root: PathBuf,
    output_dir: PathBuf,
    sources: Vec<String>,
    max_workers: Option<usize>,
}

impl RunSettings {
    fn merge(args: &Args, config: &LogsnapConfig) -> Self {
        RunSettings {
            log_root: args.log_dir.clone().unwrap_or_else(|| config.log_root_path()),
            output_dir: args.output_dir.clone().unwrap_or_else(|| config.output_path()),
            sources: if args.programs.is_empty() {
                config.sources.clone()
            } else {
                args.programs.clone()
            },
            max_workers: args.workers.or(config.max_workers),
        }
    }
}

fn report_results(report: &CollectionReport) {
    for source in &report.sources {
        match &source.error {
            Some(error) => warn!("[{}] failed: {}", source.source_name, error),
            None => info!(
                "[{}] {} files, {} lines, {} matched, {} bytes",
                source.source_name,
                source.file_count(),
                source.total_lines(),
                source.matched_lines(),
                source.file_size_bytes()
            ),
        }
        if source.failed_files() > 0 {
            warn!("[{}] {} files could not be processed", source.source_name, source.failed_files());
        }
    }

    info!(
        "Snapshot written to {} ({} entries, {} matched lines)",
        report.archive_path.display(),
        report.archive.entries,
        report.matched_lines()
    );
}
