//! Post-Sweep main entry point
//!
//! This is the command-line interface for the Post-Sweep timeline crawler.

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::Parser;
use post_sweep::config::{load_config_with_hash, Config, OutputConfig};
use post_sweep::output::{print_summary, CrawlOutcome, JsonLinesSink};
use post_sweep::query::{parse_compact_date, Endpoints};
use post_sweep::storage::open_checkpoint;
use post_sweep::{run_crawl, SweepError};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::{self, time::FormatTime};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Post-Sweep: an incremental search timeline crawler
///
/// Post-Sweep walks a search timeline from TO back to FROM, writing every
/// result as a JSON line. The pagination cursor is checkpointed after each
/// page, so rerunning the same command resumes an interrupted crawl.
#[derive(Parser, Debug)]
#[command(name = "post-sweep")]
#[command(version)]
#[command(about = "An incremental search timeline crawler", long_about = None)]
struct Cli {
    /// First day of the crawl window (YYYYMMDD)
    #[arg(value_name = "FROM", value_parser = parse_date)]
    from: NaiveDate,

    /// Day the search runs until (YYYYMMDD)
    #[arg(value_name = "TO", value_parser = parse_date)]
    to: NaiveDate,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Start a fresh crawl, discarding the saved cursor
    #[arg(long)]
    fresh: bool,

    /// Show the query and file locations without crawling
    #[arg(long)]
    dry_run: bool,
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    parse_compact_date(raw).map_err(|e| e.to_string())
}

fn compact(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (config, config_hash) = match &cli.config {
        Some(path) => {
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            (config, Some(hash))
        }
        None => (Config::default(), None),
    };

    let from = compact(cli.from);
    let to = compact(cli.to);

    if cli.dry_run {
        return handle_dry_run(&config, cli.from, cli.to, &from, &to);
    }

    std::fs::create_dir_all(&config.output.data_dir).with_context(|| {
        format!(
            "Failed to create data directory {}",
            config.output.data_dir.display()
        )
    })?;

    let _guard = setup_logging(cli.verbose, cli.quiet, &config.output.log_path(&from, &to))?;

    match (&cli.config, &config_hash) {
        (Some(path), Some(hash)) => tracing::info!(
            "Configuration loaded from {} (hash: {})",
            path.display(),
            hash
        ),
        _ => tracing::info!("No configuration file given, using defaults"),
    }

    handle_crawl(&config, &cli, &from, &to).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Events go to stdout and are appended to the run log at `log_path`. The
/// returned guard must be held until exit so buffered lines reach the file.
fn setup_logging(verbose: u8, quiet: bool, log_path: &Path) -> anyhow::Result<WorkerGuard> {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("post_sweep=info,warn"),
            1 => EnvFilter::new("post_sweep=debug,info"),
            2 => EnvFilter::new("post_sweep=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let directory = log_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = log_path
        .file_name()
        .context("Log path has no file name")?;

    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(directory, file_name));

    let stdout_layer = fmt::layer()
        .with_timer(BracketedUtc)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_timer(BracketedUtc)
        .with_level(false)
        .with_target(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install the tracing subscriber")?;

    Ok(guard)
}

/// `[YYYY-MM-DD HH:MM:SS]` in UTC
struct BracketedUtc;

impl FormatTime for BracketedUtc {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "[{}]", Utc::now().format("%Y-%m-%d %H:%M:%S"))
    }
}

/// Handles the --dry-run mode: shows what would be crawled
fn handle_dry_run(
    config: &Config,
    from_date: NaiveDate,
    to_date: NaiveDate,
    from: &str,
    to: &str,
) -> anyhow::Result<()> {
    let criteria = config
        .query
        .to_builder()
        .since(from_date)
        .until(to_date)
        .build();
    let endpoints = Endpoints::from_config(&config.endpoint)?;

    println!("=== Post-Sweep Dry Run ===\n");

    println!("Query:");
    println!("  q: {}", criteria.render_query());
    println!("  Language: {}", criteria.language().unwrap_or("(any)"));
    println!("  First request: {}", criteria.build_url(&endpoints, None));

    println!("\nCrawler:");
    println!("  Page delay: {}ms", config.crawler.page_delay_ms);
    match config.crawler.max_attempts.filter(|_| !config.crawler.retry_forever) {
        Some(n) => println!("  Max attempts per page: {}", n),
        None => println!("  Max attempts per page: unbounded"),
    }
    println!("  Malformed items: {:?}", config.crawler.malformed_items);

    println!("\nFiles:");
    println!("  Results: {}", config.output.resolved_results_path(from, to).display());
    println!(
        "  Checkpoint: {}",
        config.output.resolved_checkpoint_path(from, to).display()
    );
    println!("  Log: {}", config.output.log_path(from, to).display());
    println!("  Run stem: {}", OutputConfig::run_stem(from, to));

    Ok(())
}

/// Handles normal crawl mode
async fn handle_crawl(config: &Config, cli: &Cli, from: &str, to: &str) -> anyhow::Result<()> {
    let checkpoint_path = config.output.resolved_checkpoint_path(from, to);
    if cli.fresh {
        tracing::info!("Fresh crawl requested, discarding {}", checkpoint_path.display());
    }
    let checkpoint = open_checkpoint(&checkpoint_path, cli.fresh)?;

    let results_path = config.output.resolved_results_path(from, to);
    if let Some(parent) = results_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut sink = JsonLinesSink::append_to(&results_path)?;
    tracing::info!("Writing results to {}", results_path.display());

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current step");
            ctrl_c.cancel();
        }
    });

    let result = run_crawl(
        config,
        cli.from,
        cli.to,
        Box::new(checkpoint),
        &mut sink,
        cancel,
    )
    .await;

    match result {
        Ok(summary) => {
            if summary.outcome == CrawlOutcome::Cancelled {
                tracing::info!("Rerun the same command to resume from the saved cursor");
            }
            print_summary(&summary);
            Ok(())
        }
        Err(SweepError::CrawlAborted {
            attempts,
            last_error,
        }) => {
            tracing::error!(
                "Crawl aborted after {} attempts: {}. The saved cursor is kept for resuming",
                attempts,
                last_error
            );
            Err(SweepError::CrawlAborted {
                attempts,
                last_error,
            }
            .into())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
