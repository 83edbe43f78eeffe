use anyhow::{bail, Context, Result};
use artifact_audit::{
    audit::Audit,
    cache::Cache,
    config::Config,
    dispatch::Dispatcher,
    feed::{normalize_with_stats, FeedFetcher},
    model::{Interruption, Report},
    output::{ensure_writable, print_findings_table, print_summary, write_report, ReportFormat},
    search::{AqlSearch, ArtifactSearch},
};
use clap::{ArgAction, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Exit codes for CI integration
mod exit_codes {
    pub const SUCCESS: u8 = 0;
    pub const ERROR: u8 = 1;
    pub const INTERRUPTED: u8 = 130;
}

#[derive(Parser)]
#[command(name = "artifact-audit")]
#[command(
    author,
    version,
    about = "Check an artifact repository for packages named in a supply-chain threat feed"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Audit a repository against the threat feed
    Scan {
        /// Repository base URL, e.g. https://acme.jfrog.io/artifactory
        base_url: String,

        /// Threat feed URL (overrides feed_url from the config file)
        #[arg(long, conflicts_with = "feed_file")]
        feed_url: Option<String>,

        /// Read the threat feed from a local CSV file instead of downloading it
        #[arg(long)]
        feed_file: Option<PathBuf>,

        /// Report file path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Report format (csv, json)
        #[arg(short, long)]
        format: Option<String>,

        /// Maximum concurrent repository queries
        #[arg(short, long)]
        concurrency: Option<usize>,

        /// Per-query timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Attempts per query for transient failures
        #[arg(long)]
        max_attempts: Option<u32>,

        /// Download the feed even if a cached snapshot is fresh
        #[arg(long)]
        refresh_feed: bool,

        /// Hide the progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// Show or create config file
    Config {
        /// Generate default config file
        #[arg(long)]
        init: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },

    /// Clear cached feed snapshots
    ClearCache,
}

struct ScanArgs {
    base_url: String,
    feed_url: Option<String>,
    feed_file: Option<PathBuf>,
    output: Option<PathBuf>,
    format: Option<String>,
    refresh_feed: bool,
    show_progress: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_codes::ERROR)
        }
    }
}

async fn run() -> Result<u8> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load().unwrap_or_else(|e| {
        warn!(error = %e, "Ignoring unreadable config file");
        Config::default()
    });

    match cli.command {
        Commands::Scan {
            base_url,
            feed_url,
            feed_file,
            output,
            format,
            concurrency,
            timeout,
            max_attempts,
            refresh_feed,
            no_progress,
        } => {
            if let Some(n) = concurrency {
                config.concurrency = n;
            }
            if let Some(secs) = timeout {
                config.timeout_secs = secs;
            }
            if let Some(n) = max_attempts {
                config.max_attempts = n;
            }

            let args = ScanArgs {
                base_url,
                feed_url,
                feed_file,
                output,
                format,
                refresh_feed,
                show_progress: !no_progress && std::io::stderr().is_terminal(),
            };
            run_scan(&config, args).await
        }
        Commands::Config { init, path } => {
            handle_config(init, path)?;
            Ok(exit_codes::SUCCESS)
        }
        Commands::ClearCache => {
            Cache::new().clear()?;
            println!("Cache cleared.");
            Ok(exit_codes::SUCCESS)
        }
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run_scan(config: &Config, args: ScanArgs) -> Result<u8> {
    // Setup: everything here must succeed before the first query.
    let format_str = args.format.unwrap_or_else(|| config.default_format.clone());
    let format = ReportFormat::from_str(&format_str).map_err(|e| anyhow::anyhow!(e))?;
    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(&config.output_path));
    ensure_writable(&output)?;

    let token = std::env::var(&config.token_env)
        .ok()
        .filter(|t| !t.trim().is_empty())
        .with_context(|| format!("Missing credential: set the {} environment variable", config.token_env))?;

    let search = AqlSearch::new(&args.base_url, token)?;
    debug!(endpoint = search.endpoint(), backend = search.name(), "Repository search ready");

    let feed_text = load_feed(config, args.feed_url, args.feed_file, args.refresh_feed).await?;

    let (mut candidates, stats) = normalize_with_stats(&feed_text);
    let before_ignore = candidates.len();
    candidates.retain(|c| !config.ignore.should_ignore_package(&c.package));
    info!(
        rows = stats.rows,
        dropped_rows = stats.dropped_rows,
        duplicates = stats.duplicates,
        ignored = before_ignore - candidates.len(),
        candidates = candidates.len(),
        "Normalized threat feed"
    );

    let dispatcher = Dispatcher::new(Arc::new(search), config.dispatch_options());
    let audit = Audit::new(dispatcher).with_auth_failure_threshold(config.auth_failure_threshold);

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let progress = args.show_progress.then(|| {
        let pb = ProgressBar::new(candidates.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap()
                .progress_chars("#>-"),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    });

    let mut found = 0usize;
    let report = audit
        .run(&candidates, cancel, |candidate, outcome| {
            if outcome.is_found() {
                found += 1;
            }
            if let Some(pb) = &progress {
                pb.set_message(format!("{} found, last {}", found, candidate.filename));
                pb.inc(1);
            }
        })
        .await;

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    let written = write_report(&report, format, &output)?;
    print_findings_table(&report);
    print_summary(&report, Some(&written));

    Ok(determine_exit_code(&report))
}

async fn load_feed(
    config: &Config,
    feed_url: Option<String>,
    feed_file: Option<PathBuf>,
    refresh: bool,
) -> Result<String> {
    if let Some(path) = feed_file {
        return FeedFetcher::read_file(&path);
    }

    let Some(url) = feed_url.or_else(|| config.feed_url.clone()) else {
        bail!("No threat feed configured: pass --feed-url or --feed-file, or set feed_url in the config file");
    };

    let cache = Cache::with_ttl_hours(config.feed_cache_ttl_hours);
    let timeout = Duration::from_secs(config.feed_timeout_secs.max(1));
    FeedFetcher::with_cache(Some(cache), timeout)?
        .refreshing(refresh)
        .fetch(&url)
        .await
}

/// Cancels the audit on Ctrl-C so the partial report can still be written.
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Interrupted: finishing in-flight queries and writing a partial report...");
            cancel.cancel();
        }
    });
}

fn determine_exit_code(report: &Report) -> u8 {
    match report.interrupted {
        None => exit_codes::SUCCESS,
        Some(Interruption::AuthFailures(_)) => exit_codes::ERROR,
        Some(Interruption::Cancelled) => exit_codes::INTERRUPTED,
    }
}

fn handle_config(init: bool, show_path: bool) -> Result<()> {
    let config_path = Config::config_path();

    if show_path {
        println!("{}", config_path.display());
        return Ok(());
    }

    if init {
        if config_path.exists() {
            println!("Config file already exists at: {}", config_path.display());
            return Ok(());
        }

        Config::default().save()?;
        println!("Created config file at: {}", config_path.display());
        println!();
        println!("Default configuration:");
        println!("{}", Config::generate_default_config());
        return Ok(());
    }

    if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)?;
        println!("Config file: {}", config_path.display());
        println!();
        println!("{}", content);
    } else {
        println!("No config file found.");
        println!("Run 'artifact-audit config --init' to create one.");
        println!();
        println!("Config path: {}", config_path.display());
    }

    Ok(())
}
