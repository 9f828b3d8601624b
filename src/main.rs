//! tab-archiver main entry point
//!
//! This is the command-line interface for the tab-archiver page crawler.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tab_archiver::backend::HttpBackend;
use tab_archiver::config::{load_config_with_hash, Config};
use tab_archiver::crawler::crawl;
use tab_archiver::host::HttpHost;
use tab_archiver::output::{print_summary, print_targets};
use tab_archiver::queue::{fetch_targets, fetch_targets_by_id};
use tab_archiver::{TargetFilter, TargetQueue};
use tracing_subscriber::EnvFilter;

/// tab-archiver: archive a list of pages through a browser tab
///
/// tab-archiver fetches its target list from the article backend, loads every
/// page in turn, waits until it is ready (or gives up waiting), saves a full
/// offline snapshot and posts the outcome back to the backend.
#[derive(Parser, Debug)]
#[command(name = "tab-archiver")]
#[command(version)]
#[command(about = "Sequential page archival through a browser tab", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Only re-crawl articles whose last capture failed
    #[arg(long, conflicts_with = "success")]
    failed: bool,

    /// Only re-crawl articles that were captured successfully
    #[arg(long, conflicts_with = "failed")]
    success: bool,

    /// Crawl exactly these article ids, in this order
    #[arg(long, value_delimiter = ',', conflicts_with_all = ["failed", "success", "from", "size"])]
    ids: Vec<String>,

    /// Offset into the article listing
    #[arg(long, value_name = "N")]
    from: Option<usize>,

    /// Maximum number of articles to crawl
    #[arg(long, value_name = "M")]
    size: Option<usize>,

    /// Show the targets that would be crawled without crawling them
    #[arg(long)]
    dry_run: bool,
}

impl Cli {
    fn filter(&self) -> TargetFilter {
        if self.failed {
            TargetFilter::Failed
        } else if self.success {
            TargetFilter::Success
        } else {
            TargetFilter::All
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    let backend = Arc::new(
        HttpBackend::new(&config.backend, &config.user_agent)
            .context("failed to build backend client")?,
    );

    let queue = if cli.ids.is_empty() {
        fetch_targets(backend.as_ref(), cli.filter(), cli.from, cli.size).await
    } else {
        fetch_targets_by_id(backend.as_ref(), &cli.ids).await
    }
    .with_context(|| format!("failed to fetch targets from {}", config.backend.base_url))?;

    if cli.dry_run {
        handle_dry_run(&config, &config_hash, &queue);
        return Ok(());
    }

    handle_crawl(config, queue, backend).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("tab_archiver=info,warn"),
            1 => EnvFilter::new("tab_archiver=debug,info"),
            2 => EnvFilter::new("tab_archiver=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows configuration and the target list
fn handle_dry_run(config: &Config, config_hash: &str, queue: &TargetQueue) {
    println!("=== tab-archiver Dry Run ===\n");

    println!("Crawler Configuration:");
    println!(
        "  Forced capture after: {}ms",
        config.crawler.force_capture_timeout_ms
    );
    println!("  Preprocess delay: {}ms", config.crawler.preprocess_delay_ms);
    println!("  Handshake timeout: {}ms", config.crawler.handshake_timeout_ms);
    println!(
        "  On handshake failure: {:?}",
        config.crawler.handshake_failure
    );
    println!("  Tab: {}", config.host.tab_id);

    println!("\nBackend:");
    println!("  URL: {}", config.backend.base_url);

    println!("\nUser Agent: {}", config.user_agent.header_value());
    println!("Config hash: {}\n", config_hash);

    print_targets(queue);

    println!("\n✓ Configuration is valid");
    println!("✓ Would archive {} page(s)", queue.len());
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: Config,
    queue: TargetQueue,
    backend: Arc<HttpBackend>,
) -> anyhow::Result<()> {
    let host = HttpHost::new(&config.user_agent, &config.host)
        .context("failed to build page host")?;

    let summary = crawl(&config, queue, Arc::new(host), backend, |stop| {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, stopping crawl");
                stop.stop();
            }
        });
    })
    .await;

    match summary {
        Ok(summary) => {
            tracing::info!("Crawl completed successfully");
            print_summary(&summary);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
