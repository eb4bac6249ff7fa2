//! Listing-crawler main entry point
//!
//! This is the command-line interface for the listing crawler.

use anyhow::Context;
use clap::Parser;
use listing_crawler::config::{hash_config_text, load_config_with_hash, validate, Config};
use listing_crawler::crawler::crawl;
use listing_crawler::driver::{BrowserDriver, ChromiumDriver};
use listing_crawler::output::print_statistics;
use listing_crawler::CrawlerError;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Listing-crawler: drives a search form and exports every listing's details
///
/// Opens the search page in Chromium, applies the configured filters, walks
/// every result page, opens each listing's detail view and writes the
/// extracted fields as a delimited table. Runs with built-in defaults when no
/// configuration file is given.
#[derive(Parser, Debug)]
#[command(name = "listing-crawler")]
#[command(version = "1.0.0")]
#[command(about = "Browser-driven listing and detail crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Write the table to this file instead of the configured one
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Run the browser without a window
    #[arg(long)]
    headless: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let mut config = load(&cli)?;

    if let Some(output) = &cli.output {
        config.output.path = output.display().to_string();
    }
    if cli.headless {
        config.browser.headless = true;
    }
    validate(&config).context("Invalid configuration after command-line overrides")?;

    if cli.dry_run {
        handle_dry_run(&config)?;
        return Ok(ExitCode::SUCCESS);
    }

    handle_crawl(config).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("listing_crawler=info,warn"),
            1 => EnvFilter::new("listing_crawler=debug,info"),
            2 => EnvFilter::new("listing_crawler=trace,debug"),
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

/// Loads the configuration file, or the defaults when none is given
fn load(cli: &Cli) -> anyhow::Result<Config> {
    match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            Ok(config)
        }
        None => {
            let config = Config::default();
            let rendered = toml::to_string(&config).context("Failed to render default configuration")?;
            tracing::info!(
                "Using built-in configuration (hash: {})",
                hash_config_text(&rendered)
            );
            Ok(config)
        }
    }
}

/// Handles the --dry-run mode: prints the effective configuration
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Listing-crawler Dry Run ===\n");
    println!("{}", toml::to_string_pretty(config).context("Failed to render configuration")?);
    println!("✓ Configuration is valid");
    println!(
        "✓ Would search {} / {} for '{}' and write {}",
        config.search.state, config.search.city, config.search.property_type, config.output.path
    );
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> anyhow::Result<ExitCode> {
    let keep_open = config.browser.keep_open && !config.browser.headless;

    let driver = Arc::new(
        ChromiumDriver::launch(&config.browser)
            .await
            .context("Failed to start the browser")?
            .with_close_grace(config.timeouts.navigation_timeout()),
    );

    let report = crawl(driver.clone(), config).await;
    print_statistics(&report.stats);

    let window_gone = matches!(report.error, Some(CrawlerError::BrowserClosed));
    if keep_open && !window_gone {
        tracing::info!("Done. Close the browser window to exit");
        driver.closed().await;
    } else if !window_gone {
        if let Err(e) = driver.close().await {
            tracing::warn!("Failed to close the browser: {}", e);
        }
    }

    match report.error {
        None => Ok(ExitCode::SUCCESS),
        Some(e) => {
            tracing::error!("Crawl failed: {}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}
