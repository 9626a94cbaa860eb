//! Lemma-Search main entry point
//!
//! This is the command-line interface for the Lemma-Search site indexer.

use anyhow::Context;
use clap::Parser;
use lemma_search::api::{ApiResponse, SearchResponse, StatisticsResponse};
use lemma_search::config::{load_config_with_hash, Config};
use lemma_search::output::print_statistics;
use lemma_search::IndexingService;
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Lemma-Search: a per-site lemma index with ranked search
///
/// Lemma-Search crawls the configured sites, indexes the normalized word
/// roots of every page, and answers ranked queries with highlighted
/// snippets. Responses are printed as JSON.
#[derive(Parser, Debug)]
#[command(name = "lemma-search")]
#[command(version)]
#[command(about = "A per-site lemma index with ranked search", long_about = None)]
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

    /// Re-index every configured site (Ctrl-C stops)
    #[arg(long, conflicts_with_all = ["index_page", "search", "stats"])]
    index: bool,

    /// Re-index a single page
    #[arg(long, value_name = "URL", conflicts_with_all = ["index", "search", "stats"])]
    index_page: Option<String>,

    /// Search the index
    #[arg(long, value_name = "QUERY", conflicts_with_all = ["index", "index_page", "stats"])]
    search: Option<String>,

    /// Restrict the search to one site
    #[arg(long, value_name = "URL", requires = "search")]
    site: Option<String>,

    /// Number of results to skip
    #[arg(long, default_value_t = 0, requires = "search")]
    offset: usize,

    /// Maximum number of results (defaults to the configured limit)
    #[arg(long, requires = "search")]
    limit: Option<usize>,

    /// Show index statistics
    #[arg(long, conflicts_with_all = ["index", "index_page", "search"])]
    stats: bool,

    /// Print statistics as JSON instead of a report
    #[arg(long, requires = "stats")]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    let service = IndexingService::new(&config).context("Failed to initialize the index")?;

    if cli.index {
        handle_index(&service).await?;
    } else if let Some(url) = &cli.index_page {
        print_json(&ApiResponse::from(service.index_page(url).await))?;
    } else if let Some(query) = &cli.search {
        let results = service.search(query, cli.site.as_deref(), cli.offset, cli.limit);
        print_json(&SearchResponse::from(results))?;
    } else if cli.stats {
        handle_stats(&service, cli.json)?;
    } else {
        print_sites(&config);
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("lemma_search=info,warn"),
            1 => EnvFilter::new("lemma_search=debug,info"),
            2 => EnvFilter::new("lemma_search=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Handles --index: runs a full re-index, stopping cooperatively on Ctrl-C
async fn handle_index(service: &IndexingService) -> anyhow::Result<()> {
    let started = service.start_indexing().await;
    let failed = started.is_err();
    print_json(&ApiResponse::from(started))?;
    if failed {
        return Ok(());
    }

    let report = tokio::select! {
        report = service.wait_for_completion() => report,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupt received, waiting for running branches to finish");
            print_json(&ApiResponse::from(service.stop_indexing()))?;
            service.wait_for_completion().await
        }
    };

    if let Some(report) = report {
        for site in &report.sites {
            match &site.last_error {
                Some(error) => tracing::warn!("{}: {} ({})", site.site_url, site.status, error),
                None => tracing::info!(
                    "{}: {} ({} pages)",
                    site.site_url,
                    site.status,
                    site.tally.succeeded
                ),
            }
        }
    }

    Ok(())
}

/// Handles --stats: prints statistics as a report or JSON
fn handle_stats(service: &IndexingService, json: bool) -> anyhow::Result<()> {
    let statistics = service.statistics();
    if json {
        return print_json(&StatisticsResponse::from(statistics));
    }

    print_statistics(&statistics?);
    Ok(())
}

/// Without a command: shows what the configuration would index
fn print_sites(config: &Config) {
    println!("=== Lemma-Search ===\n");
    println!("Database: {}", config.database.path);
    println!(
        "Crawler: {} workers, {}ms request delay, {}s timeout",
        config.crawler.worker_count(),
        config.crawler.request_delay,
        config.crawler.timeout
    );
    println!("\nSites ({}):", config.sites.len());
    for site in &config.sites {
        println!("  - {} ({})", site.name, site.url);
    }
    println!("\nUse --index, --index-page, --search or --stats.");
}
