//! petrescue-scraper main entry point
//!
//! Command-line interface for the incremental PetRescue harvester.

use anyhow::Context;
use clap::Parser;
use petrescue_scraper::config::{compute_config_hash, load_effective_config, Config};
use petrescue_scraper::crawler::{harvest, HarvestScope};
use petrescue_scraper::output::{load_statistics, print_run_report, print_statistics};
use petrescue_scraper::storage::open_storage;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// petrescue-scraper: an incremental harvester for adoptable animals
///
/// Discovers listings and rescue groups, scrapes only those not already in
/// the database, and saves them in small batches so an interrupted run can
/// simply be started again.
#[derive(Parser, Debug)]
#[command(name = "petrescue-scraper")]
#[command(version)]
#[command(about = "Incremental harvester for adoptable animals and rescue groups", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Print the effective configuration and exit
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show row counts from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,

    /// Harvest animals (and their images) only
    #[arg(long, conflicts_with = "groups_only")]
    animals_only: bool,

    /// Harvest rescue groups only
    #[arg(long, conflicts_with = "animals_only")]
    groups_only: bool,
}

impl Cli {
    fn scope(&self) -> HarvestScope {
        if self.animals_only {
            HarvestScope::AnimalsOnly
        } else if self.groups_only {
            HarvestScope::GroupsOnly
        } else {
            HarvestScope::All
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    match &cli.config {
        Some(path) => tracing::info!("Loading configuration from: {}", path.display()),
        None => tracing::info!("No configuration file given, using defaults"),
    }
    let config = load_effective_config(cli.config.as_deref()).context("invalid configuration")?;
    tracing::info!(
        "Configuration loaded successfully (hash: {})",
        compute_config_hash(&config)
    );

    if cli.dry_run {
        handle_dry_run(&config, cli.scope());
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_harvest(config, cli.scope()).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("petrescue_scraper=info,warn"),
            1 => EnvFilter::new("petrescue_scraper=debug,info"),
            2 => EnvFilter::new("petrescue_scraper=trace,debug"),
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

/// Handles the --dry-run mode: shows what a run would do
fn handle_dry_run(config: &Config, scope: HarvestScope) {
    println!("=== petrescue-scraper Dry Run ===\n");

    println!("Site:");
    println!("  Base URL: {}", config.site.base_url);
    println!("  Page size: {}", config.site.per_page);
    println!("  Categories: {}", config.site.categories.join(", "));

    println!("\nCache:");
    println!("  Directory: {}", config.cache.directory);
    println!("  Index policy: {}", config.cache.index_policy);
    println!("  Detail policy: {}", config.cache.detail_policy);

    println!("\nHarvest:");
    println!("  Batch size: {}", config.harvest.batch_size);
    println!("  Detail concurrency: {}", config.harvest.detail_concurrency);
    println!("  Request timeout: {}s", config.harvest.request_timeout_secs);
    println!("  Animals: {}", if scope.includes_animals() { "yes" } else { "no" });
    println!("  Groups: {}", if scope.includes_groups() { "yes" } else { "no" });

    println!("\nUser Agent: {}", config.user_agent.header_value());
    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows row counts from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))
        .with_context(|| format!("failed to open {}", config.output.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(config: Config, scope: HarvestScope) -> anyhow::Result<()> {
    tracing::info!(
        "Starting harvest of {} (index cache: {}, detail cache: {})",
        config.site.base_url,
        config.cache.index_policy,
        config.cache.detail_policy
    );

    match harvest(config, scope).await {
        Ok(report) => {
            print_run_report(&report);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e.into())
        }
    }
}
