//! Aphia-Harvest main entry point
//!
//! This is the command-line interface for the Aphia-Harvest species name harvester.

use anyhow::Context;
use aphia_harvest::config::{load_config, validate, Config};
use aphia_harvest::crawler::{generate_prefixes, Harvest, HarvestOutcome};
use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

const BANNER: &str = r"    _          _    _         _  _                        _
   /_\  _ __ | |_ (_) __ _  | || | __ _ _ ____   _____ ___| |_
  //_\\| '_ \| ' \| |/ _` | | __ |/ _` | '__\ \ / / -_|_-<  _|
 /  _  \ .__/|_||_|_|\__,_| |_||_|\__,_|_|   \_/\___/__/\__|
 \_/ \_/_|
";

/// Aphia-Harvest: extract species names from the World Register of Marine Species
///
/// Searches the registry for every alphabetic prefix of the configured length
/// below an organism cluster and writes the sorted, deduplicated species names
/// to `marine<Cluster>.txt` in the output directory.
#[derive(Parser, Debug)]
#[command(name = "aphia-harvest")]
#[command(version)]
#[command(about = "Extract species names from WoRMS", long_about = None)]
struct Cli {
    /// The PID of the organism cluster
    #[arg(short, long)]
    pid: Option<u64>,

    /// The directory to write the species names file to
    #[arg(short, long, value_name = "DIR")]
    directory: Option<PathBuf>,

    /// The level of detail (prefix length)
    #[arg(short, long)]
    level: Option<u32>,

    /// The number of prefixes crawled concurrently
    #[arg(short, long)]
    threads: Option<u32>,

    /// Maximum number of attempts for requesting one page
    #[arg(short, long)]
    retries: Option<u32>,

    /// Backoff base in seconds between retries (exponential)
    #[arg(short, long)]
    sleep: Option<f64>,

    /// Registry endpoint to query
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Optional TOML configuration file; flags override its values
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate the configuration and show what would be crawled without crawling
    #[arg(long)]
    dry_run: bool,
}

impl Cli {
    /// Merges command-line flags over the configuration file (or defaults)
    fn into_config(self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => load_config(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
            None => Config::default(),
        };

        if let Some(pid) = self.pid {
            config.registry.cluster_id = Some(pid);
        }
        if let Some(base_url) = self.base_url {
            config.registry.base_url = base_url;
        }
        if let Some(directory) = self.directory {
            config.output.directory = Some(directory);
        }
        if let Some(level) = self.level {
            config.crawler.detail_level = level;
        }
        if let Some(threads) = self.threads {
            config.crawler.workers = threads;
        }
        if let Some(retries) = self.retries {
            config.crawler.max_retries = retries;
        }
        if let Some(sleep) = self.sleep {
            config.crawler.backoff_base = sleep;
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let dry_run = cli.dry_run;
    let quiet = cli.quiet;
    let config = cli.into_config()?;

    validate(&config).context("Invalid configuration")?;

    if dry_run {
        return handle_dry_run(&config);
    }

    handle_harvest(config, quiet).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("aphia_harvest=info,warn"),
            1 => EnvFilter::new("aphia_harvest=debug,info"),
            2 => EnvFilter::new("aphia_harvest=trace,debug"),
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

/// Handles the --dry-run mode: shows what would be crawled without any request
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let prefixes = generate_prefixes(config.crawler.detail_level)?;

    println!("=== Aphia-Harvest Dry Run ===\n");
    println!("Registry:");
    println!("  Endpoint: {}", config.registry.base_url);
    if let Some(pid) = config.registry.cluster_id {
        println!("  PID: {}", pid);
    }
    println!("\nCrawler Configuration:");
    print_crawler_details(config);
    if let Some(directory) = &config.output.directory {
        println!("\nOutput directory: {}", directory.display());
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would search {} prefixes ({} .. {})",
        prefixes.len(),
        prefixes.first().map(String::as_str).unwrap_or(""),
        prefixes.last().map(String::as_str).unwrap_or("")
    );

    Ok(())
}

/// Handles the main harvest
async fn handle_harvest(config: Config, quiet: bool) -> anyhow::Result<()> {
    let harvest = Harvest::prepare(config).await?;

    if !quiet {
        print_details(&harvest);
    }

    // Ctrl-C aborts the run without writing the names file
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, cancelling harvest");
                cancel.cancel();
            }
        });
    }

    match harvest.run(cancel).await {
        Ok(outcome) => {
            if !quiet {
                print_summary(&outcome);
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e).context("No species names file was written")
        }
    }
}

fn print_details(harvest: &Harvest) {
    println!("{}", BANNER);
    println!("DETAILS\n-------");
    println!("Organism Cluster: {}", harvest.cluster_name());
    println!("PID: {}", harvest.cluster_id());
    print_crawler_details(harvest.config());
    println!("Prefixes: {}", harvest.prefixes().len());
    println!("Output: {}\n", harvest.output_path().display());
}

fn print_crawler_details(config: &Config) {
    let crawler = &config.crawler;
    println!("Level of Detail: {}", crawler.detail_level);
    println!("Workers: {}", crawler.workers);
    println!("Maximum Retries: {}", crawler.max_retries);
    println!(
        "Sleep Range: {} seconds - {} seconds",
        crawler.backoff_base,
        crawler
            .backoff_base
            .powi(i32::try_from(crawler.max_retries).unwrap_or(i32::MAX))
    );
}

fn print_summary(outcome: &HarvestOutcome) {
    let report = &outcome.report;

    println!("\nSUMMARY\n-------");
    println!("Amount: {} names extracted", report.raw_count);
    println!("Amount: {} unique species", report.unique_count());
    println!("File: {}", outcome.output_path.display());
    println!(
        "Duration: {:.1} seconds",
        outcome.duration().num_milliseconds() as f64 / 1000.0
    );

    if !report.is_complete() {
        println!(
            "Prefixes with too many species to extract: {}",
            report.incomplete.join(", ")
        );
    }
}
