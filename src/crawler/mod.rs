//! Crawler module for harvesting species names
//!
//! This module contains the core harvesting logic, including:
//! - Prefix enumeration
//! - HTTP fetching of search result pages
//! - Classification of result pages
//! - The per-prefix pagination and retry loop
//! - Overall crawl coordination with fail-fast cancellation

mod classifier;
mod cluster;
mod coordinator;
mod fetcher;
mod prefix;
mod prefix_crawler;

pub use classifier::{classify_page, PageOutcome};
pub use cluster::{cluster_url, extract_cluster_name, resolve_cluster_name, MISSING_CLUSTER_NAME};
pub use coordinator::Coordinator;
pub use fetcher::{build_http_client, FetchFailure, HttpPageSource, PageRequest, PageSource};
pub use prefix::generate_prefixes;
pub use prefix_crawler::{crawl_prefix, CrawlResult, PrefixOutcome};

use crate::config::{validate, Config};
use crate::output::{names_file_path, write_names_file, HarvestReport};
use crate::state::RetryPolicy;
use crate::{ConfigError, HarvestError};
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Everything a finished harvest produced
#[derive(Debug, Clone)]
pub struct HarvestOutcome {
    /// Display name of the cluster
    pub cluster_name: String,

    /// Where the names file was written
    pub output_path: PathBuf,

    /// Names and counters
    pub report: HarvestReport,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl HarvestOutcome {
    /// Wall-clock duration of the crawl
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// A validated harvest, ready to crawl
///
/// Preparing a harvest validates the configuration, enumerates the prefixes,
/// and resolves the cluster name, so configuration problems surface before
/// any search request is sent.
#[derive(Debug)]
pub struct Harvest {
    config: Config,
    cluster_id: u64,
    directory: PathBuf,
    client: Client,
    cluster_name: String,
    prefixes: Vec<String>,
}

impl Harvest {
    /// Validates `config` and resolves the cluster name
    pub async fn prepare(config: Config) -> Result<Self, HarvestError> {
        validate(&config)?;

        let cluster_id = config.registry.cluster_id.ok_or_else(|| {
            ConfigError::Validation("cluster id (PID) is required".to_string())
        })?;
        let directory = config.output.directory.clone().ok_or_else(|| {
            ConfigError::Validation("output directory is required".to_string())
        })?;

        let prefixes = generate_prefixes(config.crawler.detail_level)?;

        let client = build_http_client(
            &config.user_agent,
            Duration::from_secs(config.crawler.request_timeout),
        )?;

        let cluster_name =
            resolve_cluster_name(&client, &config.registry.base_url, cluster_id).await?;
        tracing::info!("Resolved cluster {} to '{}'", cluster_id, cluster_name);

        Ok(Self {
            config,
            cluster_id,
            directory,
            client,
            cluster_name,
            prefixes,
        })
    }

    pub fn cluster_id(&self) -> u64 {
        self.cluster_id
    }

    pub fn cluster_name(&self) -> &str {
        &self.cluster_name
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Path the names file will be written to
    pub fn output_path(&self) -> PathBuf {
        names_file_path(&self.directory, &self.cluster_name)
    }

    /// Crawls every prefix and writes the names file
    ///
    /// Nothing is written unless every prefix crawl succeeded.
    pub async fn run(self, cancel: CancellationToken) -> Result<HarvestOutcome, HarvestError> {
        let started_at = Utc::now();
        let output_path = self.output_path();

        let source =
            HttpPageSource::new(self.client, &self.config.registry.base_url, self.cluster_id)?;
        let policy = RetryPolicy {
            max_retries: self.config.crawler.max_retries,
            backoff_base: self.config.crawler.backoff_base,
        };
        let coordinator = Coordinator::with_cancellation(
            Arc::new(source),
            policy,
            self.config.crawler.workers as usize,
            cancel,
        );

        let report = coordinator.run(self.prefixes).await?;

        write_names_file(&output_path, &report.names)?;
        tracing::info!(
            "Wrote {} unique names to {}",
            report.unique_count(),
            output_path.display()
        );

        Ok(HarvestOutcome {
            cluster_name: self.cluster_name,
            output_path,
            report,
            started_at,
            finished_at: Utc::now(),
        })
    }
}

/// Runs a complete harvest
///
/// This is the main entry point for a harvest. It will:
/// 1. Validate the configuration
/// 2. Resolve the cluster name
/// 3. Crawl every prefix across the worker pool
/// 4. Aggregate and write the names file
///
/// # Example
///
/// ```no_run
/// use aphia_harvest::config::Config;
/// use aphia_harvest::crawler::harvest;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut config = Config::default();
/// config.registry.cluster_id = Some(101);
/// config.output.directory = Some("./out".into());
///
/// let outcome = harvest(config).await?;
/// println!("{} unique species", outcome.report.unique_count());
/// # Ok(())
/// # }
/// ```
pub async fn harvest(config: Config) -> Result<HarvestOutcome, HarvestError> {
    Harvest::prepare(config)
        .await?
        .run(CancellationToken::new())
        .await
}
