use serde::Deserialize;
use std::path::PathBuf;

/// Default search endpoint of the World Register of Marine Species
pub const DEFAULT_BASE_URL: &str = "https://www.marinespecies.org/aphia.php";

/// Main configuration structure for Aphia-Harvest
///
/// Every section is optional in the TOML file; command-line flags are merged
/// on top before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub registry: RegistryConfig,
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
}

/// Registry endpoint and target cluster
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// URL of the registry's `aphia.php` endpoint
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Aphia identifier (PID) of the organism cluster
    #[serde(rename = "cluster-id")]
    pub cluster_id: Option<u64>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            cluster_id: None,
        }
    }
}

/// Crawl behaviour configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Length of the alphabetic search prefixes
    #[serde(rename = "detail-level")]
    pub detail_level: u32,

    /// Number of prefixes crawled concurrently
    pub workers: u32,

    /// Maximum number of attempts for a single page
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Backoff base in seconds; the wait after the n-th failure is `base^n`
    #[serde(rename = "backoff-base")]
    pub backoff_base: f64,

    /// Per-request timeout in seconds
    #[serde(rename = "request-timeout")]
    pub request_timeout: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            detail_level: 1,
            workers: 4,
            max_retries: 3,
            backoff_base: 2.0,
            request_timeout: 30,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    #[serde(rename = "crawler-version")]
    pub crawler_version: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: env!("CARGO_PKG_NAME").to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory the species names file is written to
    pub directory: Option<PathBuf>,
}
