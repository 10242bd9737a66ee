//! Aphia-Harvest: a species-name harvester for the World Register of Marine Species
//!
//! This crate enumerates every species name registered under a taxonomic cluster
//! by walking the registry's "begins with" search for every alphabetic prefix,
//! paging through each result listing, and merging the results into a single
//! sorted, deduplicated name list.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;

use thiserror::Error;

/// Main error type for Aphia-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(
        "Failed to establish a connection with the registry after {attempts} attempts for prefix '{prefix}' ({last})"
    )]
    RetryExhausted {
        prefix: String,
        attempts: u32,
        last: crawler::FetchFailure,
    },

    #[error("Failed to resolve cluster {cluster_id}: {reason}")]
    ClusterLookup { cluster_id: u64, reason: String },

    #[error("Crawl task failed: {0}")]
    TaskFailed(String),

    #[error("Harvest cancelled before all prefixes were crawled")]
    Cancelled,

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Ensure that the level of detail is set to a value greater than or equal to 1 (got {0})")]
    InvalidDetailLevel(u32),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Aphia-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{harvest, CrawlResult, HarvestOutcome};
pub use output::HarvestReport;
pub use state::CrawlState;
