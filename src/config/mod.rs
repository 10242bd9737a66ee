//! Configuration module for Aphia-Harvest
//!
//! This module handles loading and validating the optional TOML configuration
//! file. Command-line flags are merged on top of the file before validation.
//!
//! # Example
//!
//! ```no_run
//! use aphia_harvest::config::{load_config, validate};
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! validate(&config).unwrap();
//! println!("Crawling with {} workers", config.crawler.workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, OutputConfig, RegistryConfig, UserAgentConfig, DEFAULT_BASE_URL,
};

pub use parser::{load_config, parse_config};
pub use validation::validate;
