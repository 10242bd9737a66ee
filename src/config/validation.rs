use crate::config::types::{Config, CrawlerConfig, OutputConfig, RegistryConfig, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_registry_config(&config.registry)?;
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    Ok(())
}

fn validate_registry_config(config: &RegistryConfig) -> Result<(), ConfigError> {
    if config.cluster_id.is_none() {
        return Err(ConfigError::Validation(
            "cluster id (PID) is required".to_string(),
        ));
    }

    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' must use http or https",
            config.base_url
        )));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.detail_level < 1 {
        return Err(ConfigError::InvalidDetailLevel(config.detail_level));
    }

    if config.workers < 1 {
        return Err(ConfigError::Validation(format!(
            "workers must be >= 1, got {}",
            config.workers
        )));
    }

    if config.max_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "max-retries must be >= 1, got {}",
            config.max_retries
        )));
    }

    if !config.backoff_base.is_finite() || config.backoff_base < 0.0 {
        return Err(ConfigError::Validation(format!(
            "backoff-base must be a non-negative number of seconds, got {}",
            config.backoff_base
        )));
    }

    if config.request_timeout < 1 {
        return Err(ConfigError::Validation(
            "request-timeout must be >= 1 second".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler-name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler-name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    match &config.directory {
        None => Err(ConfigError::Validation(
            "output directory is required".to_string(),
        )),
        Some(dir) if dir.as_os_str().is_empty() => Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        )),
        Some(_) => Ok(()),
    }
}
