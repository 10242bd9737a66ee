//! HTTP fetcher implementation
//!
//! This module handles all requests to the registry's search endpoint:
//! - Building the HTTP client with a proper user agent string
//! - Building the paginated search URL for a prefix
//! - Turning non-200 responses and network errors into [`FetchFailure`]
//!
//! Retries are not handled here; the prefix crawler owns the retry policy.

use crate::config::UserAgentConfig;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client, StatusCode};
use std::fmt;
use std::time::Duration;
use url::Url;

/// One page of a prefix's search listing
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageRequest {
    /// Search prefix (`tName`)
    pub prefix: String,

    /// Number of results skipped (`rSkips`)
    pub offset: u32,
}

impl PageRequest {
    pub fn new(prefix: impl Into<String>, offset: u32) -> Self {
        Self {
            prefix: prefix.into(),
            offset,
        }
    }
}

/// A failed page fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    /// The registry answered with a status other than 200
    Status(u16),

    /// Connection, timeout, or body read error
    Network(String),
}

impl FetchFailure {
    /// HTTP status code, if the registry answered at all
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status(code) => Some(*code),
            Self::Network(_) => None,
        }
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(code) => write!(f, "Status code: {}", code),
            Self::Network(error) => write!(f, "Network error: {}", error),
        }
    }
}

impl From<reqwest::Error> for FetchFailure {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Network("Request timeout".to_string())
        } else if error.is_connect() {
            Self::Network(format!("Connection failed: {}", error))
        } else {
            Self::Network(error.to_string())
        }
    }
}

/// Source of search result pages
///
/// The production implementation is [`HttpPageSource`]; tests substitute
/// scripted sources.
#[async_trait]
pub trait PageSource: Send + Sync + 'static {
    /// Fetches one page, returning its HTML body on success
    async fn fetch_page(&self, request: &PageRequest) -> Result<String, FetchFailure>;
}

/// Builds an HTTP client with proper configuration
///
/// Redirects are followed: the registry answers a search that narrows down to
/// a single taxon with a redirect to that taxon's detail page.
///
/// # Example
///
/// ```no_run
/// use aphia_harvest::config::UserAgentConfig;
/// use aphia_harvest::crawler::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client(&UserAgentConfig::default(), Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    let user_agent = format!("{}/{}", config.crawler_name, config.crawler_version);

    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Page source backed by the registry's `aphia.php` search
#[derive(Debug, Clone)]
pub struct HttpPageSource {
    client: Client,
    base_url: Url,
    cluster_id: u64,
}

impl HttpPageSource {
    pub fn new(client: Client, base_url: &str, cluster_id: u64) -> Result<Self, url::ParseError> {
        Ok(Self {
            client,
            base_url: Url::parse(base_url)?,
            cluster_id,
        })
    }

    /// Search URL for one page of a prefix's listing
    ///
    /// Restricted to accepted (`vOnly`), marine, non-fossil taxa of species
    /// rank (`tRank=220`) below the configured cluster.
    pub fn page_url(&self, request: &PageRequest) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .clear()
            .append_pair("p", "taxlist")
            .append_pair("searchpar", "0")
            .append_pair("tComp", "begins")
            .append_pair("tName", &request.prefix)
            .append_pair("rSkips", &request.offset.to_string())
            .append_pair("vOnly", "1")
            .append_pair("marine", "1")
            .append_pair("fossil", "4")
            .append_pair("pid", &self.cluster_id.to_string())
            .append_pair("rComp", "=")
            .append_pair("tRank", "220");
        url
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch_page(&self, request: &PageRequest) -> Result<String, FetchFailure> {
        let url = self.page_url(request);
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchFailure::Status(status.as_u16()));
        }

        Ok(response.text().await?)
    }
}
