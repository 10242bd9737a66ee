//! Cluster name lookup
//!
//! Resolves the Aphia identifier of the organism cluster to the display name
//! shown on its taxon detail page. The name is used for the banner and for the
//! output file name. This is a single request without retries.

use crate::HarvestError;
use reqwest::{Client, StatusCode};
use scraper::{Html, Selector};
use url::Url;

/// Name used when the detail page carries no header
pub const MISSING_CLUSTER_NAME: &str = "Missing Cluster Name";

const HEADER_SELECTOR: &str = "h3.aphia_core_header-inline";

/// Detail page URL of a taxon
pub fn cluster_url(base_url: &str, cluster_id: u64) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(base_url)?;
    url.query_pairs_mut()
        .clear()
        .append_pair("p", "taxdetails")
        .append_pair("id", &cluster_id.to_string());
    Ok(url)
}

/// Fetches the display name of a cluster
///
/// # Errors
///
/// Returns [`HarvestError::ClusterLookup`] if the request fails or the
/// registry answers with anything but 200.
pub async fn resolve_cluster_name(
    client: &Client,
    base_url: &str,
    cluster_id: u64,
) -> Result<String, HarvestError> {
    let url = cluster_url(base_url, cluster_id)?;
    tracing::debug!("Resolving cluster name from {}", url);

    let lookup_error = |reason: String| HarvestError::ClusterLookup { cluster_id, reason };

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| lookup_error(e.to_string()))?;

    let status = response.status();
    if status != StatusCode::OK {
        return Err(lookup_error(format!("Status code: {}", status.as_u16())));
    }

    let body = response
        .text()
        .await
        .map_err(|e| lookup_error(e.to_string()))?;

    Ok(extract_cluster_name(&body).unwrap_or_else(|| MISSING_CLUSTER_NAME.to_string()))
}

/// Extracts the trimmed header text of a taxon detail page
pub fn extract_cluster_name(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(HEADER_SELECTOR).ok()?;

    document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
}
