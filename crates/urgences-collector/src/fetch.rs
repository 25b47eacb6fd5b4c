//! Source dataset fetching
//!
//! One HTTP GET per run, single attempt, bounded by the configured timeout.
//! Retry policy belongs to the external scheduler that invokes the collector.

use std::time::Duration;
use tracing::info;
use urgences_common::{CollectorError, Result};

/// Fetch the raw source payload
///
/// Returns the complete response body as bytes. Network failure, timeout
/// expiry, and non-success HTTP status all map to [`CollectorError::Fetch`].
pub async fn fetch_source(url: &str, timeout: Duration) -> Result<Vec<u8>> {
    info!(url = %url, "Fetching source dataset");

    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| CollectorError::fetch(url, e))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| CollectorError::fetch(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(CollectorError::fetch(url, format!("HTTP {}", status)));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| CollectorError::fetch(url, e))?;

    info!(bytes = body.len(), "Source payload received");
    Ok(body.to_vec())
}
