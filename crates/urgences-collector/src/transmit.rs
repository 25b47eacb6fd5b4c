//! Batch transmission to the HEC ingestion endpoint
//!
//! One POST per batch, newline-delimited JSON body, bearer credential in
//! the Authorization header. A batch failure is reported to the caller and
//! never prevents later batches from being attempted.

use crate::batch::{Batch, HecEvent};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use std::time::Duration;
use tracing::{info, warn};
use urgences_common::{CollectorError, Result};

/// Client for the ingestion endpoint, built once per run
#[derive(Debug)]
pub struct HecClient {
    client: reqwest::Client,
    url: String,
}

impl HecClient {
    /// Build the client with the endpoint's connection parameters
    ///
    /// `verify_tls = false` disables certificate verification; this is an
    /// explicit configuration choice and is logged at warn level so it is
    /// auditable in the run output.
    pub fn new(url: &str, token: &str, verify_tls: bool, timeout: Duration) -> Result<Self> {
        if !verify_tls {
            warn!("TLS certificate verification is disabled by configuration (verify_ssl: false)");
        }

        let mut auth = HeaderValue::from_str(&format!("Splunk {token}")).map_err(|e| {
            CollectorError::config(format!("hec_token is not a valid header value: {e}"))
        })?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(!verify_tls)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    /// Transmit one batch
    ///
    /// Non-2xx status or connection failure maps to
    /// [`CollectorError::BatchTransmit`]; the response body is not consulted
    /// beyond the status code.
    pub async fn send_batch(&self, batch: &Batch, total_batches: usize) -> Result<()> {
        let payload = ndjson(&batch.events)?;

        let response = self
            .client
            .post(&self.url)
            .body(payload)
            .send()
            .await
            .map_err(|e| CollectorError::batch_transmit(batch.number, total_batches, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollectorError::batch_transmit(
                batch.number,
                total_batches,
                format!("HTTP {status}"),
            ));
        }

        info!(
            batch = batch.number,
            total = total_batches,
            events = batch.len(),
            "Batch transmitted"
        );
        Ok(())
    }
}

/// Serialize events as newline-delimited JSON, one object per line
fn ndjson(events: &[HecEvent]) -> Result<String> {
    let lines = events
        .iter()
        .map(serde_json::to_string)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(lines.join("\n"))
}

/// Render the first `cap` outgoing events as pretty JSON on the console
///
/// Diagnostic surface only; transmission behavior is unchanged. Batch order
/// is preserved in the output. This is intentionally `println!` rather than
/// tracing: the operator asked to see the exact wire payload.
pub fn render_events_preview(batches: &[Batch], cap: usize) {
    let total: usize = batches.iter().map(Batch::len).sum();
    let shown = cap.min(total);

    println!("Outgoing events ({shown} of {total} shown):");
    let events = batches.iter().flat_map(|b| b.events.iter()).take(cap);
    for (i, event) in events.enumerate() {
        match serde_json::to_string_pretty(event) {
            Ok(json) => println!("Event {}/{}:\n{}", i + 1, total, json),
            Err(e) => warn!(error = %e, "Failed to render event preview"),
        }
    }
    if total > shown {
        println!("... and {} more events", total - shown);
    }
}
