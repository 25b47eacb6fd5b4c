//! Pipeline driver
//!
//! Drives one complete run: fetch, decode, normalize, batch, transmit.
//! Control flows strictly forward. Fetch and decode failures are fatal and
//! surface as `Err`; per-batch transmission failures are counted in the
//! [`RunSummary`] and degrade the run to "done with errors" without
//! stopping the remaining batches.

use crate::batch::{into_batches, EventMetadata};
use crate::config::CollectorConfig;
use crate::fetch::fetch_source;
use crate::normalize::{decode_payload, FacilityRecord, RecordReader};
use crate::transmit::{render_events_preview, HecClient};
use tracing::{error, info};
use urgences_common::Result;

/// Outcome counters for one run
///
/// No error is silently discarded: every skipped row and failed batch is
/// accounted for here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Records normalized from the source
    pub records: usize,
    /// Rows dropped during normalization
    pub rows_skipped: usize,
    /// Batches accepted by the ingestion endpoint
    pub batches_sent: usize,
    /// Batches rejected or unreachable
    pub batches_failed: usize,
    /// Text encoding that decoded the payload
    pub encoding: &'static str,
}

impl RunSummary {
    /// Whether the run produced data and every batch was transmitted
    ///
    /// A source that yields zero usable records fails the run: a dead or
    /// empty feed must be visible in the exit code, not just the logs.
    pub fn succeeded(&self) -> bool {
        self.records > 0 && self.batches_failed == 0
    }
}

/// Execute one fetch-clean-send cycle
pub async fn run(config: &CollectorConfig) -> Result<RunSummary> {
    let timeout = config.timeout();

    let payload = fetch_source(&config.data_source.url, timeout).await?;

    let decoded = decode_payload(&payload)?;
    let mut reader = RecordReader::new(&decoded.text)?;
    let records: Vec<FacilityRecord> = reader.by_ref().collect();
    let rows_skipped = reader.skipped();
    info!(
        records = records.len(),
        skipped = rows_skipped,
        encoding = decoded.encoding,
        "Source normalized"
    );
    if records.is_empty() {
        error!("Source produced no usable records");
    }

    let record_count = records.len();
    let metadata = EventMetadata {
        index: config.splunk.index.clone(),
        source: config.splunk.source.clone(),
        sourcetype: config.splunk.sourcetype.clone(),
    };
    let batches = into_batches(records, &metadata, config.splunk.batch_size);
    info!(
        batches = batches.len(),
        batch_size = config.splunk.batch_size,
        "Events batched"
    );

    if config.debug.print_json_output {
        render_events_preview(&batches, config.debug.max_events_to_print);
    }

    let client = HecClient::new(
        &config.splunk.hec_url,
        &config.splunk.hec_token,
        config.splunk.verify_ssl,
        timeout,
    )?;

    let total_batches = batches.len();
    let mut batches_failed = 0;
    for batch in &batches {
        if let Err(e) = client.send_batch(batch, total_batches).await {
            error!(error = %e, "Batch transmission failed, continuing with remaining batches");
            batches_failed += 1;
        }
    }

    let summary = RunSummary {
        records: record_count,
        rows_skipped,
        batches_sent: total_batches - batches_failed,
        batches_failed,
        encoding: decoded.encoding,
    };

    if summary.succeeded() {
        info!(
            records = summary.records,
            skipped = summary.rows_skipped,
            batches = summary.batches_sent,
            "Run complete"
        );
    } else {
        error!(
            records = summary.records,
            batches_sent = summary.batches_sent,
            batches_failed = summary.batches_failed,
            "Run failed"
        );
    }

    Ok(summary)
}
