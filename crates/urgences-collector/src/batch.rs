//! Event construction and batching
//!
//! Wraps normalized records as HEC event envelopes and partitions them into
//! bounded, ordered batches. The partition is lossless and deterministic:
//! same records and same batch size always yield the same boundaries.

use crate::normalize::FacilityRecord;
use serde::{Deserialize, Serialize};

/// Fixed routing metadata applied to every event in a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventMetadata {
    pub index: String,
    pub source: String,
    pub sourcetype: String,
}

/// One event envelope in the wire shape the ingestion endpoint expects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HecEvent {
    /// Event time as unix epoch seconds
    pub time: i64,
    pub index: String,
    pub source: String,
    pub sourcetype: String,
    pub event: FacilityRecord,
}

impl HecEvent {
    /// Wrap a record with the run's fixed metadata
    ///
    /// The event time is the record's observation timestamp, which the
    /// normalizer guarantees is present.
    pub fn from_record(record: FacilityRecord, metadata: &EventMetadata) -> Self {
        let time = record.extracted_at.timestamp();
        Self {
            time,
            index: metadata.index.clone(),
            source: metadata.source.clone(),
            sourcetype: metadata.sourcetype.clone(),
            event: record,
        }
    }
}

/// An ordered, bounded group of events with its 1-based sequence number
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub number: usize,
    pub events: Vec<HecEvent>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Partition records, in order, into batches of at most `batch_size`
///
/// The last batch may be shorter. `batch_size` is validated to be non-zero
/// at configuration load.
pub fn into_batches(
    records: Vec<FacilityRecord>,
    metadata: &EventMetadata,
    batch_size: usize,
) -> Vec<Batch> {
    debug_assert!(batch_size > 0);

    let mut batches = Vec::with_capacity(records.len().div_ceil(batch_size));
    let mut events = Vec::with_capacity(batch_size.min(records.len()));

    for record in records {
        events.push(HecEvent::from_record(record, metadata));
        if events.len() == batch_size {
            batches.push(Batch {
                number: batches.len() + 1,
                events: std::mem::take(&mut events),
            });
        }
    }
    if !events.is_empty() {
        batches.push(Batch {
            number: batches.len() + 1,
            events,
        });
    }
    batches
}
