//! Error types for the urgences collector

use thiserror::Error;

/// Result type alias for collector operations
pub type Result<T> = std::result::Result<T, CollectorError>;

/// Main error type for the collector
///
/// Fatal variants (`Fetch`, `Decode`, `Config`) abort the run; `BatchTransmit`
/// is recovered at the batch level and only degrades the final run status.
#[derive(Error, Debug)]
pub enum CollectorError {
    #[error("Fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("No viable text encoding for source payload: {0}")]
    Decode(String),

    #[error("Batch {batch}/{total} rejected by ingestion endpoint: {reason}")]
    BatchTransmit {
        batch: usize,
        total: usize,
        reason: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CollectorError {
    /// Create a fetch error for the given source URL
    pub fn fetch(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Fetch {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a batch transmission error
    pub fn batch_transmit(batch: usize, total: usize, reason: impl ToString) -> Self {
        Self::BatchTransmit {
            batch,
            total,
            reason: reason.to_string(),
        }
    }

    /// Whether this error aborts the whole run rather than a single batch
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::BatchTransmit { .. })
    }
}
