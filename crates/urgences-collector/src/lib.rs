//! Urgences Collector Library
//!
//! Collects the periodically-published Quebec emergency-room occupancy CSV
//! and forwards it to a Splunk HEC-style ingestion endpoint as batched JSON
//! events.
//!
//! # Pipeline
//!
//! Four stages form a strict linear pipeline:
//!
//! 1. [`fetch`]: one HTTP GET for the raw CSV bytes
//! 2. [`normalize`]: decode (UTF-8, windows-1252 fallback), parse rows by
//!    header name, strip diacritics, skip malformed rows
//! 3. [`batch`]: wrap records as HEC event envelopes in bounded batches
//! 4. [`transmit`]: one HTTP POST per batch, partial-failure semantics
//!
//! [`pipeline::run`] drives a complete stateless cycle and returns a
//! [`pipeline::RunSummary`] accounting for every skipped row and failed
//! batch.
//!
//! # Example
//!
//! ```no_run
//! use urgences_collector::{config::CollectorConfig, pipeline};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = CollectorConfig::load("config.yaml")?;
//!     let summary = pipeline::run(&config).await?;
//!     assert!(summary.succeeded());
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod config;
pub mod fetch;
pub mod normalize;
pub mod pipeline;
pub mod transmit;

// Re-export commonly used types
pub use config::CollectorConfig;
pub use normalize::FacilityRecord;
pub use pipeline::{run, RunSummary};
pub use urgences_common::{CollectorError, Result};
