//! Urgences Collector Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared error handling and logging for the urgences collector workspace.
//!
//! # Overview
//!
//! - **Error Handling**: the [`CollectorError`] taxonomy and [`Result`] alias
//!   used by every pipeline stage
//! - **Logging**: tracing-based logging setup shared by the binary and tests
//!
//! # Example
//!
//! ```no_run
//! use urgences_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     init_logging(&LogConfig::default())?;
//!     tracing::info!("Collector started");
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{CollectorError, Result};
