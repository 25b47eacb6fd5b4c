//! Collector configuration (config.yaml)
//!
//! The configuration is loaded once at startup and passed by reference into
//! each pipeline stage; no component reads ambient/global state.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use urgences_common::{CollectorError, Result};

/// Default event batch size for the ingestion endpoint
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Default request timeout in seconds (source fetch and sink POST)
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Top-level collector configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectorConfig {
    /// Source dataset settings
    pub data_source: DataSourceConfig,

    /// Ingestion endpoint (Splunk HEC) settings
    pub splunk: SplunkConfig,

    /// Request timeout in seconds, applied to both the source fetch and
    /// each sink POST
    #[serde(default = "default_timeout_secs")]
    pub timeout: u64,

    /// Diagnostic output options
    #[serde(default)]
    pub debug: DebugConfig,
}

/// Source dataset settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataSourceConfig {
    /// URL of the published CSV dataset
    pub url: String,
}

/// Ingestion endpoint settings
///
/// `hec_token` and `verify_ssl` are deliberately required with no serde
/// default: a missing credential or TLS policy is a startup-fatal condition,
/// never a silent fallback.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SplunkConfig {
    /// HEC endpoint URL
    pub hec_url: String,

    /// HEC bearer token
    pub hec_token: String,

    /// Whether to verify the sink's TLS certificate
    pub verify_ssl: bool,

    /// Destination index
    #[serde(default = "default_index")]
    pub index: String,

    /// Event source label
    #[serde(default = "default_source")]
    pub source: String,

    /// Event sourcetype label
    #[serde(default = "default_sourcetype")]
    pub sourcetype: String,

    /// Events per POST request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

/// Diagnostic output options
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DebugConfig {
    /// Render outgoing events as pretty JSON on the console before sending
    #[serde(default)]
    pub print_json_output: bool,

    /// Cap on the number of events rendered per run
    #[serde(default = "default_max_events_to_print")]
    pub max_events_to_print: usize,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            print_json_output: false,
            max_events_to_print: default_max_events_to_print(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_index() -> String {
    "main".to_string()
}

fn default_source() -> String {
    "urgences_quebec".to_string()
}

fn default_sourcetype() -> String {
    "msss:urgences:csv".to_string()
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_max_events_to_print() -> usize {
    3
}

impl CollectorConfig {
    /// Load and validate configuration from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CollectorError::config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)?;
        let config: CollectorConfig = serde_yaml::from_str(&content).map_err(|e| {
            CollectorError::config(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate invariants serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.data_source.url.trim().is_empty() {
            return Err(CollectorError::config("data_source.url must not be empty"));
        }
        if self.splunk.hec_url.trim().is_empty() {
            return Err(CollectorError::config("splunk.hec_url must not be empty"));
        }
        if self.splunk.hec_token.trim().is_empty() {
            return Err(CollectorError::config("splunk.hec_token must not be empty"));
        }
        if self.splunk.batch_size == 0 {
            return Err(CollectorError::config("splunk.batch_size must be > 0"));
        }
        if self.timeout == 0 {
            return Err(CollectorError::config("timeout must be > 0 seconds"));
        }
        Ok(())
    }

    /// Request timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    const MINIMAL: &str = r#"
data_source:
  url: "https://example.test/urgences.csv"
splunk:
  hec_url: "https://splunk.example.test:8088/services/collector"
  hec_token: "00000000-dead-beef-0000-000000000000"
  verify_ssl: true
"#;

    #[test]
    fn test_minimal_config_applies_defaults() {
        let file = write_config(MINIMAL);
        let config = CollectorConfig::load(file.path()).unwrap();

        assert_eq!(config.splunk.index, "main");
        assert_eq!(config.splunk.source, "urgences_quebec");
        assert_eq!(config.splunk.sourcetype, "msss:urgences:csv");
        assert_eq!(config.splunk.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT_SECS);
        assert!(!config.debug.print_json_output);
        assert_eq!(config.debug.max_events_to_print, 3);
    }

    #[test]
    fn test_missing_verify_ssl_is_fatal() {
        let file = write_config(
            r#"
data_source:
  url: "https://example.test/urgences.csv"
splunk:
  hec_url: "https://splunk.example.test:8088/services/collector"
  hec_token: "secret"
"#,
        );
        let err = CollectorConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, CollectorError::Config(_)));
    }

    #[test]
    fn test_empty_token_is_fatal() {
        let file = write_config(
            r#"
data_source:
  url: "https://example.test/urgences.csv"
splunk:
  hec_url: "https://splunk.example.test:8088/services/collector"
  hec_token: ""
  verify_ssl: true
"#,
        );
        let err = CollectorConfig::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("hec_token"));
    }

    #[test]
    fn test_zero_batch_size_is_fatal() {
        let file = write_config(
            r#"
data_source:
  url: "https://example.test/urgences.csv"
splunk:
  hec_url: "https://splunk.example.test:8088/services/collector"
  hec_token: "secret"
  verify_ssl: true
  batch_size: 0
"#,
        );
        let err = CollectorConfig::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("batch_size"));
    }

    #[test]
    fn test_missing_file() {
        let err = CollectorConfig::load("/nonexistent/config.yaml").unwrap_err();
        assert!(matches!(err, CollectorError::Config(_)));
    }
}
