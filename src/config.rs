//! Configuration file management.
//!
//! The exporter reads its endpoint list from a JSON document at startup and
//! again at the top of every polling cycle, so operators can add or remove
//! endpoints without restarting the process. Entries for removed endpoints
//! are never purged from the metric store; they keep their last value.
//!
//! # Example Configuration File
//!
//! ```json
//! {
//!   "urls": [
//!     {
//!       "url": "https://license.example.com/api/v1/entitlement",
//!       "label": "example-prod",
//!       "origin_prometheus": "dc-east"
//!     }
//!   ]
//! }
//! ```

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::store::MetricKey;

/// Top-level configuration document.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Endpoints to poll, in no particular order.
    pub urls: Vec<UrlConfig>,
}

/// One monitored endpoint.
///
/// `url` and `origin_prometheus` together identify the metric series;
/// `label` is a human-readable name that only appears in logs.
#[derive(Debug, Deserialize, Clone)]
pub struct UrlConfig {
    pub url: String,
    pub label: String,
    pub origin_prometheus: String,
}

impl UrlConfig {
    /// Key under which this endpoint's gauge value is stored.
    pub fn metric_key(&self) -> MetricKey {
        MetricKey::new(&self.url, &self.origin_prometheus)
    }
}

impl Config {
    /// Loads configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// * `Err(ConfigError::Io)` - File could not be read
    /// * `Err(ConfigError::Parse)` - File contains invalid JSON or the wrong
    ///   document shape
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io(e.to_string()))?;

        let config: Config =
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        Ok(config)
    }
}

/// Errors that can occur during configuration loading and parsing.
///
/// Both variants are fatal wherever they surface: at startup and on a
/// later-cycle re-read alike, the process terminates with a non-zero exit.
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error (file not found, permission denied, etc.)
    Io(String),
    /// JSON parsing error (invalid syntax, type mismatch, etc.)
    Parse(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "IO Error: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Parse Error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_from_json() {
        let json_content = r#"
            {
                "urls": [
                    {
                        "url": "https://license.example.com/api/v1/entitlement",
                        "label": "example-prod",
                        "origin_prometheus": "dc-east"
                    },
                    {
                        "url": "https://license.example.org/check",
                        "label": "example-staging",
                        "origin_prometheus": "dc-west"
                    }
                ]
            }
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(json_content.as_bytes()).unwrap();

        let config = Config::from_file(temp_file.path()).unwrap();

        assert_eq!(config.urls.len(), 2);
        assert_eq!(
            config.urls[0].url,
            "https://license.example.com/api/v1/entitlement"
        );
        assert_eq!(config.urls[0].label, "example-prod");
        assert_eq!(config.urls[0].origin_prometheus, "dc-east");
        assert_eq!(config.urls[1].origin_prometheus, "dc-west");
    }

    #[test]
    fn test_metric_key_combines_url_and_origin() {
        let endpoint = UrlConfig {
            url: "https://host.test/api".to_string(),
            label: "host".to_string(),
            origin_prometheus: "dc-east".to_string(),
        };

        let key = endpoint.metric_key();
        assert_eq!(key.url, "https://host.test/api");
        assert_eq!(key.origin, "dc-east");
    }

    #[test]
    fn test_invalid_json() {
        let invalid_json = r#"{"urls": [invalid"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(invalid_json.as_bytes()).unwrap();

        let result = Config::from_file(temp_file.path());

        match result.unwrap_err() {
            ConfigError::Parse(_) => {} // Expected
            other => panic!("Expected ParseError, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_document_shape() {
        let wrong_shape = r#"{"urls": "not-a-list"}"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(wrong_shape.as_bytes()).unwrap();

        assert!(matches!(
            Config::from_file(temp_file.path()),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = Config::from_file("/nonexistent/config.json");

        match result.unwrap_err() {
            ConfigError::Io(_) => {} // Expected
            other => panic!("Expected IoError, got {:?}", other),
        }
    }
}
