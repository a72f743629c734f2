//! Configuration for formulary
//!
//! Settings are grouped per concern. Every section has sensible defaults, so an
//! empty JSON object (or no file at all) yields a working configuration
//! pointing at a local backend.

use crate::error::{FormularyError, Result};
use crate::search::{Normalization, SearchMode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable overriding [`ApiConfig::base_url`]
pub const ENV_API_URL: &str = "FORMULARY_API_URL";
/// Environment variable overriding [`ApiConfig::timeout_secs`]
pub const ENV_TIMEOUT_SECS: &str = "FORMULARY_TIMEOUT_SECS";
/// Environment variable overriding [`SearchConfig::normalization`]
pub const ENV_NORMALIZATION: &str = "FORMULARY_NORMALIZATION";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Backend connection settings
    pub api: ApiConfig,

    /// Search coordinator settings
    pub search: SearchConfig,

    /// Job polling settings
    pub jobs: JobsConfig,

    /// Export settings
    pub export: ExportConfig,
}

/// Backend connection settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL every endpoint path is joined onto (the reverse-proxy prefix)
    pub base_url: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// User-Agent header sent with every request
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 30,
            user_agent: format!("formulary/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Search coordinator settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    /// Quiet period after the last edit before a deep query is sent
    pub debounce_ms: u64,

    /// How search keys are normalized before substring comparison
    pub normalization: Normalization,

    /// Number of distinct deep-search terms whose results are kept
    pub deep_cache_capacity: usize,

    /// Mode a fresh coordinator starts in
    pub default_mode: SearchMode,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 250,
            normalization: Normalization::AllWhitespace,
            deep_cache_capacity: 32,
            default_mode: SearchMode::Shallow,
        }
    }
}

impl SearchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Job polling settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct JobsConfig {
    /// Delay between two status requests
    pub poll_interval_ms: u64,

    /// Give up waiting for a job after this many seconds
    pub poll_timeout_secs: u64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2000,
            poll_timeout_secs: 600,
        }
    }
}

impl JobsConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }
}

/// Export settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExportConfig {
    /// File name used when no output path is given
    pub default_png_name: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            default_png_name: "math-expression.png".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            FormularyError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: Config = serde_json::from_str(&content)?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn apply_env(self) -> Result<Self> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn apply_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL) {
            self.api.base_url = url;
        }

        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            self.api.timeout_secs = raw.trim().parse().map_err(|_| {
                FormularyError::Config(format!("{} must be an integer, got '{}'", ENV_TIMEOUT_SECS, raw))
            })?;
        }

        if let Some(raw) = lookup(ENV_NORMALIZATION) {
            self.search.normalization = raw.parse()?;
        }

        Ok(self)
    }

    /// Check that the configuration is usable
    pub fn validate(&self) -> Result<()> {
        let base = url::Url::parse(&self.api.base_url).map_err(|e| {
            FormularyError::Config(format!("Invalid base URL '{}': {}", self.api.base_url, e))
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(FormularyError::Config(format!(
                "Base URL must be http or https, got '{}'",
                base.scheme()
            )));
        }
        if self.api.timeout_secs == 0 {
            return Err(FormularyError::Config("Timeout must be positive".to_string()));
        }
        if self.search.deep_cache_capacity == 0 {
            return Err(FormularyError::Config(
                "Deep cache capacity must be positive".to_string(),
            ));
        }
        if self.jobs.poll_interval_ms == 0 {
            return Err(FormularyError::Config(
                "Poll interval must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.search.debounce_ms, 250);
        assert_eq!(config.search.normalization, Normalization::AllWhitespace);
        assert_eq!(config.search.default_mode, SearchMode::Shallow);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"api": {{"base_url": "http://proxy:3000/api"}}, "search": {{"normalization": "first_space"}}}}"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.api.base_url, "http://proxy:3000/api");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.search.normalization, Normalization::FirstSpace);
        assert_eq!(config.jobs, JobsConfig::default());
    }

    #[test]
    fn test_missing_file() {
        let result = Config::from_file("/definitely/not/here.json");
        assert!(matches!(result, Err(FormularyError::Config(_))));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_API_URL, "https://formulas.example.org"),
            (ENV_TIMEOUT_SECS, "5"),
            (ENV_NORMALIZATION, "first-space"),
        ]
        .into_iter()
        .collect();

        let config = Config::default()
            .apply_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.api.base_url, "https://formulas.example.org");
        assert_eq!(config.api.timeout_secs, 5);
        assert_eq!(config.search.normalization, Normalization::FirstSpace);
    }

    #[test]
    fn test_bad_timeout_override() {
        let result = Config::default().apply_overrides(|k| {
            (k == ENV_TIMEOUT_SECS).then(|| "soon".to_string())
        });
        assert!(matches!(result, Err(FormularyError::Config(_))));
    }

    #[test]
    fn test_validation_failures() {
        let mut config = Config::default();
        config.api.base_url = "ftp://example.org".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.api.base_url = "not a url".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.search.deep_cache_capacity = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.api.timeout_secs = 0;
        assert!(config.validate().is_err());
    }
}
