//! Configuration module for LocalCloud.

use serde::Deserialize;
use std::path::Path;

use crate::{LocalCloudError, Result};

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
    /// Maximum number of pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> String {
    "data/localcloud.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Storage accounting configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Process-wide per-user ceiling in megabytes (0 or less = unlimited).
    ///
    /// Applies to users without a positive account-specific ceiling.
    #[serde(default)]
    pub default_quota_mb: i64,
    /// Maximum size of a single upload in megabytes (0 = no cap).
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size_mb: u64,
}

fn default_max_upload_size() -> u64 {
    100
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            default_quota_mb: 0,
            max_upload_size_mb: default_max_upload_size(),
        }
    }
}

impl StorageConfig {
    /// Per-upload cap in bytes, or `None` when uploads are uncapped.
    pub fn max_upload_bytes(&self) -> Option<u64> {
        (self.max_upload_size_mb > 0).then(|| self.max_upload_size_mb * 1024 * 1024)
    }
}

/// External analysis service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    /// Whether enrichment calls are made at all.
    #[serde(default)]
    pub enabled: bool,
    /// Base URL of the analysis service.
    #[serde(default = "default_analysis_url")]
    pub base_url: String,
    /// Connect timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Timeout for metadata-sized calls (health check, index removal).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Timeout for payload analysis.
    #[serde(default = "default_process_timeout")]
    pub process_timeout_secs: u64,
}

fn default_analysis_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_connect_timeout() -> u64 {
    2
}

fn default_request_timeout() -> u64 {
    5
}

fn default_process_timeout() -> u64 {
    30
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_analysis_url(),
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
            process_timeout_secs: default_process_timeout(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional log file; console only when unset.
    #[serde(default)]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Storage accounting configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Analysis service configuration.
    #[serde(default)]
    pub analysis: AnalysisConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(LocalCloudError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| LocalCloudError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `LOCALCLOUD_DATABASE_PATH`: database file path
    /// - `LOCALCLOUD_DEFAULT_QUOTA_MB`: process-wide per-user ceiling
    /// - `LOCALCLOUD_ANALYSIS_URL`: analysis service URL (also enables it)
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("LOCALCLOUD_DATABASE_PATH") {
            if !path.is_empty() {
                self.database.path = path;
            }
        }

        if let Ok(quota) = std::env::var("LOCALCLOUD_DEFAULT_QUOTA_MB") {
            if let Ok(quota) = quota.trim().parse::<i64>() {
                self.storage.default_quota_mb = quota;
            }
        }

        if let Ok(url) = std::env::var("LOCALCLOUD_ANALYSIS_URL") {
            if !url.is_empty() {
                self.analysis.base_url = url;
                self.analysis.enabled = true;
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.database.max_connections == 0 {
            return Err(LocalCloudError::Config(
                "database.max_connections must be at least 1".to_string(),
            ));
        }

        if self.analysis.enabled {
            let parsed = url::Url::parse(&self.analysis.base_url).map_err(|e| {
                LocalCloudError::Config(format!("invalid analysis.base_url: {e}"))
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(LocalCloudError::Config(format!(
                    "unsupported analysis.base_url scheme: {}",
                    parsed.scheme()
                )));
            }
            if self.analysis.connect_timeout_secs == 0
                || self.analysis.request_timeout_secs == 0
                || self.analysis.process_timeout_secs == 0
            {
                return Err(LocalCloudError::Config(
                    "analysis timeouts must be greater than zero".to_string(),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.database.path, "data/localcloud.db");
        assert_eq!(config.database.max_connections, 5);

        assert_eq!(config.storage.default_quota_mb, 0);
        assert_eq!(config.storage.max_upload_size_mb, 100);

        assert!(!config.analysis.enabled);
        assert_eq!(config.analysis.base_url, "http://127.0.0.1:8000");
        assert_eq!(config.analysis.connect_timeout_secs, 2);
        assert_eq!(config.analysis.request_timeout_secs, 5);
        assert_eq!(config.analysis.process_timeout_secs, 30);

        assert_eq!(config.logging.level, "info");
        assert!(config.logging.file.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[database]
path = "custom/cloud.db"
max_connections = 2

[storage]
default_quota_mb = 512
max_upload_size_mb = 25

[analysis]
enabled = true
base_url = "http://analysis.local:9000"
connect_timeout_secs = 1
request_timeout_secs = 3
process_timeout_secs = 60

[logging]
level = "debug"
file = "logs/localcloud.log"
"#;

        let config = Config::parse(toml).unwrap();

        assert_eq!(config.database.path, "custom/cloud.db");
        assert_eq!(config.database.max_connections, 2);
        assert_eq!(config.storage.default_quota_mb, 512);
        assert_eq!(config.storage.max_upload_size_mb, 25);
        assert!(config.analysis.enabled);
        assert_eq!(config.analysis.base_url, "http://analysis.local:9000");
        assert_eq!(config.analysis.connect_timeout_secs, 1);
        assert_eq!(config.analysis.request_timeout_secs, 3);
        assert_eq!(config.analysis.process_timeout_secs, 60);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.file.as_deref(), Some("logs/localcloud.log"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_config() {
        let toml = r#"
[storage]
default_quota_mb = 10
"#;

        let config = Config::parse(toml).unwrap();

        assert_eq!(config.storage.default_quota_mb, 10);
        assert_eq!(config.storage.max_upload_size_mb, 100);
        assert_eq!(config.database.path, "data/localcloud.db");
        assert!(!config.analysis.enabled);
    }

    #[test]
    fn test_parse_empty_config() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.database.path, "data/localcloud.db");
        assert_eq!(config.storage.default_quota_mb, 0);
    }

    #[test]
    fn test_parse_invalid_config() {
        let result = Config::parse("this is not valid toml [[[");

        match result {
            Err(LocalCloudError::Config(msg)) => assert!(msg.contains("config parse error")),
            other => panic!("Expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = Config::load("nonexistent.toml");
        assert!(matches!(result, Err(LocalCloudError::Io(_))));
    }

    #[test]
    fn test_max_upload_bytes() {
        let mut storage = StorageConfig::default();
        assert_eq!(storage.max_upload_bytes(), Some(100 * 1024 * 1024));

        storage.max_upload_size_mb = 0;
        assert_eq!(storage.max_upload_bytes(), None);
    }

    #[test]
    fn test_apply_env_overrides() {
        let original_url = std::env::var("LOCALCLOUD_ANALYSIS_URL").ok();
        let original_quota = std::env::var("LOCALCLOUD_DEFAULT_QUOTA_MB").ok();

        std::env::set_var("LOCALCLOUD_ANALYSIS_URL", "http://10.0.0.5:8000");
        std::env::set_var("LOCALCLOUD_DEFAULT_QUOTA_MB", "2048");

        let mut config = Config::default();
        config.apply_env_overrides();

        assert!(config.analysis.enabled);
        assert_eq!(config.analysis.base_url, "http://10.0.0.5:8000");
        assert_eq!(config.storage.default_quota_mb, 2048);

        match original_url {
            Some(val) => std::env::set_var("LOCALCLOUD_ANALYSIS_URL", val),
            None => std::env::remove_var("LOCALCLOUD_ANALYSIS_URL"),
        }
        match original_quota {
            Some(val) => std::env::set_var("LOCALCLOUD_DEFAULT_QUOTA_MB", val),
            None => std::env::remove_var("LOCALCLOUD_DEFAULT_QUOTA_MB"),
        }
    }

    #[test]
    fn test_validate_rejects_bad_analysis_url() {
        let mut config = Config::default();
        config.analysis.enabled = true;
        config.analysis.base_url = "ftp://analysis.local".to_string();

        assert!(matches!(config.validate(), Err(LocalCloudError::Config(_))));

        config.analysis.base_url = "not a url".to_string();
        assert!(matches!(config.validate(), Err(LocalCloudError::Config(_))));
    }

    #[test]
    fn test_validate_ignores_url_when_disabled() {
        let mut config = Config::default();
        config.analysis.base_url = "not a url".to_string();

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_connections() {
        let mut config = Config::default();
        config.database.max_connections = 0;

        assert!(config.validate().is_err());
    }
}
