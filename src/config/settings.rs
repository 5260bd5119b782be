//! Configuration settings for shopsync.
//!
//! Settings are loaded from `~/.shopsync/config.yaml`. The API access token
//! is deliberately absent: it is read from `--token` or the environment.

use serde::{Deserialize, Serialize};

use crate::error::ShopSyncError;

/// Largest page the platform accepts for connection queries.
const MAX_PAGE_SIZE: u32 = 250;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Remote API settings.
    pub api: ApiConfig,
    /// Push/pull engine settings.
    pub sync: SyncConfig,
    /// Log output settings.
    pub logging: LoggingConfig,
}

/// Remote API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Shop domain, e.g. `example.myshopify.com`.
    #[serde(default)]
    pub shop_domain: Option<String>,
    /// Admin API version segment of the endpoint URL.
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Read timeout for one request, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Minimum spacing between requests, in milliseconds.
    #[serde(default = "default_min_request_interval_ms")]
    pub min_request_interval_ms: u64,
}

/// Push/pull engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Records requested per page when pulling.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// How long a push claim on a record stays valid, in seconds.
    #[serde(default = "default_claim_lease_secs")]
    pub claim_lease_secs: i64,
}

/// Log line format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Line format.
    #[serde(default)]
    pub format: LogFormat,
}

// Default value functions for serde
fn default_api_version() -> String {
    "2024-10".to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_min_request_interval_ms() -> u64 {
    500
}

const fn default_page_size() -> u32 {
    50
}

const fn default_claim_lease_secs() -> i64 {
    300
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            shop_domain: None,
            api_version: default_api_version(),
            timeout_secs: default_timeout_secs(),
            min_request_interval_ms: default_min_request_interval_ms(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            claim_lease_secs: default_claim_lease_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl SyncConfig {
    /// Page size clamped to what the platform accepts.
    #[must_use]
    pub fn effective_page_size(&self) -> u32 {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }
}

impl Config {
    /// Load configuration from a specific path.
    ///
    /// If the config file doesn't exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load_from_path(path: &std::path::Path) -> Result<Self, ShopSyncError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| {
            ShopSyncError::Config(format!(
                "Failed to read config file {}: {e}",
                path.display()
            ))
        })?;

        serde_yaml::from_str(&contents).map_err(|e| {
            ShopSyncError::Config(format!(
                "Failed to parse config file {}: {e}",
                path.display()
            ))
        })
    }

    /// Save configuration to a specific path.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be written.
    pub fn save_to_path(&self, path: &std::path::Path) -> Result<(), ShopSyncError> {
        let contents = serde_yaml::to_string(self)
            .map_err(|e| ShopSyncError::Config(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, contents).map_err(|e| {
            ShopSyncError::Config(format!(
                "Failed to write config file {}: {e}",
                path.display()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(config.api.shop_domain.is_none());
        assert_eq!(config.api.api_version, "2024-10");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.sync.page_size, 50);
        assert_eq!(config.sync.claim_lease_secs, 300);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_load_missing_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let config = Config::load_from_path(&config_path).unwrap();

        assert_eq!(config.sync.page_size, 50);
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut config = Config::default();
        config.api.shop_domain = Some("example.myshopify.com".to_string());
        config.sync.page_size = 100;

        config.save_to_path(&config_path).unwrap();

        let loaded = Config::load_from_path(&config_path).unwrap();

        assert_eq!(
            loaded.api.shop_domain.as_deref(),
            Some("example.myshopify.com")
        );
        assert_eq!(loaded.sync.page_size, 100);
    }

    #[test]
    fn test_partial_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let partial_yaml = r#"
api:
  shop_domain: example.myshopify.com
logging:
  format: json
"#;
        std::fs::write(&config_path, partial_yaml).unwrap();

        let config = Config::load_from_path(&config_path).unwrap();

        assert_eq!(
            config.api.shop_domain.as_deref(),
            Some("example.myshopify.com")
        );
        assert_eq!(config.logging.format, LogFormat::Json);
        // Defaults should be used for missing fields
        assert_eq!(config.api.min_request_interval_ms, 500);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_invalid_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        std::fs::write(&config_path, "api: [not, a, map]").unwrap();

        assert!(matches!(
            Config::load_from_path(&config_path),
            Err(ShopSyncError::Config(_))
        ));
    }

    #[test]
    fn test_page_size_clamped() {
        let mut sync = SyncConfig::default();
        sync.page_size = 1000;
        assert_eq!(sync.effective_page_size(), 250);
        sync.page_size = 0;
        assert_eq!(sync.effective_page_size(), 1);
    }
}
