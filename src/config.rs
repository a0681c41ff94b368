//! Configuration management for OSM Fetcher
//!
//! This module provides TOML configuration with zero-config defaults,
//! standard search locations, and conversion into the runtime configuration
//! of the client, session and downloader.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::catalogue::SnapshotStore;
use crate::app::{ClientConfig, DataSource, DownloadConfig, ResolverConfig, SessionConfig};
use crate::constants::{download, files, http, limits, resolver};
use crate::errors::{AppError, ConfigError, Result};

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP client settings
    pub client: ClientConfigToml,
    /// Catalogue source and snapshot settings
    pub catalogue: CatalogueConfigToml,
    /// Name resolution settings
    pub resolver: ResolverConfigToml,
    /// Download settings
    pub download: DownloadConfigToml,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// TOML-friendly client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfigToml {
    /// TCP keep-alive timeout in seconds (None = disabled)
    pub tcp_keepalive_secs: Option<u64>,
    /// TCP nodelay setting
    pub tcp_nodelay: bool,
    /// Connection pool idle timeout in seconds (None = no timeout)
    pub pool_idle_timeout_secs: Option<u64>,
    /// Maximum idle connections per host
    pub pool_max_per_host: usize,
    /// Request timeout in seconds, covering a whole download
    pub request_timeout_secs: u64,
    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// Rate limit (requests per second)
    pub rate_limit_rps: u32,
}

impl Default for ClientConfigToml {
    fn default() -> Self {
        Self {
            tcp_keepalive_secs: Some(30),
            tcp_nodelay: true,
            pool_idle_timeout_secs: Some(http::POOL_IDLE_TIMEOUT.as_secs()),
            pool_max_per_host: http::POOL_MAX_PER_HOST,
            request_timeout_secs: http::DEFAULT_TIMEOUT.as_secs(),
            connect_timeout_secs: http::CONNECT_TIMEOUT.as_secs(),
            rate_limit_rps: limits::DEFAULT_RATE_LIMIT_RPS,
        }
    }
}

/// TOML-friendly catalogue configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogueConfigToml {
    /// Data source used when `--source` is not given
    pub source: DataSource,
    /// Snapshot directory (None = platform cache directory)
    pub cache_dir: Option<PathBuf>,
    /// Pause between catalogue page fetches
    #[serde(with = "humantime_serde")]
    pub page_delay: Duration,
    /// Crawl the source when no snapshot exists
    pub allow_build: bool,
}

impl Default for CatalogueConfigToml {
    fn default() -> Self {
        Self {
            source: DataSource::Geofabrik,
            cache_dir: None,
            page_delay: download::DEFAULT_PAGE_DELAY,
            allow_build: true,
        }
    }
}

/// TOML-friendly resolver configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfigToml {
    /// Fuzzy matches scoring below this (0.0 - 1.0) are rejected
    pub min_similarity: f64,
}

impl Default for ResolverConfigToml {
    fn default() -> Self {
        Self {
            min_similarity: resolver::DEFAULT_MIN_SIMILARITY,
        }
    }
}

/// TOML-friendly download configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfigToml {
    /// Root directory for extracts (None = `osm_data/<source>`)
    pub destination_root: Option<PathBuf>,
    /// Pause between consecutive file fetches
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    /// Fall back straight to leaf regions instead of direct subregions
    pub deep_fallback: bool,
    /// Ask before every file fetch
    pub confirm_each: bool,
}

impl Default for DownloadConfigToml {
    fn default() -> Self {
        Self {
            destination_root: None,
            interval: download::DEFAULT_INTERVAL,
            deep_fallback: false,
            confirm_each: false,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level for the application
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the first file found, or defaults
    ///
    /// An explicitly given file must exist.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is missing, unreadable as TOML, or
    /// holds invalid values.
    pub async fn load(config_file_override: Option<&Path>) -> Result<Self> {
        let Some(path) = Self::locate(config_file_override)? else {
            debug!("No config file found, using defaults");
            return Ok(Self::default());
        };

        let config = Self::load_from_file(&path).await?;
        config.validate()?;
        Ok(config)
    }

    /// Config file in effect: the override, else the first existing standard location
    pub fn locate(config_file_override: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = config_file_override {
            if !path.exists() {
                return Err(ConfigError::NotFound {
                    path: path.to_path_buf(),
                }
                .into());
            }
            return Ok(Some(path.to_path_buf()));
        }

        let mut search_paths = vec![PathBuf::from(".").join(files::LOCAL_CONFIG_FILE)];
        if let Some(user_config) = Self::default_config_path() {
            search_paths.push(user_config);
        }

        for path in search_paths {
            if path.exists() {
                debug!("Found config file: {}", path.display());
                return Ok(Some(path));
            }
        }

        Ok(None)
    }

    /// Per-user config file location
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(files::APP_DIR).join("config.toml"))
    }

    async fn load_from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: AppConfig = toml::from_str(&content).map_err(ConfigError::from)?;
        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Reject values the runtime cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.client.rate_limit_rps == 0 {
            return Err(invalid("client.rate_limit_rps", "0", "must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.resolver.min_similarity) {
            return Err(invalid(
                "resolver.min_similarity",
                &self.resolver.min_similarity.to_string(),
                "must be between 0.0 and 1.0",
            ));
        }
        Ok(())
    }

    /// Write the commented default configuration
    ///
    /// Refuses to overwrite an existing file unless `force` is set.
    pub async fn write_default(path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            return Err(AppError::generic(format!(
                "Config file already exists: {} (use --force to overwrite)",
                path.display()
            )));
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, Self::generate_default_config_content()).await?;

        info!("Wrote default configuration to {}", path.display());
        Ok(())
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self).map_err(ConfigError::from)?)
    }

    /// Runtime HTTP client configuration
    pub fn client_config(&self) -> ClientConfig {
        self.client.to_runtime_config()
    }

    /// Runtime session configuration, with command line overrides applied
    pub fn session_config(
        &self,
        source_override: Option<DataSource>,
        cache_dir_override: Option<PathBuf>,
    ) -> SessionConfig {
        let source = source_override.unwrap_or(self.catalogue.source);
        let cache_dir = cache_dir_override
            .or_else(|| self.catalogue.cache_dir.clone())
            .unwrap_or_else(SnapshotStore::default_cache_root);

        SessionConfig {
            source,
            root_url: None,
            cache_dir,
            page_delay: self.catalogue.page_delay,
            allow_build: self.catalogue.allow_build,
            resolver: self.resolver.to_runtime_config(),
            download: self.download.to_runtime_config(),
        }
    }

    /// Destination root for a source's extracts
    pub fn destination_root(&self, source: DataSource) -> PathBuf {
        self.download
            .destination_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(files::DEFAULT_DOWNLOAD_DIR).join(source.slug()))
    }

    /// Generate default configuration content with helpful comments
    pub fn generate_default_config_content() -> String {
        format!(
            r#"# OSM Fetcher Configuration
# Every setting is optional; missing values fall back to these defaults.

[client]
# HTTP client settings
tcp_keepalive_secs = 30
tcp_nodelay = true
pool_idle_timeout_secs = {}
pool_max_per_host = {}
request_timeout_secs = {}
connect_timeout_secs = {}
rate_limit_rps = {}

[catalogue]
# Data source: "geofabrik" or "bbbike"
source = "geofabrik"
# Snapshot directory (leave unset to use the platform cache directory)
# cache_dir = "/path/to/cache"
# Pause between catalogue page fetches
page_delay = "500ms"
# Crawl the source when no snapshot exists
allow_build = true

[resolver]
# Minimum similarity (0.0 - 1.0) for fuzzy name matches; 0.0 always picks the best candidate
min_similarity = {:.1}

[download]
# Destination root (leave unset to use ./{}/<source>)
# destination_root = "/path/to/extracts"
# Pause between file fetches
interval = "2s"
# Fall back straight to leaf regions when a region lacks the format
deep_fallback = false
# Ask before every file fetch
confirm_each = false

[logging]
level = "info"  # error, warn, info, debug, trace
"#,
            http::POOL_IDLE_TIMEOUT.as_secs(),
            http::POOL_MAX_PER_HOST,
            http::DEFAULT_TIMEOUT.as_secs(),
            http::CONNECT_TIMEOUT.as_secs(),
            limits::DEFAULT_RATE_LIMIT_RPS,
            resolver::DEFAULT_MIN_SIMILARITY,
            files::DEFAULT_DOWNLOAD_DIR,
        )
    }
}

fn invalid(field: &str, value: &str, reason: &str) -> AppError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

impl ClientConfigToml {
    /// Convert to runtime ClientConfig
    pub fn to_runtime_config(&self) -> ClientConfig {
        ClientConfig {
            tcp_keepalive: self.tcp_keepalive_secs.map(Duration::from_secs),
            tcp_nodelay: self.tcp_nodelay,
            pool_idle_timeout: self.pool_idle_timeout_secs.map(Duration::from_secs),
            pool_max_per_host: self.pool_max_per_host,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            rate_limit_rps: self.rate_limit_rps,
        }
    }
}

impl ResolverConfigToml {
    /// Convert to runtime ResolverConfig
    pub fn to_runtime_config(&self) -> ResolverConfig {
        ResolverConfig {
            min_similarity: self.min_similarity,
        }
    }
}

impl DownloadConfigToml {
    /// Convert to runtime DownloadConfig
    pub fn to_runtime_config(&self) -> DownloadConfig {
        DownloadConfig {
            interval: self.interval,
            deep_fallback: self.deep_fallback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.client.rate_limit_rps, limits::DEFAULT_RATE_LIMIT_RPS);
        assert_eq!(config.catalogue.source, DataSource::Geofabrik);
        assert_eq!(config.download.interval, download::DEFAULT_INTERVAL);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_generated_content_matches_defaults() {
        let content = AppConfig::generate_default_config_content();
        let parsed: AppConfig = toml::from_str(&content).unwrap();

        assert_eq!(parsed, AppConfig::default());
        assert!(content.contains("# OSM Fetcher Configuration"));
        assert!(content.contains("[download]"));
    }

    #[tokio::test]
    async fn test_missing_explicit_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.toml");

        let result = AppConfig::load(Some(&config_path)).await;
        assert!(matches!(
            result,
            Err(AppError::Config(ConfigError::NotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("osm-fetcher.toml");
        tokio::fs::write(
            &config_path,
            r#"
[catalogue]
source = "bbbike"
page_delay = "1s"

[download]
interval = "250ms"
deep_fallback = true
"#,
        )
        .await
        .unwrap();

        let config = AppConfig::load(Some(&config_path)).await.unwrap();
        assert_eq!(config.catalogue.source, DataSource::Bbbike);
        assert_eq!(config.catalogue.page_delay, Duration::from_secs(1));
        assert_eq!(config.download.interval, Duration::from_millis(250));
        assert!(config.download.deep_fallback);
        assert_eq!(config.client.rate_limit_rps, limits::DEFAULT_RATE_LIMIT_RPS);
    }

    #[tokio::test]
    async fn test_invalid_values_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("bad.toml");
        tokio::fs::write(&config_path, "[resolver]\nmin_similarity = 1.5\n")
            .await
            .unwrap();

        let result = AppConfig::load(Some(&config_path)).await;
        assert!(matches!(
            result,
            Err(AppError::Config(ConfigError::InvalidValue { .. }))
        ));
    }

    #[tokio::test]
    async fn test_write_default_refuses_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        AppConfig::write_default(&path, false).await.unwrap();
        assert!(path.exists());
        assert!(AppConfig::write_default(&path, false).await.is_err());
        assert!(AppConfig::write_default(&path, true).await.is_ok());
    }

    #[test]
    fn test_session_config_overrides() {
        let config = AppConfig::default();
        let session = config.session_config(Some(DataSource::Bbbike), Some(PathBuf::from("/tmp/c")));
        assert_eq!(session.source, DataSource::Bbbike);
        assert_eq!(session.cache_dir, PathBuf::from("/tmp/c"));
        assert_eq!(
            config.destination_root(DataSource::Bbbike),
            PathBuf::from("osm_data").join("bbbike")
        );
    }

    #[test]
    fn test_round_trips_through_toml() {
        let config = AppConfig::default();
        let rendered = config.to_toml().unwrap();
        let parsed: AppConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, config);
    }
}
