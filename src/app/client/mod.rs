//! HTTP client for extract server interaction
//!
//! The module is organized into specialized components:
//! - `config`: HTTP client configuration and building
//! - `http`: Core HTTP operations with rate limiting and retries
//! - `download`: File download operations with atomic writes

use std::path::Path;

use async_trait::async_trait;
use url::Url;

use crate::app::orchestrator::Fetcher;
use crate::errors::{DownloadError, DownloadResult};

pub mod config;
pub mod download;
pub mod http;

pub use config::ClientConfig;

use download::DownloadHandler;
use http::HttpHandler;

/// HTTP client shared by the catalogue crawler and the downloader
///
/// One instance holds one rate limiter, so page fetches and file downloads
/// made through it are throttled together.
#[derive(Debug)]
pub struct OsmClient {
    http_handler: HttpHandler,
}

impl OsmClient {
    /// Creates a client with default configuration
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if the HTTP client cannot be built
    pub fn new() -> DownloadResult<Self> {
        Self::with_config(&ClientConfig::default())
    }

    /// Creates a client with custom configuration
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if the HTTP client cannot be built or the
    /// rate limit is zero
    pub fn with_config(config: &ClientConfig) -> DownloadResult<Self> {
        let client = config.build_http_client()?;
        let http_handler = HttpHandler::new(client, config.rate_limit_rps)?;

        tracing::debug!(
            "Created HTTP client ({} requests/s)",
            config.rate_limit_rps
        );

        Ok(Self { http_handler })
    }

    /// Fetches the HTML content of a web page with rate limiting
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if the HTTP request fails after retries or
    /// the server answers with a non-success status
    pub async fn get_page(&self, url: &Url) -> DownloadResult<String> {
        self.http_handler.get_page(url).await
    }

    /// Downloads a file atomically, replacing any existing file
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if the download fails
    pub async fn download_file(&self, url: &Url, destination: &Path) -> DownloadResult<u64> {
        DownloadHandler::new(&self.http_handler)
            .download_file(url, destination)
            .await
    }
}

#[async_trait]
impl Fetcher for OsmClient {
    async fn download(&self, url: &Url, destination: &Path) -> DownloadResult<()> {
        self.download_file(url, destination)
            .await
            .map(|_| ())
            .map_err(|e| DownloadError::FetchFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        assert!(OsmClient::new().is_ok());
    }

    #[test]
    fn test_zero_rate_limit_rejected() {
        let config = ClientConfig {
            rate_limit_rps: 0,
            ..Default::default()
        };
        assert!(matches!(
            OsmClient::with_config(&config),
            Err(DownloadError::InvalidConfig { .. })
        ));
    }
}
