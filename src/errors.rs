//! Error types for OSM Fetcher
//!
//! Errors are grouped by the component that raises them. Only catalogue build
//! failures and unresolvable names are meant to reach the caller as hard
//! failures; per-item download problems are collected into batch outcomes.

use std::path::PathBuf;
use thiserror::Error;

/// Download and HTTP client errors
#[derive(Error, Debug)]
pub enum DownloadError {
    /// HTTP request error
    #[error("HTTP request failed")]
    Http(#[from] reqwest::Error),

    /// I/O error during file operations
    #[error("File I/O error")]
    Io(#[from] std::io::Error),

    /// Invalid URL provided
    #[error("Invalid URL: {url} - {error}")]
    InvalidUrl { url: String, error: String },

    /// Server returned error status
    #[error("Server error: HTTP {status}")]
    ServerError { status: u16 },

    /// Resource does not exist on the server
    #[error("Not found: {url}")]
    NotFound { url: String },

    /// Access to the resource was refused
    #[error("Access forbidden: {url}")]
    Forbidden { url: String },

    /// Rate limit exceeded
    #[error("Rate limit exceeded. Server responded with HTTP 429")]
    RateLimitExceeded,

    /// Server overloaded
    #[error("Server overloaded. Server responded with HTTP 503")]
    ServerOverloaded,

    /// Atomic file operation failed
    #[error("Atomic file operation failed: could not rename {temp_path} to {final_path}")]
    AtomicOperationFailed {
        temp_path: PathBuf,
        final_path: PathBuf,
    },

    /// Maximum retries exceeded
    #[error("Maximum retry attempts ({max_retries}) exceeded for download")]
    MaxRetriesExceeded { max_retries: u32 },

    /// Client configuration cannot be used
    #[error("Invalid client configuration: {reason}")]
    InvalidConfig { reason: String },

    /// A fetcher could not retrieve a file
    #[error("Fetch failed for {url}: {reason}")]
    FetchFailed { url: String, reason: String },
}

/// Directory page scraping errors
#[derive(Error, Debug)]
pub enum WebScrapingError {
    /// CSS selector error
    #[error("Invalid CSS selector: {selector}")]
    InvalidSelector { selector: String },

    /// A page could not be fetched or parsed
    #[error("Page unreadable: {url} ({reason})")]
    PageUnreadable { url: String, reason: String },
}

/// Catalogue build, lookup and snapshot errors
#[derive(Error, Debug)]
pub enum CatalogueError {
    /// The root listing page could not be fetched or parsed
    #[error("Catalogue build failed at {url}: {reason}")]
    BuildFailed { url: String, reason: String },

    /// A format string that is not offered by the data source
    #[error("Unknown file format '{input}'. Valid formats: {valid}")]
    UnknownFormat { input: String, valid: String },

    /// Snapshot file I/O failed
    #[error("Snapshot I/O error at {path}")]
    SnapshotIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Snapshot serialization failed
    #[error("Snapshot serialization error")]
    SnapshotFormat(#[from] serde_json::Error),
}

/// Name resolution errors
#[derive(Error, Debug)]
pub enum ResolveError {
    /// Input could not be matched to any region
    #[error("Cannot resolve region name '{input}': {reason}")]
    NameNotResolvable { input: String, reason: String },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Invalid configuration format
    #[error("Invalid configuration format")]
    InvalidFormat(#[from] toml::de::Error),

    /// Configuration could not be rendered as TOML
    #[error("Could not serialize configuration")]
    Serialize(#[from] toml::ser::Error),

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Catalogue error
    #[error(transparent)]
    Catalogue(#[from] CatalogueError),

    /// Resolution error
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Download error
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Web scraping error
    #[error(transparent)]
    WebScraping(#[from] WebScrapingError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Check if the error is recoverable (transient)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::Download(DownloadError::RateLimitExceeded)
                | AppError::Download(DownloadError::ServerOverloaded)
                | AppError::Download(DownloadError::Http(_))
                | AppError::Download(DownloadError::FetchFailed { .. })
                | AppError::WebScraping(WebScrapingError::PageUnreadable { .. })
                | AppError::Catalogue(CatalogueError::BuildFailed { .. })
        )
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Catalogue(_) => "catalogue",
            AppError::Resolve(_) => "resolve",
            AppError::Download(_) => "download",
            AppError::WebScraping(_) => "scraping",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Download result type alias
pub type DownloadResult<T> = std::result::Result<T, DownloadError>;

/// Scraping result type alias
pub type ScrapingResult<T> = std::result::Result<T, WebScrapingError>;

/// Catalogue result type alias
pub type CatalogueResult<T> = std::result::Result<T, CatalogueError>;

/// Resolution result type alias
pub type ResolveResult<T> = std::result::Result<T, ResolveError>;
