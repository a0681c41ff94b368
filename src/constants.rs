//! Application constants for OSM Fetcher
//!
//! Centralizes constants used throughout the application, organized by
//! functional domain.

use std::time::Duration;

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str = concat!("OSM-Fetcher/", env!("CARGO_PKG_VERSION"));

    /// Default HTTP request timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection pool idle timeout
    pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

    /// Maximum idle connections per host in pool
    pub const POOL_MAX_PER_HOST: usize = 4;
}

/// Rate limiting and retry configuration
pub mod limits {
    /// Default rate limit toward extract servers (requests per second)
    pub const DEFAULT_RATE_LIMIT_RPS: u32 = 2;

    /// Maximum retry attempts for failed requests
    pub const MAX_RETRIES: u32 = 3;

    /// Base delay for exponential backoff (milliseconds)
    pub const RETRY_BASE_DELAY_MS: u64 = 1000;
}

/// Data source root URLs
pub mod sources {
    /// GeoFabrik download server root
    pub const GEOFABRIK_URL: &str = "https://download.geofabrik.de/";

    /// BBBike city extract index
    pub const BBBIKE_URL: &str = "https://download.bbbike.org/osm/bbbike/";

    /// Path prefix of GeoFabrik's US state pages and files
    pub const GEOFABRIK_US_PATH: &str = "/north-america/us/";

    /// US states published under the name of a country elsewhere
    pub const US_STATE_NAME_CLASHES: &[&str] = &["Georgia"];

    /// Suffix distinguishing such a state from the country
    pub const US_STATE_SUFFIX: &str = " (US)";
}

/// CSS selectors for directory pages
pub mod selectors {
    /// GeoFabrik subregion tables
    pub const SUBREGION_TABLES: &str = "table#subregions, table#specialsubregions";

    /// GeoFabrik rows that describe one region
    pub const SUBREGION_ROWS: &str = "tr[onmouseover]";

    /// Table cells of a row
    pub const CELLS: &str = "td";

    /// Anchors carrying a link
    pub const LINKS: &str = "a[href]";

    /// BBBike index rows
    pub const INDEX_ROWS: &str = "tbody tr";

    /// BBBike download anchors on a city page
    pub const DOWNLOAD_LINKS: &str = "a.download_link";

    /// Size annotation inside a BBBike download anchor
    pub const SIZE_SPAN: &str = "span.size";
}

/// File operation constants
pub mod files {
    /// Temporary file suffix for atomic operations
    pub const TEMP_FILE_SUFFIX: &str = ".tmp";

    /// Catalogue snapshot file name
    pub const CATALOGUE_FILE: &str = "catalogue.json";

    /// Name index snapshot file name
    pub const NAME_INDEX_FILE: &str = "name-index.json";

    /// Snapshot layout version; other versions are ignored and rebuilt
    pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

    /// Application directory name under the platform config and cache dirs
    pub const APP_DIR: &str = "osm-fetcher";

    /// Project-local configuration file name
    pub const LOCAL_CONFIG_FILE: &str = "osm-fetcher.toml";

    /// Default destination root for downloaded extracts
    pub const DEFAULT_DOWNLOAD_DIR: &str = "osm_data";
}

/// Resolver tuning
pub mod resolver {
    /// Minimum similarity accepted for a fuzzy match; zero accepts any best candidate
    pub const DEFAULT_MIN_SIMILARITY: f64 = 0.0;

    /// Suffixes stripped from file stems before matching
    pub const FILE_STEM_SUFFIXES: &[&str] = &["-latest", "-free"];
}

/// Download orchestration
pub mod download {
    use super::Duration;

    /// Pause between consecutive network fetches in a batch
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);

    /// Pause between catalogue page fetches
    pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(500);
}

// Re-export commonly used constants for convenience
pub use files::TEMP_FILE_SUFFIX;
pub use http::{DEFAULT_TIMEOUT as HTTP_TIMEOUT, USER_AGENT};
pub use limits::{DEFAULT_RATE_LIMIT_RPS, MAX_RETRIES, RETRY_BASE_DELAY_MS};
