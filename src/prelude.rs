//! Prelude module for OSM Fetcher Library
//!
//! Re-exports the items needed for typical usage with a single
//! `use osm_fetcher::prelude::*;` statement.
//!
//! # Usage
//!
//! ```rust,no_run
//! use osm_fetcher::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = Arc::new(OsmClient::new()?);
//!     let session = Session::with_client(
//!         SessionConfig::new(DataSource::Bbbike),
//!         client,
//!         Arc::new(AlwaysConfirm),
//!     );
//!
//!     let url = session.get_download_url("Berlin", "pbf").await?;
//!     println!("{:?}", url);
//!     Ok(())
//! }
//! ```

// Core result types
pub use crate::errors::{AppError, Result};

// Essential app components
pub use crate::app::{
    AlwaysConfirm,
    BatchReport,
    Catalogue,
    ClientConfig,
    Confirmation,
    DataSource,
    DownloadConfig,
    Fetcher,
    FormatTag,
    ItemOutcome,
    ItemStatus,
    OsmClient,
    Region,
    ResolverConfig,
    // Facade
    Session,
    SessionConfig,
};

// Commonly used constants
pub use crate::constants::{DEFAULT_RATE_LIMIT_RPS, USER_AGENT};

// Standard library re-exports that are commonly needed
pub use std::path::{Path, PathBuf};
pub use std::sync::Arc;

pub use tokio;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prelude_imports() {
        let _client_config = ClientConfig::default();
        let _download_config = DownloadConfig::default();
        let session_config = SessionConfig::new(DataSource::Geofabrik);
        assert!(session_config.allow_build);
        assert!(USER_AGENT.contains("OSM-Fetcher"));
    }

    #[test]
    fn test_std_reexports() {
        let _path = PathBuf::from("/tmp/test");
        let data = Arc::new(42);
        assert_eq!(*data, 42);
    }
}
