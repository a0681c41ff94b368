//! Core application logic for OSM Fetcher
//!
//! This module contains the catalogue of regions crawled from an extract
//! server, name resolution against it, the HTTP client, and the download
//! orchestration built on top.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use osm_fetcher::app::{AlwaysConfirm, DataSource, OsmClient, Session, SessionConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(OsmClient::new()?);
//! let session = Session::with_client(
//!     SessionConfig::new(DataSource::Geofabrik),
//!     client,
//!     Arc::new(AlwaysConfirm),
//! );
//!
//! let name = session.resolve_name("isle of man").await?;
//! let outcomes = session
//!     .ensure_local(&name, "pbf", Path::new("osm_data"), false)
//!     .await?;
//! for outcome in outcomes {
//!     println!("{}: {}", outcome.region, outcome.status);
//! }
//! # Ok(())
//! # }
//! ```

pub mod catalogue;
pub mod client;
pub mod listing;
pub mod models;
pub mod orchestrator;
pub mod resolver;
pub mod session;

// Re-export main public API
pub use catalogue::{Catalogue, CatalogueBuilder, Region, SnapshotStore};
pub use client::{ClientConfig, OsmClient};
pub use listing::{DirectoryPage, HtmlDirectoryPage, Listing, ListingRow};
pub use models::{parse_byte_size, ByteSize, DataSource, FormatTag};
pub use orchestrator::{
    AlwaysConfirm, BatchReport, Confirmation, DownloadConfig, DownloadOrchestrator, Fetcher,
    ItemOutcome, ItemStatus, ResolvedTarget, TerminalConfirmation,
};
pub use resolver::{MatchKind, NameIndex, Resolution, Resolver, ResolverConfig};
pub use session::{Session, SessionConfig};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_structure() {
        // Ensure public API is accessible
        let config = ClientConfig::default();
        assert!(config.tcp_nodelay);
        assert!(!DownloadConfig::default().deep_fallback);
        assert_eq!(SessionConfig::new(DataSource::Bbbike).source, DataSource::Bbbike);
    }
}
