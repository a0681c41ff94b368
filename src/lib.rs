//! OSM Fetcher Library
//!
//! Resolves region names to OpenStreetMap extracts published by GeoFabrik and
//! BBBike and downloads them idempotently, falling back to subregion files
//! when a region has no file of the requested format.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod prelude;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};

#[cfg(test)]
mod tests {
    use super::*;
    use constants::*;

    #[test]
    fn test_constants_accessible() {
        assert_eq!(DEFAULT_RATE_LIMIT_RPS, 2);
        assert!(USER_AGENT.contains("OSM-Fetcher"));
        assert_eq!(TEMP_FILE_SUFFIX, ".tmp");
    }

    #[test]
    fn test_error_types() {
        let error = AppError::from(errors::ResolveError::NameNotResolvable {
            input: "".to_string(),
            reason: "input is blank".to_string(),
        });

        assert_eq!(error.category(), "resolve");
        assert!(!error.is_recoverable());
    }
}
