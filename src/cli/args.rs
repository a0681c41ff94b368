//! Command-line argument parsing for OSM Fetcher
//!
//! This module defines the CLI structure using clap derive macros: name
//! resolution, subregion listing, URL lookup, downloading, and catalogue
//! and configuration management.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::app::DataSource;

/// OSM Fetcher - Download OpenStreetMap extracts by region name
#[derive(Parser, Debug)]
#[command(
    name = "osm_fetcher",
    version,
    about = "Resolve region names to OpenStreetMap extracts and download them",
    long_about = "Looks up regions in the GeoFabrik or BBBike catalogue by (fuzzy) name and downloads
their extracts. Regions without a file in the requested format fall back to their subregions."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Catalogue snapshot directory
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Data source: geofabrik or bbbike
    #[arg(short, long, global = true, value_name = "SOURCE")]
    pub source: Option<DataSource>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve names to canonical region names
    Resolve(ResolveArgs),

    /// List the subregions of a region
    Subregions(SubregionsArgs),

    /// Print the direct download URL of a region
    Url(UrlArgs),

    /// Download extracts for one or more regions
    Download(DownloadArgs),

    /// Manage the local catalogue snapshot
    Catalogue(CatalogueArgs),

    /// Manage the configuration file
    Config(ConfigArgs),
}

/// Arguments for the resolve command
#[derive(Args, Debug, Clone)]
pub struct ResolveArgs {
    /// Region names, file names or URLs
    #[arg(required = true, value_name = "NAME")]
    pub names: Vec<String>,
}

/// Arguments for the subregions command
#[derive(Args, Debug, Clone)]
pub struct SubregionsArgs {
    /// Region name
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Expand down to leaf regions
    #[arg(long)]
    pub deep: bool,
}

/// Arguments for the url command
#[derive(Args, Debug, Clone)]
pub struct UrlArgs {
    /// Region name
    #[arg(value_name = "NAME")]
    pub name: String,

    /// File format (e.g. pbf, shp, .osm.bz2)
    #[arg(short, long, default_value = "pbf")]
    pub format: String,
}

/// Arguments for the download command
#[derive(Args, Debug, Clone)]
pub struct DownloadArgs {
    /// Region names, processed in order
    #[arg(required = true, value_name = "NAME")]
    pub names: Vec<String>,

    /// File format (e.g. pbf, shp, .osm.bz2)
    #[arg(short, long, default_value = "pbf")]
    pub format: String,

    /// Destination root directory
    #[arg(short, long, value_name = "DIR")]
    pub dest: Option<PathBuf>,

    /// Fetch again even when the file exists locally
    #[arg(short, long)]
    pub update: bool,

    /// Fall back straight to leaf regions when a region lacks the format
    #[arg(long)]
    pub deep_fallback: bool,

    /// Fetch every format each region publishes instead of one
    #[arg(long, conflicts_with_all = ["format", "deep_fallback"])]
    pub all_formats: bool,

    /// Ask before every file fetch
    #[arg(long)]
    pub confirm: bool,

    /// Dry run - show what would be downloaded without downloading
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for catalogue management
#[derive(Args, Debug)]
pub struct CatalogueArgs {
    #[command(subcommand)]
    pub action: CatalogueAction,
}

/// Catalogue management actions
#[derive(Subcommand, Debug)]
pub enum CatalogueAction {
    /// Crawl the source and replace the snapshot
    Build,

    /// Show catalogue statistics
    Info,

    /// List every leaf region
    Leaves,

    /// Remove the snapshot files
    Clear,
}

/// Arguments for configuration management
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write a commented default configuration file
    Init {
        /// Target path (defaults to the per-user config file)
        #[arg(value_name = "FILE")]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Show the effective configuration
    Show,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the logging level based on global arguments
    pub fn log_level(&self) -> tracing::Level {
        if self.global.quiet {
            tracing::Level::ERROR
        } else if self.global.very_verbose {
            tracing::Level::DEBUG
        } else if self.global.verbose {
            tracing::Level::INFO
        } else {
            tracing::Level::WARN
        }
    }
}

impl DownloadArgs {
    /// Reject argument combinations that cannot run
    pub fn validate(&self) -> Result<(), String> {
        if self.names.iter().any(|name| name.trim().is_empty()) {
            return Err("Region names must not be blank".to_string());
        }

        if self.format.trim().is_empty() {
            return Err("Format must not be blank".to_string());
        }

        if self.all_formats && self.dry_run {
            return Err("--dry-run cannot be combined with --all-formats".to_string());
        }

        Ok(())
    }
}
