//! Command-line interface components
//!
//! This module contains CLI-specific code for the OSM Fetcher application,
//! including argument parsing, progress display, and command handlers.

pub mod args;
pub mod commands;
pub mod progress;

pub use args::{
    CatalogueAction, CatalogueArgs, Cli, Commands, ConfigAction, ConfigArgs, DownloadArgs,
    GlobalArgs, ResolveArgs, SubregionsArgs, UrlArgs,
};
pub use commands::{
    handle_catalogue, handle_config, handle_download, handle_resolve, handle_subregions,
    handle_url,
};
