//! OSM Fetcher CLI application
//!
//! Command-line interface for resolving region names against the GeoFabrik
//! and BBBike catalogues and downloading their OpenStreetMap extracts.

use std::process;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

// Import CLI modules through the library
use osm_fetcher::cli::{
    handle_catalogue, handle_config, handle_download, handle_resolve, handle_subregions,
    handle_url, Cli, Commands,
};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse_args();

    init_logging(&cli)?;

    info!("OSM Fetcher v{} starting", env!("CARGO_PKG_VERSION"));

    let global = &cli.global;
    match cli.command {
        Commands::Resolve(args) => handle_resolve(global, args)
            .await
            .context("resolve failed"),
        Commands::Subregions(args) => handle_subregions(global, args)
            .await
            .context("listing subregions failed"),
        Commands::Url(args) => handle_url(global, args)
            .await
            .context("URL lookup failed"),
        Commands::Download(args) => {
            info!("Executing download command");
            handle_download(global, args)
                .await
                .context("download failed")
        }
        Commands::Catalogue(args) => {
            info!("Executing catalogue command");
            handle_catalogue(global, args)
                .await
                .context("catalogue command failed")
        }
        Commands::Config(args) => handle_config(global, args)
            .await
            .context("config command failed"),
    }
}

/// Initialize logging based on CLI verbosity settings
fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let log_level = cli.log_level();

    let directive = format!("osm_fetcher={}", log_level)
        .parse()
        .context("invalid log directive")?;
    let filter = EnvFilter::from_default_env().add_directive(directive);

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(cli.global.very_verbose) // Show levels only in very verbose mode
        .with_writer(std::io::stderr)
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }

    Ok(())
}
