//! Command handlers for OSM Fetcher CLI
//!
//! This module implements the command handlers that connect CLI arguments
//! to a configured `Session`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::app::orchestrator::{AlwaysConfirm, Confirmation, TerminalConfirmation};
use crate::app::{BatchReport, ItemStatus, MatchKind, OsmClient, Session};
use crate::cli::progress::{batch_bar, crawl_progress, crawl_spinner, item_progress};
use crate::cli::{
    CatalogueAction, CatalogueArgs, ConfigAction, ConfigArgs, DownloadArgs, GlobalArgs,
    ResolveArgs, SubregionsArgs, UrlArgs,
};
use crate::config::AppConfig;
use crate::errors::{AppError, Result};

/// Configuration and session shared by the handlers
struct Context {
    config: AppConfig,
    session: Session,
    spinner: indicatif::ProgressBar,
}

async fn context(global: &GlobalArgs, confirmation: Arc<dyn Confirmation>) -> Result<Context> {
    let config = AppConfig::load(global.config.as_deref()).await?;
    context_with(global, config, confirmation)
}

fn context_with(
    global: &GlobalArgs,
    config: AppConfig,
    confirmation: Arc<dyn Confirmation>,
) -> Result<Context> {
    let client = Arc::new(OsmClient::with_config(&config.client_config())?);
    let session_config = config.session_config(global.source, global.cache_dir.clone());
    let spinner = crawl_spinner(global.quiet);
    let session = Session::with_client(session_config, client, confirmation)
        .with_crawl_progress(crawl_progress(spinner.clone()));

    Ok(Context {
        config,
        session,
        spinner,
    })
}

/// Handle the resolve command
pub async fn handle_resolve(global: &GlobalArgs, args: ResolveArgs) -> Result<()> {
    let ctx = context(global, Arc::new(AlwaysConfirm)).await?;

    for input in &args.names {
        let resolution = ctx.session.resolve_detailed(input).await;
        ctx.spinner.finish_and_clear();
        let resolution = resolution?;

        match resolution.kind {
            MatchKind::Fuzzy => println!(
                "{} -> {} (closest match, similarity {:.2})",
                input, resolution.name, resolution.score
            ),
            _ => println!("{} -> {}", input, resolution.name),
        }
    }

    Ok(())
}

/// Handle the subregions command
pub async fn handle_subregions(global: &GlobalArgs, args: SubregionsArgs) -> Result<()> {
    let ctx = context(global, Arc::new(AlwaysConfirm)).await?;

    let names = ctx.session.list_subregions(&args.name, args.deep).await;
    ctx.spinner.finish_and_clear();
    for name in names? {
        println!("{}", name);
    }

    Ok(())
}

/// Handle the url command
pub async fn handle_url(global: &GlobalArgs, args: UrlArgs) -> Result<()> {
    let ctx = context(global, Arc::new(AlwaysConfirm)).await?;

    let url = ctx.session.get_download_url(&args.name, &args.format).await;
    ctx.spinner.finish_and_clear();
    match url? {
        Some(url) => println!("{}", url),
        None => {
            let name = ctx.session.resolve_name(&args.name).await?;
            println!(
                "{} has no direct {} file; `download` falls back to its subregions",
                name, args.format
            );
        }
    }

    Ok(())
}

/// Handle the download command
///
/// Resolves every name, plans the files (including subregion fallbacks) and
/// fetches them one at a time.
pub async fn handle_download(global: &GlobalArgs, args: DownloadArgs) -> Result<()> {
    let start_time = Instant::now();
    args.validate().map_err(AppError::generic)?;

    let confirmation: Arc<dyn Confirmation> = if args.confirm {
        Arc::new(TerminalConfirmation)
    } else {
        Arc::new(AlwaysConfirm)
    };

    let mut config = AppConfig::load(global.config.as_deref()).await?;
    if args.deep_fallback {
        config.download.deep_fallback = true;
    }
    let confirm_each = args.confirm || config.download.confirm_each;

    let ctx = context_with(global, config, confirmation)?;
    let dest_root = args
        .dest
        .clone()
        .unwrap_or_else(|| ctx.config.destination_root(ctx.session.source()));

    if args.all_formats {
        let catalogue = ctx.session.catalogue().await;
        ctx.spinner.finish_and_clear();
        let catalogue = catalogue?;

        let mut total = 0;
        for name in &args.names {
            let canonical = ctx.session.resolve_name(name).await?;
            total += catalogue
                .get(&canonical)
                .map(|region| region.download_links.len())
                .unwrap_or(0)
                .max(1);
        }

        let bar = batch_bar(total, global.quiet || args.confirm);
        let session = ctx.session.with_item_progress(item_progress(bar.clone()));
        let report = session
            .ensure_local_all_formats(&args.names, &dest_root, args.update, confirm_each)
            .await?;
        bar.finish_and_clear();
        return print_report(global, &report, start_time);
    }

    let mut total = 0;
    for name in &args.names {
        let planned = ctx.session.plan(name, &args.format, &dest_root).await;
        ctx.spinner.finish_and_clear();
        let planned = planned?;

        if args.dry_run {
            for target in &planned {
                match &target.url {
                    Some(url) => println!("{} -> {}", url, target.local_path.display()),
                    None => println!("{}: no {} file available", target.name, target.format),
                }
            }
        }
        total += planned.len();
    }

    if args.dry_run {
        println!("{} file(s) planned under {}", total, dest_root.display());
        return Ok(());
    }

    let bar = batch_bar(total, global.quiet || args.confirm);
    let session = ctx.session.with_item_progress(item_progress(bar.clone()));
    let report = session
        .ensure_local_batch(&args.names, &args.format, &dest_root, args.update, confirm_each)
        .await?;
    bar.finish_and_clear();

    print_report(global, &report, start_time)
}

fn print_report(global: &GlobalArgs, report: &BatchReport, start_time: Instant) -> Result<()> {
    for outcome in &report.outcomes {
        match (&outcome.status, &outcome.path) {
            (ItemStatus::Failed(reason), _) => {
                println!("✗ {} {}: {}", outcome.region, outcome.format, reason);
            }
            (ItemStatus::NoData, _) => {
                println!("- {}: no {} file available", outcome.region, outcome.format);
            }
            (status, Some(path)) => {
                println!("✓ {} [{}] {}", outcome.region, status.label(), path.display());
            }
            (status, None) => println!("- {} [{}]", outcome.region, status.label()),
        }
    }

    info!(
        "Download finished in {:.1}s: {}",
        start_time.elapsed().as_secs_f64(),
        report
    );
    if !global.quiet {
        println!("{}", report);
    }

    if report.failed() > 0 {
        warn!("{} file(s) failed; re-run with --update to retry", report.failed());
    }

    Ok(())
}

/// Handle catalogue management commands
pub async fn handle_catalogue(global: &GlobalArgs, args: CatalogueArgs) -> Result<()> {
    let ctx = context(global, Arc::new(AlwaysConfirm)).await?;
    let session = &ctx.session;

    match args.action {
        CatalogueAction::Build => {
            let start = Instant::now();
            let catalogue = session.rebuild().await;
            ctx.spinner.finish_and_clear();
            let catalogue = catalogue?;
            println!(
                "Built {} catalogue: {} regions ({} leaves) in {:.1}s",
                session.source(),
                catalogue.len(),
                catalogue.leaf_names().len(),
                start.elapsed().as_secs_f64()
            );
            println!("Snapshot: {}", session.store().dir().display());
        }
        CatalogueAction::Info => {
            let catalogue = session.catalogue().await;
            ctx.spinner.finish_and_clear();
            let catalogue = catalogue?;
            println!("Source:     {} ({})", session.source().display_name(), catalogue.source_root());
            println!("Snapshot:   {}", session.store().dir().display());
            println!("Regions:    {}", catalogue.len());
            println!("Top level:  {}", catalogue.top_level().len());
            println!("Leaves:     {}", catalogue.leaf_names().len());
            println!("Built at:   {}", catalogue.built_at().format("%Y-%m-%d %H:%M:%S UTC"));
        }
        CatalogueAction::Leaves => {
            let leaves = session.list_leaves().await;
            ctx.spinner.finish_and_clear();
            for name in leaves? {
                println!("{}", name);
            }
        }
        CatalogueAction::Clear => {
            if session.clear_snapshot().await? {
                println!("Removed {} snapshot in {}", session.source(), session.store().dir().display());
            } else {
                println!("No {} snapshot to remove", session.source());
            }
        }
    }

    Ok(())
}

/// Handle configuration commands
pub async fn handle_config(global: &GlobalArgs, args: ConfigArgs) -> Result<()> {
    match args.action {
        ConfigAction::Init { path, force } => {
            let path = match path {
                Some(path) => path,
                None => AppConfig::default_config_path()
                    .ok_or_else(|| AppError::generic("Could not determine user config directory"))?,
            };
            AppConfig::write_default(&path, force).await?;
            println!("📁 Created default configuration file:");
            println!("   {}", path.display());
        }
        ConfigAction::Show => {
            let location: Option<PathBuf> = AppConfig::locate(global.config.as_deref())?;
            let config = AppConfig::load(global.config.as_deref()).await?;
            match location {
                Some(path) => println!("# Loaded from {}", path.display()),
                None => println!("# No config file found, showing defaults"),
            }
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}
