//! Download orchestration
//!
//! A request for (region, format) is turned into a plan with an explicit work
//! queue: a region publishing the format directly becomes one file, a region
//! without it is replaced by its subregions inside a namespace directory, and
//! a leaf without it ends as `NoData`. Plans are then executed strictly one
//! item at a time with a pause between network fetches.

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::app::models::FormatTag;
use crate::app::resolver::Resolver;
use crate::constants::download;
use crate::errors::{DownloadResult, ResolveResult, Result};

pub mod confirm;
pub mod outcome;
pub mod paths;

pub use confirm::{AlwaysConfirm, Confirmation, TerminalConfirmation};
pub use outcome::{BatchReport, ItemOutcome, ItemStatus};
pub use paths::{PathGenerator, Placement};

/// Retrieves one remote file
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Download `url` to `destination`, creating parent directories
    async fn download(&self, url: &Url, destination: &Path) -> DownloadResult<()>;
}

/// Download sequencing options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Pause between consecutive network fetches
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    /// Fan out straight to leaf regions instead of direct subregions
    pub deep_fallback: bool,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            interval: download::DEFAULT_INTERVAL,
            deep_fallback: false,
        }
    }
}

/// A region, a format and where its file goes
///
/// `url` is `None` exactly when the region publishes no direct file in that
/// format; `local_path` is then the namespace directory its subregions use.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTarget {
    pub name: String,
    pub format: FormatTag,
    pub url: Option<Url>,
    pub local_path: PathBuf,
}

/// Callback invoked after every processed item
pub type ItemProgress = Arc<dyn Fn(&ItemOutcome) + Send + Sync>;

/// Plans and runs downloads against one catalogue
pub struct DownloadOrchestrator {
    resolver: Resolver,
    fetcher: Arc<dyn Fetcher>,
    confirmation: Arc<dyn Confirmation>,
    config: DownloadConfig,
    progress: Option<ItemProgress>,
}

impl DownloadOrchestrator {
    pub fn new(
        resolver: Resolver,
        fetcher: Arc<dyn Fetcher>,
        confirmation: Arc<dyn Confirmation>,
        config: DownloadConfig,
    ) -> Self {
        Self {
            resolver,
            fetcher,
            confirmation,
            config,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ItemProgress) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Direct file URL for a canonical name; `None` triggers fan-out
    pub fn get_download_url(&self, name: &str, format: FormatTag) -> Option<Url> {
        self.resolver.catalogue().download_url(name, format).cloned()
    }

    pub fn resolve_target(&self, name: &str, format: FormatTag, placement: &Placement) -> ResolvedTarget {
        match self.get_download_url(name, format) {
            Some(url) => ResolvedTarget {
                name: name.to_string(),
                format,
                local_path: PathGenerator::file_path(placement, name, format, &url),
                url: Some(url),
            },
            None => ResolvedTarget {
                name: name.to_string(),
                format,
                url: None,
                local_path: PathGenerator::fan_out_dir(placement, name, format),
            },
        }
    }

    /// Ordered list of targets satisfying (name, format)
    ///
    /// Targets with a URL are files to fetch; targets without one are regions
    /// left with no data. A region appears at most once per plan.
    pub fn plan(&self, name: &str, format: FormatTag, dest_root: &Path) -> Vec<ResolvedTarget> {
        let mut planned = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<(String, Placement)> =
            VecDeque::from([(name.to_string(), Placement::Root(dest_root.to_path_buf()))]);

        while let Some((current, placement)) = queue.pop_front() {
            if !seen.insert(current.clone()) {
                debug!("{} already planned", current);
                continue;
            }

            let target = self.resolve_target(&current, format, &placement);
            if target.url.is_some() {
                planned.push(target);
                continue;
            }

            let children: Vec<String> = self
                .resolver
                .expand(&current, self.config.deep_fallback)
                .into_iter()
                .filter(|child| *child != current)
                .collect();
            if children.is_empty() {
                planned.push(target);
                continue;
            }

            debug!(
                "{} has no {} file, falling back to {} subregions",
                current,
                format,
                children.len()
            );
            let namespace = Placement::Namespace(target.local_path);
            // Subregions are processed before the rest of the queue, in order
            for child in children.into_iter().rev() {
                queue.push_front((child, namespace.clone()));
            }
        }

        planned
    }

    /// Make the file(s) for one region available locally
    ///
    /// An existing file is never fetched again unless `update` is set, so
    /// repeated calls cost no network access.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::NameNotResolvable` if `name` cannot be resolved.
    /// Fetch failures are reported in the outcomes.
    #[instrument(skip(self, dest_root), fields(dest = %dest_root.display()))]
    pub async fn ensure_local(
        &self,
        name: &str,
        format: FormatTag,
        dest_root: &Path,
        update: bool,
    ) -> Result<Vec<ItemOutcome>> {
        let canonical = self.resolver.resolve(name)?;
        let planned = self.plan(&canonical, format, dest_root);

        let mut fetched = false;
        let mut outcomes = Vec::with_capacity(planned.len());
        for target in planned {
            outcomes.push(
                self.run_item(&canonical, target, update, false, &mut fetched)
                    .await,
            );
        }
        Ok(outcomes)
    }

    /// Process several regions in input order, one file at a time
    ///
    /// All names are resolved before any network access. Declined, failed
    /// and empty items are reported in the returned report and never abort
    /// the batch.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::NameNotResolvable` if any name cannot be resolved.
    #[instrument(skip(self, names, dest_root), fields(count = names.len()))]
    pub async fn ensure_local_batch(
        &self,
        names: &[String],
        format: FormatTag,
        dest_root: &Path,
        update: bool,
        confirm_each: bool,
    ) -> Result<BatchReport> {
        let canonical = names
            .iter()
            .map(|name| self.resolver.resolve(name))
            .collect::<ResolveResult<Vec<_>>>()?;

        let mut report = BatchReport::default();
        let mut fetched = false;
        for name in &canonical {
            for target in self.plan(name, format, dest_root) {
                let outcome = self
                    .run_item(name, target, update, confirm_each, &mut fetched)
                    .await;
                report.outcomes.push(outcome);
            }
        }

        info!("Batch finished: {}", report);
        Ok(report)
    }

    /// Fetch every format each region publishes directly
    ///
    /// Formats follow the source's order and share the batch's confirmation,
    /// pause and already-present handling. A region publishing nothing is
    /// reported once as `NoData` for the source's primary format.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::NameNotResolvable` if any name cannot be resolved.
    #[instrument(skip(self, names, dest_root), fields(count = names.len()))]
    pub async fn ensure_local_all_formats(
        &self,
        names: &[String],
        dest_root: &Path,
        update: bool,
        confirm_each: bool,
    ) -> Result<BatchReport> {
        let canonical = names
            .iter()
            .map(|name| self.resolver.resolve(name))
            .collect::<ResolveResult<Vec<_>>>()?;

        let catalogue = self.resolver.catalogue();
        let placement = Placement::Root(dest_root.to_path_buf());
        let mut report = BatchReport::default();
        let mut fetched = false;
        for name in &canonical {
            let mut formats: Vec<FormatTag> = catalogue
                .source()
                .formats()
                .iter()
                .copied()
                .filter(|format| catalogue.download_url(name, *format).is_some())
                .collect();
            if formats.is_empty() {
                formats.push(catalogue.source().primary_format());
            }
            debug!("{} publishes {} format(s)", name, formats.len());

            for format in formats {
                let target = self.resolve_target(name, format, &placement);
                let outcome = self
                    .run_item(name, target, update, confirm_each, &mut fetched)
                    .await;
                report.outcomes.push(outcome);
            }
        }

        info!("All-format batch finished: {}", report);
        Ok(report)
    }

    async fn run_item(
        &self,
        requested: &str,
        target: ResolvedTarget,
        update: bool,
        confirm_each: bool,
        fetched: &mut bool,
    ) -> ItemOutcome {
        let status = self.item_status(&target, update, confirm_each, fetched).await;
        let outcome = ItemOutcome::new(requested, target, status);
        if let Some(progress) = &self.progress {
            progress(&outcome);
        }
        outcome
    }

    async fn item_status(
        &self,
        target: &ResolvedTarget,
        update: bool,
        confirm_each: bool,
        fetched: &mut bool,
    ) -> ItemStatus {
        let Some(url) = &target.url else {
            warn!(
                "{} publishes no {} file and has no subregions to fall back to",
                target.name, target.format
            );
            return ItemStatus::NoData;
        };

        if !update {
            match tokio::fs::try_exists(&target.local_path).await {
                Ok(true) => {
                    debug!("{} already present at {}", target.name, target.local_path.display());
                    return ItemStatus::AlreadyPresent;
                }
                Ok(false) => {}
                Err(e) => warn!(
                    "Cannot check {} ({}), fetching it again",
                    target.local_path.display(),
                    e
                ),
            }
        }

        if confirm_each {
            let prompt = format!(
                "Download {} ({}) to {}?",
                target.name,
                target.format,
                target.local_path.display()
            );
            if !self.confirmation.confirm(&prompt) {
                warn!("Skipping {} ({}): declined", target.name, target.format);
                return ItemStatus::Skipped;
            }
        }

        if *fetched && !self.config.interval.is_zero() {
            tokio::time::sleep(self.config.interval).await;
        }
        *fetched = true;

        match self.fetcher.download(url, &target.local_path).await {
            Ok(()) => {
                info!("Fetched {} to {}", target.name, target.local_path.display());
                ItemStatus::Downloaded
            }
            Err(e) => {
                warn!("Failed to fetch {} ({}): {}", target.name, target.format, e);
                ItemStatus::Failed(e.to_string())
            }
        }
    }
}
