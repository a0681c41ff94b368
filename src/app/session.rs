//! Session facade
//!
//! A `Session` owns everything needed to serve one data source: the snapshot
//! store, the page and file collaborators, and the current catalogue with its
//! name index. The catalogue is loaded on first use (snapshot, else a crawl
//! when building is allowed, else empty) and only replaced as a whole by
//! `rebuild`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{info, warn};
use url::Url;

use crate::app::catalogue::builder::CrawlProgress;
use crate::app::catalogue::{Catalogue, CatalogueBuilder, SnapshotStore};
use crate::app::client::OsmClient;
use crate::app::listing::{DirectoryPage, HtmlDirectoryPage};
use crate::app::models::{DataSource, FormatTag};
use crate::app::orchestrator::{
    BatchReport, Confirmation, DownloadConfig, DownloadOrchestrator, Fetcher, ItemOutcome,
    ItemProgress, ResolvedTarget,
};
use crate::app::resolver::{NameIndex, Resolution, Resolver, ResolverConfig};
use crate::constants::download;
use crate::errors::{CatalogueResult, DownloadError, Result};

/// Runtime settings of a session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub source: DataSource,
    /// Listing page the crawl starts from; the source's root when `None`
    pub root_url: Option<Url>,
    /// Directory holding per-source snapshot directories
    pub cache_dir: PathBuf,
    /// Pause between catalogue page fetches
    pub page_delay: Duration,
    /// Crawl the source when no snapshot exists
    pub allow_build: bool,
    pub resolver: ResolverConfig,
    pub download: DownloadConfig,
}

impl SessionConfig {
    pub fn new(source: DataSource) -> Self {
        Self {
            source,
            root_url: None,
            cache_dir: SnapshotStore::default_cache_root(),
            page_delay: download::DEFAULT_PAGE_DELAY,
            allow_build: true,
            resolver: ResolverConfig::default(),
            download: DownloadConfig::default(),
        }
    }
}

#[derive(Clone)]
struct Loaded {
    catalogue: Arc<Catalogue>,
    index: Arc<NameIndex>,
}

/// Entry point for resolving names and fetching extracts of one source
pub struct Session {
    config: SessionConfig,
    store: SnapshotStore,
    page: Arc<dyn DirectoryPage>,
    fetcher: Arc<dyn Fetcher>,
    confirmation: Arc<dyn Confirmation>,
    loaded: RwLock<Option<Loaded>>,
    crawl_progress: Option<CrawlProgress>,
    item_progress: Option<ItemProgress>,
}

impl Session {
    pub fn new(
        config: SessionConfig,
        page: Arc<dyn DirectoryPage>,
        fetcher: Arc<dyn Fetcher>,
        confirmation: Arc<dyn Confirmation>,
    ) -> Self {
        let store = SnapshotStore::new(&config.cache_dir, config.source);
        Self {
            config,
            store,
            page,
            fetcher,
            confirmation,
            loaded: RwLock::new(None),
            crawl_progress: None,
            item_progress: None,
        }
    }

    /// Session whose pages and files both go through `client`
    pub fn with_client(
        config: SessionConfig,
        client: Arc<OsmClient>,
        confirmation: Arc<dyn Confirmation>,
    ) -> Self {
        let page = Arc::new(HtmlDirectoryPage::new(client.clone(), config.source));
        Self::new(config, page, client, confirmation)
    }

    pub fn with_crawl_progress(mut self, progress: CrawlProgress) -> Self {
        self.crawl_progress = Some(progress);
        self
    }

    pub fn with_item_progress(mut self, progress: ItemProgress) -> Self {
        self.item_progress = Some(progress);
        self
    }

    pub fn source(&self) -> DataSource {
        self.config.source
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    fn root_url(&self) -> Result<Url> {
        if let Some(root) = &self.config.root_url {
            return Ok(root.clone());
        }
        let root = self.config.source.root_url();
        Url::parse(root).map_err(|e| {
            DownloadError::InvalidUrl {
                url: root.to_string(),
                error: e.to_string(),
            }
            .into()
        })
    }

    /// Current catalogue, loading it on first use
    ///
    /// # Errors
    ///
    /// Returns `CatalogueError::BuildFailed` when no snapshot exists, building
    /// is allowed, and the root page cannot be read.
    pub async fn catalogue(&self) -> Result<Arc<Catalogue>> {
        Ok(self.loaded().await?.catalogue)
    }

    async fn loaded(&self) -> Result<Loaded> {
        if let Some(loaded) = self.loaded.read().await.as_ref() {
            return Ok(loaded.clone());
        }

        let mut slot = self.loaded.write().await;
        if let Some(loaded) = slot.as_ref() {
            return Ok(loaded.clone());
        }

        let loaded = self.load_or_build().await?;
        *slot = Some(loaded.clone());
        Ok(loaded)
    }

    async fn load_or_build(&self) -> Result<Loaded> {
        if let Some((catalogue, index)) = self.store.load().await? {
            return Ok(Loaded {
                catalogue: Arc::new(catalogue),
                index: Arc::new(index),
            });
        }

        if self.config.allow_build {
            info!("No {} catalogue snapshot, building one", self.config.source);
            return self.build_and_save().await;
        }

        warn!(
            "No {} catalogue snapshot and building is disabled; the catalogue is empty",
            self.config.source
        );
        let catalogue = Catalogue::empty(self.config.source, self.root_url()?);
        let index = NameIndex::build(&catalogue);
        Ok(Loaded {
            catalogue: Arc::new(catalogue),
            index: Arc::new(index),
        })
    }

    async fn build_and_save(&self) -> Result<Loaded> {
        let catalogue = self.build_catalogue().await?;
        let index = NameIndex::build(&catalogue);
        self.store.save(&catalogue, &index).await?;
        Ok(Loaded {
            catalogue: Arc::new(catalogue),
            index: Arc::new(index),
        })
    }

    async fn build_catalogue(&self) -> Result<Catalogue> {
        let mut builder =
            CatalogueBuilder::new(self.page.clone(), self.config.source, self.root_url()?)
                .with_page_delay(self.config.page_delay);
        if let Some(progress) = &self.crawl_progress {
            builder = builder.with_progress(progress.clone());
        }
        Ok(builder.build().await?)
    }

    /// Crawl the source again and replace the catalogue wholesale
    ///
    /// On failure the previous catalogue and snapshot stay in place.
    ///
    /// # Errors
    ///
    /// Returns `CatalogueError::BuildFailed` when the root page cannot be read.
    pub async fn rebuild(&self) -> Result<Arc<Catalogue>> {
        let loaded = self.build_and_save().await?;
        let catalogue = loaded.catalogue.clone();
        *self.loaded.write().await = Some(loaded);
        Ok(catalogue)
    }

    /// Remove the source's snapshot files; the in-memory catalogue is kept
    pub async fn clear_snapshot(&self) -> CatalogueResult<bool> {
        self.store.clear().await
    }

    async fn resolver(&self) -> Result<Resolver> {
        let loaded = self.loaded().await?;
        Ok(Resolver::new(
            loaded.catalogue,
            loaded.index,
            self.config.resolver.clone(),
        ))
    }

    async fn orchestrator(&self) -> Result<DownloadOrchestrator> {
        let orchestrator = DownloadOrchestrator::new(
            self.resolver().await?,
            self.fetcher.clone(),
            self.confirmation.clone(),
            self.config.download.clone(),
        );
        Ok(match &self.item_progress {
            Some(progress) => orchestrator.with_progress(progress.clone()),
            None => orchestrator,
        })
    }

    /// Normalize a format name for this session's source
    ///
    /// # Errors
    ///
    /// Returns `CatalogueError::UnknownFormat` listing the valid formats.
    pub fn parse_format(&self, format: &str) -> Result<FormatTag> {
        Ok(self.config.source.parse_format(format)?)
    }

    /// Canonical region name for arbitrary input
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::NameNotResolvable` for blank input or an empty
    /// catalogue, or a load error.
    pub async fn resolve_name(&self, input: &str) -> Result<String> {
        Ok(self.resolver().await?.resolve(input)?)
    }

    /// Like `resolve_name`, reporting how the input matched
    pub async fn resolve_detailed(&self, input: &str) -> Result<Resolution> {
        Ok(self.resolver().await?.resolve_detailed(input)?)
    }

    /// Subregions of a region, shallow or down to the leaves
    pub async fn list_subregions(&self, name: &str, deep: bool) -> Result<Vec<String>> {
        let resolver = self.resolver().await?;
        let canonical = resolver.resolve(name)?;
        Ok(resolver.expand(&canonical, deep))
    }

    /// Every leaf region in discovery order
    pub async fn list_leaves(&self) -> Result<Vec<String>> {
        let catalogue = self.catalogue().await?;
        Ok(catalogue
            .leaf_names()
            .into_iter()
            .map(str::to_string)
            .collect())
    }

    /// Direct file URL for a region and format; `None` when not published
    pub async fn get_download_url(&self, name: &str, format: &str) -> Result<Option<Url>> {
        let format = self.parse_format(format)?;
        let resolver = self.resolver().await?;
        let canonical = resolver.resolve(name)?;
        Ok(resolver.catalogue().download_url(&canonical, format).cloned())
    }

    /// Files that `ensure_local` would consider for a region, without fetching
    pub async fn plan(
        &self,
        name: &str,
        format: &str,
        dest_root: &Path,
    ) -> Result<Vec<ResolvedTarget>> {
        let format = self.parse_format(format)?;
        let orchestrator = self.orchestrator().await?;
        let canonical = orchestrator.resolver().resolve(name)?;
        Ok(orchestrator.plan(&canonical, format, dest_root))
    }

    /// Make a region's file(s) available under `dest_root`
    pub async fn ensure_local(
        &self,
        name: &str,
        format: &str,
        dest_root: &Path,
        update: bool,
    ) -> Result<Vec<ItemOutcome>> {
        let format = self.parse_format(format)?;
        self.orchestrator()
            .await?
            .ensure_local(name, format, dest_root, update)
            .await
    }

    /// Process several regions in input order, one fetch at a time
    pub async fn ensure_local_batch(
        &self,
        names: &[String],
        format: &str,
        dest_root: &Path,
        update: bool,
        confirm_each: bool,
    ) -> Result<BatchReport> {
        let format = self.parse_format(format)?;
        self.orchestrator()
            .await?
            .ensure_local_batch(names, format, dest_root, update, confirm_each)
            .await
    }

    /// Fetch every format the regions publish directly, one file at a time
    pub async fn ensure_local_all_formats(
        &self,
        names: &[String],
        dest_root: &Path,
        update: bool,
        confirm_each: bool,
    ) -> Result<BatchReport> {
        self.orchestrator()
            .await?
            .ensure_local_all_formats(names, dest_root, update, confirm_each)
            .await
    }
}
