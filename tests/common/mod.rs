//! In-memory collaborators shared by the integration tests
#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use url::Url;

use osm_fetcher::app::{
    Confirmation, DataSource, DirectoryPage, DownloadConfig, Fetcher, FormatTag, Listing,
    ListingRow, ResolverConfig, Session, SessionConfig,
};
use osm_fetcher::errors::{DownloadError, DownloadResult, ScrapingResult, WebScrapingError};

pub const ROOT: &str = "https://extracts.test/";

pub fn url(path: &str) -> Url {
    Url::parse(ROOT).unwrap().join(path).unwrap()
}

/// Row for a region with a page of its own and no files
pub fn parent_row(name: &str, page: &str) -> ListingRow {
    ListingRow::new(name, Some(url(page)))
}

/// Row for a leaf region publishing a `.osm.pbf` file
pub fn pbf_row(name: &str, file: &str, size: Option<u64>) -> ListingRow {
    ListingRow::new(name, None).with_file(FormatTag::OsmPbf, url(file), size)
}

/// Listing pages served from memory; unknown or failing URLs are unreadable
#[derive(Default)]
pub struct FakeDirectoryPage {
    pages: HashMap<Url, Listing>,
    failing: HashSet<Url>,
    requests: Mutex<Vec<Url>>,
}

impl FakeDirectoryPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, path: &str, listing: Listing) -> Self {
        self.pages.insert(url(path), listing);
        self
    }

    pub fn failing(mut self, path: &str) -> Self {
        self.failing.insert(url(path));
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl DirectoryPage for FakeDirectoryPage {
    async fn fetch_listing(&self, page_url: &Url) -> ScrapingResult<Listing> {
        self.requests.lock().unwrap().push(page_url.clone());

        if self.failing.contains(page_url) {
            return Err(WebScrapingError::PageUnreadable {
                url: page_url.to_string(),
                reason: "HTTP 500".to_string(),
            });
        }

        self.pages
            .get(page_url)
            .cloned()
            .ok_or_else(|| WebScrapingError::PageUnreadable {
                url: page_url.to_string(),
                reason: "HTTP 404".to_string(),
            })
    }
}

/// Writes a small file per download and records every URL
#[derive(Default)]
pub struct CountingFetcher {
    calls: AtomicUsize,
    urls: Mutex<Vec<Url>>,
    fail_containing: Option<String>,
}

impl CountingFetcher {
    pub fn failing_on(needle: &str) -> Self {
        Self {
            fail_containing: Some(needle.to_string()),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn urls(&self) -> Vec<Url> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for CountingFetcher {
    async fn download(&self, url: &Url, destination: &Path) -> DownloadResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(url.clone());

        if let Some(needle) = &self.fail_containing {
            if url.as_str().contains(needle.as_str()) {
                return Err(DownloadError::FetchFailed {
                    url: url.to_string(),
                    reason: "connection reset by peer".to_string(),
                });
            }
        }

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(destination, url.as_str()).await?;
        Ok(())
    }
}

/// Answers prompts from a script; runs out as "no"
#[derive(Default)]
pub struct ScriptedConfirmation {
    answers: Mutex<VecDeque<bool>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedConfirmation {
    pub fn new(answers: &[bool]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().copied().collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl Confirmation for ScriptedConfirmation {
    fn confirm(&self, prompt: &str) -> bool {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.answers.lock().unwrap().pop_front().unwrap_or(false)
    }
}

/// Root lists A (a leaf with a file) and B (no file, subregions B1 and B2)
pub fn two_branch_pages() -> FakeDirectoryPage {
    FakeDirectoryPage::new()
        .page(
            "",
            Listing::with_rows(vec![
                pbf_row("A", "a-latest.osm.pbf", Some(100)),
                parent_row("B", "b.html"),
            ]),
        )
        .page(
            "b.html",
            Listing::with_rows(vec![
                pbf_row("B1", "b/b1-latest.osm.pbf", Some(10)),
                pbf_row("B2", "b/b2-latest.osm.pbf", Some(20)),
            ]),
        )
}

pub fn session_config(cache_dir: &Path) -> SessionConfig {
    SessionConfig {
        source: DataSource::Geofabrik,
        root_url: Some(url("")),
        cache_dir: cache_dir.to_path_buf(),
        page_delay: Duration::ZERO,
        allow_build: true,
        resolver: ResolverConfig::default(),
        download: DownloadConfig {
            interval: Duration::ZERO,
            deep_fallback: false,
        },
    }
}

/// Session over fake collaborators plus the temp dir backing its cache
pub struct TestSession {
    pub session: Session,
    pub pages: Arc<FakeDirectoryPage>,
    pub fetcher: Arc<CountingFetcher>,
    pub temp_dir: TempDir,
}

impl TestSession {
    pub fn new(pages: FakeDirectoryPage) -> Self {
        Self::with(pages, CountingFetcher::default(), Arc::new(ScriptedConfirmation::default()))
    }

    pub fn with(
        pages: FakeDirectoryPage,
        fetcher: CountingFetcher,
        confirmation: Arc<dyn Confirmation>,
    ) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let pages = Arc::new(pages);
        let fetcher = Arc::new(fetcher);
        let session = Session::new(
            session_config(&temp_dir.path().join("cache")),
            pages.clone(),
            fetcher.clone(),
            confirmation,
        );
        Self {
            session,
            pages,
            fetcher,
            temp_dir,
        }
    }

    pub fn dest(&self) -> std::path::PathBuf {
        self.temp_dir.path().join("extracts")
    }
}
