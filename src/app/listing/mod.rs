//! Directory page access
//!
//! Extract servers publish their catalogue only as HTML listing pages. This
//! module defines the `DirectoryPage` boundary the catalogue builder crawls
//! through, the structured rows a page yields, and the HTML implementation
//! backed by `OsmClient`.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use scraper::Selector;
use url::Url;

use crate::app::client::OsmClient;
use crate::app::models::{ByteSize, DataSource, FormatTag};
use crate::errors::{ScrapingResult, WebScrapingError};

pub mod bbbike;
pub mod geofabrik;

/// One region row of a listing page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingRow {
    /// Region name as printed on the page
    pub name: String,
    /// Page describing the region's own subregions, if any
    pub link: Option<Url>,
    /// Direct download link per format
    pub download_links: BTreeMap<FormatTag, Url>,
    /// Published size per format
    pub size_by_format: BTreeMap<FormatTag, ByteSize>,
}

impl ListingRow {
    /// Row with a name and region page link but no files
    pub fn new(name: impl Into<String>, link: Option<Url>) -> Self {
        Self {
            name: name.into(),
            link,
            ..Default::default()
        }
    }

    /// Attach a download link (and optional size) for one format
    pub fn with_file(mut self, format: FormatTag, url: Url, size: Option<ByteSize>) -> Self {
        self.download_links.insert(format, url);
        if let Some(size) = size {
            self.size_by_format.insert(format, size);
        }
        self
    }
}

/// Structured content of one listing page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Listing {
    /// Subregion rows in page order
    pub rows: Vec<ListingRow>,
    /// Whether the page carried a subregion table at all
    pub has_subregion_table: bool,
    /// Files the page publishes for its own region
    pub own_links: BTreeMap<FormatTag, Url>,
    /// Sizes of the page's own files
    pub own_sizes: BTreeMap<FormatTag, ByteSize>,
}

impl Listing {
    /// Listing of a page with a subregion table
    pub fn with_rows(rows: Vec<ListingRow>) -> Self {
        Self {
            has_subregion_table: true,
            rows,
            ..Default::default()
        }
    }

    /// Listing of a terminal page
    pub fn terminal() -> Self {
        Self::default()
    }

    /// True when the page yields at least one subregion
    pub fn has_subregions(&self) -> bool {
        self.has_subregion_table && !self.rows.is_empty()
    }
}

/// Fetches and parses one listing page into rows
#[async_trait]
pub trait DirectoryPage: Send + Sync {
    /// Fetch `url` and return its structured listing
    ///
    /// # Errors
    ///
    /// Returns `WebScrapingError::PageUnreadable` when the page cannot be
    /// fetched or decoded.
    async fn fetch_listing(&self, url: &Url) -> ScrapingResult<Listing>;
}

/// `DirectoryPage` backed by HTTP and the source's HTML layout
#[derive(Debug, Clone)]
pub struct HtmlDirectoryPage {
    client: Arc<OsmClient>,
    source: DataSource,
}

impl HtmlDirectoryPage {
    pub fn new(client: Arc<OsmClient>, source: DataSource) -> Self {
        Self { client, source }
    }
}

#[async_trait]
impl DirectoryPage for HtmlDirectoryPage {
    async fn fetch_listing(&self, url: &Url) -> ScrapingResult<Listing> {
        let html = self
            .client
            .get_page(url)
            .await
            .map_err(|e| WebScrapingError::PageUnreadable {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        parse_page(self.source, &html, url)
    }
}

/// Parse a listing page using the layout of `source`
pub fn parse_page(source: DataSource, html: &str, page_url: &Url) -> ScrapingResult<Listing> {
    match source {
        DataSource::Geofabrik => geofabrik::parse_listing(html, page_url),
        DataSource::Bbbike => bbbike::parse_listing(html, page_url),
    }
}

pub(crate) fn selector(css: &str) -> ScrapingResult<Selector> {
    Selector::parse(css).map_err(|_| WebScrapingError::InvalidSelector {
        selector: css.to_string(),
    })
}

/// Last path segment of an href, without query or fragment
pub(crate) fn href_file_name(href: &str) -> &str {
    let path = href.split(['?', '#']).next().unwrap_or(href);
    path.rsplit('/').next().unwrap_or(path)
}

/// Collapse whitespace (including non-breaking spaces) in cell text
pub(crate) fn clean_text<'a>(pieces: impl Iterator<Item = &'a str>) -> String {
    pieces
        .collect::<String>()
        .replace('\u{a0}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
