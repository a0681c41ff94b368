//! Breadth-first catalogue crawl
//!
//! Starting at the root page, every newly discovered region is queued once
//! and its page checked for a subregion table. A page that cannot be read
//! only costs that region its subregions; an unreadable root aborts the
//! build.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use url::Url;

use crate::app::catalogue::{Catalogue, Region};
use crate::app::listing::{DirectoryPage, Listing, ListingRow};
use crate::app::models::{ByteSize, DataSource, FormatTag};
use crate::constants::sources;
use crate::errors::{CatalogueError, CatalogueResult};

/// Callback receiving the region being crawled and the remaining frontier size
pub type CrawlProgress = Arc<dyn Fn(&str, usize) + Send + Sync>;

/// Crawls a data source into a `Catalogue`
pub struct CatalogueBuilder {
    page: Arc<dyn DirectoryPage>,
    source: DataSource,
    root: Url,
    page_delay: Duration,
    progress: Option<CrawlProgress>,
}

impl CatalogueBuilder {
    pub fn new(page: Arc<dyn DirectoryPage>, source: DataSource, root: Url) -> Self {
        Self {
            page,
            source,
            root,
            page_delay: Duration::ZERO,
            progress: None,
        }
    }

    /// Pause before each subregion page fetch
    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    pub fn with_progress(mut self, progress: CrawlProgress) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Crawl the source and return the frozen catalogue
    ///
    /// # Errors
    ///
    /// Returns `CatalogueError::BuildFailed` when the root page cannot be
    /// read or carries no subregion table.
    #[tracing::instrument(skip(self), fields(source = %self.source, root = %self.root))]
    pub async fn build(&self) -> CatalogueResult<Catalogue> {
        info!("Building catalogue from {}", self.root);

        let listing = self.page.fetch_listing(&self.root).await.map_err(|e| {
            CatalogueError::BuildFailed {
                url: self.root.to_string(),
                reason: e.to_string(),
            }
        })?;

        if !listing.has_subregions() {
            return Err(CatalogueError::BuildFailed {
                url: self.root.to_string(),
                reason: "root page has no subregion table".to_string(),
            });
        }

        let mut state = CrawlState::default();
        let mut frontier = VecDeque::new();
        for row in listing.rows {
            if let Some(name) = state.observe(None, row) {
                frontier.push_back(name);
            }
        }

        let mut pages = 1_usize;
        let mut demoted = 0_usize;

        while let Some(name) = frontier.pop_front() {
            let Some(page_url) = state.page_of(&name) else {
                debug!("{} has no page of its own, keeping it as a leaf", name);
                continue;
            };

            if let Some(progress) = &self.progress {
                progress(&name, frontier.len());
            }
            if !self.page_delay.is_zero() {
                tokio::time::sleep(self.page_delay).await;
            }

            pages += 1;
            match self.page.fetch_listing(&page_url).await {
                Ok(listing) => {
                    state.record_own_files(&name, &listing);
                    if listing.has_subregions() {
                        for row in listing.rows {
                            if let Some(child) = state.observe(Some(&name), row) {
                                frontier.push_back(child);
                            }
                        }
                    }
                }
                Err(e) => {
                    demoted += 1;
                    warn!(region = %name, "Subregion page unreadable, keeping region as a leaf: {}", e);
                }
            }
        }

        let catalogue = state.finish(self.source, self.root.clone());
        info!(
            regions = catalogue.len(),
            leaves = catalogue.leaf_names().len(),
            pages,
            demoted,
            "Catalogue built"
        );

        Ok(catalogue)
    }
}

/// Files observed for a region on one parent's row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowObservation {
    pub download_links: BTreeMap<FormatTag, Url>,
    pub size_by_format: BTreeMap<FormatTag, ByteSize>,
}

impl From<&ListingRow> for RowObservation {
    fn from(row: &ListingRow) -> Self {
        Self {
            download_links: row.download_links.clone(),
            size_by_format: row.size_by_format.clone(),
        }
    }
}

/// Pick the row kept for a region listed more than once
///
/// The row with the largest published size of `primary` wins; a row without
/// that size never beats one with it, and equal sizes keep the first-seen row.
pub fn select_row(observations: Vec<RowObservation>, primary: FormatTag) -> Option<RowObservation> {
    let mut rows = observations.into_iter();
    let mut best = rows.next()?;
    for candidate in rows {
        if candidate.size_by_format.get(&primary) > best.size_by_format.get(&primary) {
            best = candidate;
        }
    }
    Some(best)
}

#[derive(Default)]
struct CrawlState {
    regions: Vec<Region>,
    index: HashMap<String, usize>,
    top_level: Vec<String>,
    observations: HashMap<String, Vec<RowObservation>>,
    own_files: HashMap<String, RowObservation>,
}

impl CrawlState {
    /// Record a row under `parent`; returns the name when the region is new
    fn observe(&mut self, parent: Option<&str>, row: ListingRow) -> Option<String> {
        let name = self.qualified_name(row.name.trim(), &row);
        if name.is_empty() || parent == Some(name.as_str()) {
            return None;
        }

        match parent {
            Some(parent) => {
                if let Some(&i) = self.index.get(parent) {
                    let children = &mut self.regions[i].children;
                    if !children.contains(&name) {
                        children.push(name.clone());
                    }
                }
            }
            None => {
                if !self.top_level.contains(&name) {
                    self.top_level.push(name.clone());
                }
            }
        }

        self.observations
            .entry(name.clone())
            .or_default()
            .push(RowObservation::from(&row));

        if let Some(&i) = self.index.get(&name) {
            let existing = &mut self.regions[i];
            if existing.source_page.is_none() {
                existing.source_page = row.link;
            }
            debug!(
                "{} listed again under {}",
                name,
                parent.unwrap_or("the root page")
            );
            return None;
        }

        let mut region = Region::new(name.clone(), parent.map(str::to_string));
        region.source_page = row.link;
        self.index.insert(name.clone(), self.regions.len());
        self.regions.push(region);
        Some(name)
    }

    /// Name a row is recorded under
    ///
    /// A US state sharing its name with a country, or with any region seen
    /// before it, is kept apart as `<name> (US)`.
    fn qualified_name(&self, name: &str, row: &ListingRow) -> String {
        let under_us = row
            .link
            .iter()
            .chain(row.download_links.values())
            .any(|url| url.path().contains(sources::GEOFABRIK_US_PATH));
        if !under_us || name.is_empty() {
            return name.to_string();
        }

        let clashes = sources::US_STATE_NAME_CLASHES.contains(&name)
            || self
                .index
                .get(name)
                .map(|&i| !self.is_under_us(&self.regions[i]))
                .unwrap_or(false);
        if clashes {
            debug!(
                "{} is a US state here, recording it as {}{}",
                name,
                name,
                sources::US_STATE_SUFFIX
            );
            format!("{}{}", name, sources::US_STATE_SUFFIX)
        } else {
            name.to_string()
        }
    }

    fn is_under_us(&self, region: &Region) -> bool {
        region
            .source_page
            .iter()
            .any(|url| url.path().contains(sources::GEOFABRIK_US_PATH))
            || self
                .observations
                .get(&region.name)
                .map(|rows| {
                    rows.iter()
                        .flat_map(|row| row.download_links.values())
                        .any(|url| url.path().contains(sources::GEOFABRIK_US_PATH))
                })
                .unwrap_or(false)
    }

    fn page_of(&self, name: &str) -> Option<Url> {
        let &i = self.index.get(name)?;
        self.regions[i].source_page.clone()
    }

    fn record_own_files(&mut self, name: &str, listing: &Listing) {
        if listing.own_links.is_empty() {
            return;
        }
        self.own_files.insert(
            name.to_string(),
            RowObservation {
                download_links: listing.own_links.clone(),
                size_by_format: listing.own_sizes.clone(),
            },
        );
    }

    fn finish(mut self, source: DataSource, root: Url) -> Catalogue {
        let primary = source.primary_format();

        for region in &mut self.regions {
            if let Some(observations) = self.observations.remove(&region.name) {
                if observations.len() > 1 {
                    debug!(
                        "{} listed {} times, keeping one download row",
                        region.name,
                        observations.len()
                    );
                }
                if let Some(row) = select_row(observations, primary) {
                    region.download_links = row.download_links;
                    region.size_by_format = row.size_by_format;
                }
            }

            if let Some(own) = self.own_files.remove(&region.name) {
                for (format, url) in own.download_links {
                    region.download_links.entry(format).or_insert(url);
                }
                for (format, size) in own.size_by_format {
                    region.size_by_format.entry(format).or_insert(size);
                }
            }
        }

        Catalogue::from_regions(source, root, self.top_level, self.regions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation(size: Option<ByteSize>, file: &str) -> RowObservation {
        let mut row = RowObservation::default();
        row.download_links.insert(
            FormatTag::OsmPbf,
            Url::parse("https://download.geofabrik.de/")
                .unwrap()
                .join(file)
                .unwrap(),
        );
        if let Some(size) = size {
            row.size_by_format.insert(FormatTag::OsmPbf, size);
        }
        row
    }

    fn file_of(row: &RowObservation) -> &str {
        row.download_links[&FormatTag::OsmPbf].path()
    }

    #[test]
    fn test_select_row_keeps_largest() {
        let rows = vec![
            observation(Some(10), "a.osm.pbf"),
            observation(Some(30), "b.osm.pbf"),
            observation(Some(20), "c.osm.pbf"),
        ];
        let best = select_row(rows, FormatTag::OsmPbf).unwrap();
        assert_eq!(file_of(&best), "/b.osm.pbf");
    }

    #[test]
    fn test_select_row_ties_keep_first_seen() {
        let rows = vec![
            observation(Some(10), "a.osm.pbf"),
            observation(Some(10), "b.osm.pbf"),
        ];
        let best = select_row(rows, FormatTag::OsmPbf).unwrap();
        assert_eq!(file_of(&best), "/a.osm.pbf");

        let rows = vec![observation(None, "a.osm.pbf"), observation(None, "b.osm.pbf")];
        let best = select_row(rows, FormatTag::OsmPbf).unwrap();
        assert_eq!(file_of(&best), "/a.osm.pbf");
    }

    #[test]
    fn test_select_row_sized_beats_unsized() {
        let rows = vec![observation(None, "a.osm.pbf"), observation(Some(1), "b.osm.pbf")];
        let best = select_row(rows, FormatTag::OsmPbf).unwrap();
        assert_eq!(file_of(&best), "/b.osm.pbf");
        assert!(select_row(Vec::new(), FormatTag::OsmPbf).is_none());
    }

    #[test]
    fn test_observe_links_parent_and_skips_self_reference() {
        let mut state = CrawlState::default();
        assert_eq!(
            state.observe(None, ListingRow::new("Europe", None)),
            Some("Europe".to_string())
        );
        assert_eq!(
            state.observe(Some("Europe"), ListingRow::new("Albania", None)),
            Some("Albania".to_string())
        );
        assert_eq!(state.observe(Some("Europe"), ListingRow::new("Europe", None)), None);
        assert_eq!(state.observe(Some("Europe"), ListingRow::new("Albania", None)), None);
        assert_eq!(state.regions[0].children, vec!["Albania"]);
    }

    fn geofabrik(path: &str) -> Url {
        Url::parse("https://download.geofabrik.de/")
            .unwrap()
            .join(path)
            .unwrap()
    }

    fn state_row(name: &str, file: &str) -> ListingRow {
        ListingRow::new(name, Some(geofabrik(&format!("north-america/us/{}.html", file))))
            .with_file(
                FormatTag::OsmPbf,
                geofabrik(&format!("north-america/us/{}-latest.osm.pbf", file)),
                Some(200),
            )
    }

    #[test]
    fn test_us_state_clashing_with_country_is_kept_apart() {
        let mut state = CrawlState::default();
        state.observe(None, ListingRow::new("Asia", None));
        state.observe(None, ListingRow::new("United States of America", None));
        let country = ListingRow::new("Georgia", Some(geofabrik("asia/georgia.html")))
            .with_file(FormatTag::OsmPbf, geofabrik("asia/georgia-latest.osm.pbf"), Some(30));
        assert_eq!(state.observe(Some("Asia"), country), Some("Georgia".to_string()));

        assert_eq!(
            state.observe(Some("United States of America"), state_row("Georgia", "georgia")),
            Some("Georgia (US)".to_string())
        );
        assert_eq!(
            state.observe(Some("United States of America"), state_row("Alabama", "alabama")),
            Some("Alabama".to_string())
        );

        let catalogue = state.finish(DataSource::Geofabrik, geofabrik(""));
        assert_eq!(
            catalogue.download_url("Georgia", FormatTag::OsmPbf).unwrap().path(),
            "/asia/georgia-latest.osm.pbf"
        );
        assert_eq!(
            catalogue
                .download_url("Georgia (US)", FormatTag::OsmPbf)
                .unwrap()
                .path(),
            "/north-america/us/georgia-latest.osm.pbf"
        );
        assert_eq!(catalogue.get("Asia").unwrap().children, vec!["Georgia"]);
    }

    #[test]
    fn test_us_state_seen_first_is_still_renamed() {
        let mut state = CrawlState::default();
        assert_eq!(
            state.observe(None, state_row("Georgia", "georgia")),
            Some("Georgia (US)".to_string())
        );
        assert_eq!(
            state.observe(None, ListingRow::new("Georgia", Some(geofabrik("asia/georgia.html")))),
            Some("Georgia".to_string())
        );
    }

    #[test]
    fn test_shared_region_outside_us_is_merged() {
        let mut state = CrawlState::default();
        state.observe(None, ListingRow::new("Asia", None));
        state.observe(None, ListingRow::new("Europe", None));
        let russia = || ListingRow::new("Russian Federation", Some(geofabrik("russia.html")));
        assert!(state.observe(Some("Asia"), russia()).is_some());
        assert_eq!(state.observe(Some("Europe"), russia()), None);
        assert_eq!(state.regions.len(), 3);
    }
}
