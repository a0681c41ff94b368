//! Region catalogue of an extract server
//!
//! A `Catalogue` is built once by `CatalogueBuilder` (or loaded from a
//! snapshot) and never mutated afterwards; a rebuild produces a new value.
//! Regions are keyed by canonical name. The same name may be listed under
//! several parents: every parent keeps the edge, but the region itself, and
//! therefore its row in the download table, exists once.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::app::models::{ByteSize, DataSource, FormatTag};

pub mod builder;
pub mod snapshot;

pub use builder::CatalogueBuilder;
pub use snapshot::SnapshotStore;

/// A node of the geographic hierarchy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Canonical name, unique within the catalogue
    pub name: String,
    /// First parent the region was discovered under; `None` for top-level regions
    pub parent: Option<String>,
    /// Subregions in discovery order
    pub children: Vec<String>,
    /// Direct download links for the formats observed for this region
    pub download_links: BTreeMap<FormatTag, Url>,
    /// Published sizes for the formats observed for this region
    pub size_by_format: BTreeMap<FormatTag, ByteSize>,
    /// Page that lists this region's subregions or files
    pub source_page: Option<Url>,
}

impl Region {
    pub fn new(name: impl Into<String>, parent: Option<String>) -> Self {
        Self {
            name: name.into(),
            parent,
            children: Vec::new(),
            download_links: BTreeMap::new(),
            size_by_format: BTreeMap::new(),
            source_page: None,
        }
    }

    /// A leaf has no subregions
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Direct link for `format`, if the region publishes one
    pub fn download_url(&self, format: FormatTag) -> Option<&Url> {
        self.download_links.get(&format)
    }
}

/// One row of the flat per-name download table
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadRow<'a> {
    pub name: &'a str,
    pub download_links: &'a BTreeMap<FormatTag, Url>,
    pub size_by_format: &'a BTreeMap<FormatTag, ByteSize>,
}

/// Frozen region hierarchy of one data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalogue {
    source: DataSource,
    source_root: Url,
    built_at: DateTime<Utc>,
    /// Regions listed on the root page, in page order
    top_level: Vec<String>,
    /// Every region name in discovery order
    order: Vec<String>,
    regions: BTreeMap<String, Region>,
}

impl Catalogue {
    /// Catalogue with no regions, used when no snapshot exists and building is disabled
    pub fn empty(source: DataSource, source_root: Url) -> Self {
        Self {
            source,
            source_root,
            built_at: Utc::now(),
            top_level: Vec::new(),
            order: Vec::new(),
            regions: BTreeMap::new(),
        }
    }

    /// Assemble a catalogue from regions in discovery order
    ///
    /// Child names without a region of their own are dropped from the
    /// children lists so that every edge resolves.
    pub fn from_regions(
        source: DataSource,
        source_root: Url,
        top_level: Vec<String>,
        regions: Vec<Region>,
    ) -> Self {
        let order: Vec<String> = regions.iter().map(|r| r.name.clone()).collect();
        let mut by_name: BTreeMap<String, Region> = BTreeMap::new();
        for region in regions {
            by_name.entry(region.name.clone()).or_insert(region);
        }

        let known: HashSet<String> = by_name.keys().cloned().collect();
        for region in by_name.values_mut() {
            region.children.retain(|child| known.contains(child));
        }

        let mut seen = HashSet::new();
        let order = order
            .into_iter()
            .filter(|name| seen.insert(name.clone()))
            .collect();
        let top_level = top_level
            .into_iter()
            .filter(|name| known.contains(name))
            .collect();

        Self {
            source,
            source_root,
            built_at: Utc::now(),
            top_level,
            order,
            regions: by_name,
        }
    }

    pub fn source(&self) -> DataSource {
        self.source
    }

    pub fn source_root(&self) -> &Url {
        &self.source_root
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Region> {
        self.regions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.regions.contains_key(name)
    }

    /// Regions listed on the root page
    pub fn top_level(&self) -> &[String] {
        &self.top_level
    }

    /// All region names in discovery order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Regions in discovery order
    pub fn regions(&self) -> impl Iterator<Item = &Region> {
        self.order.iter().filter_map(|name| self.regions.get(name))
    }

    /// Leaf region names in discovery order
    pub fn leaf_names(&self) -> Vec<&str> {
        self.regions()
            .filter(|r| r.is_leaf())
            .map(|r| r.name.as_str())
            .collect()
    }

    /// Names of regions that have subregions, in discovery order
    pub fn parent_names(&self) -> Vec<&str> {
        self.regions()
            .filter(|r| !r.is_leaf())
            .map(|r| r.name.as_str())
            .collect()
    }

    /// Direct download URL for a canonical name and format
    ///
    /// `None` covers both an unknown name and a format the region does not
    /// publish directly.
    pub fn download_url(&self, name: &str, format: FormatTag) -> Option<&Url> {
        self.regions.get(name)?.download_url(format)
    }

    /// The flat download table: one row per region name
    pub fn download_table(&self) -> Vec<DownloadRow<'_>> {
        self.regions()
            .map(|r| DownloadRow {
                name: &r.name,
                download_links: &r.download_links,
                size_by_format: &r.size_by_format,
            })
            .collect()
    }

    /// Every child name refers to a region of this catalogue
    pub fn is_consistent(&self) -> bool {
        self.regions
            .values()
            .flat_map(|r| r.children.iter())
            .all(|child| self.regions.contains_key(child))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(path: &str) -> Url {
        Url::parse("https://download.geofabrik.de/")
            .unwrap()
            .join(path)
            .unwrap()
    }

    fn sample() -> Catalogue {
        let mut europe = Region::new("Europe", None);
        europe.children = vec!["Albania".to_string(), "Atlantis".to_string()];
        let mut albania = Region::new("Albania", Some("Europe".to_string()));
        albania
            .download_links
            .insert(FormatTag::OsmPbf, url("europe/albania-latest.osm.pbf"));

        Catalogue::from_regions(
            DataSource::Geofabrik,
            url(""),
            vec!["Europe".to_string()],
            vec![europe, albania],
        )
    }

    #[test]
    fn test_dangling_children_are_dropped() {
        let catalogue = sample();
        assert!(catalogue.is_consistent());
        assert_eq!(catalogue.get("Europe").unwrap().children, vec!["Albania"]);
    }

    #[test]
    fn test_leaf_and_parent_names() {
        let catalogue = sample();
        assert_eq!(catalogue.leaf_names(), vec!["Albania"]);
        assert_eq!(catalogue.parent_names(), vec!["Europe"]);
        assert_eq!(catalogue.top_level(), &["Europe".to_string()]);
    }

    #[test]
    fn test_download_url_lookup() {
        let catalogue = sample();
        assert!(catalogue.download_url("Albania", FormatTag::OsmPbf).is_some());
        assert!(catalogue.download_url("Albania", FormatTag::ShpZip).is_none());
        assert!(catalogue.download_url("Europe", FormatTag::OsmPbf).is_none());
        assert!(catalogue.download_url("Mordor", FormatTag::OsmPbf).is_none());
    }

    #[test]
    fn test_empty_catalogue() {
        let catalogue = Catalogue::empty(DataSource::Bbbike, url(""));
        assert!(catalogue.is_empty());
        assert!(catalogue.download_table().is_empty());
    }
}
