//! Per-item download outcomes and batch summaries

use std::fmt;
use std::path::{Path, PathBuf};

use url::Url;

use crate::app::models::FormatTag;
use crate::app::orchestrator::ResolvedTarget;

/// What happened to one planned file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemStatus {
    /// Fetched during this call
    Downloaded,
    /// Local file existed and no update was requested; no network access
    AlreadyPresent,
    /// Declined at the confirmation gate
    Skipped,
    /// The fetcher reported an error
    Failed(String),
    /// Neither a direct file nor subregions to fall back to
    NoData,
}

impl ItemStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ItemStatus::Downloaded => "downloaded",
            ItemStatus::AlreadyPresent => "present",
            ItemStatus::Skipped => "skipped",
            ItemStatus::Failed(_) => "failed",
            ItemStatus::NoData => "no data",
        }
    }

    /// The file is on disk after this call
    pub fn is_available(&self) -> bool {
        matches!(self, ItemStatus::Downloaded | ItemStatus::AlreadyPresent)
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemStatus::Failed(reason) => write!(f, "failed: {}", reason),
            other => write!(f, "{}", other.label()),
        }
    }
}

/// Outcome of one planned (region, format) file
#[derive(Debug, Clone, PartialEq)]
pub struct ItemOutcome {
    /// Canonical name the caller asked for
    pub requested: String,
    /// Region whose file this item is; differs from `requested` after fan-out
    pub region: String,
    pub format: FormatTag,
    pub url: Option<Url>,
    /// Local file path; `None` when there is no file to fetch
    pub path: Option<PathBuf>,
    pub status: ItemStatus,
}

impl ItemOutcome {
    pub(crate) fn new(requested: &str, target: ResolvedTarget, status: ItemStatus) -> Self {
        let path = target.url.as_ref().map(|_| target.local_path);
        Self {
            requested: requested.to_string(),
            region: target.name,
            format: target.format,
            url: target.url,
            path,
            status,
        }
    }
}

/// Outcomes of a batch in processing order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub outcomes: Vec<ItemOutcome>,
}

impl BatchReport {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn statuses(&self) -> Vec<&ItemStatus> {
        self.outcomes.iter().map(|o| &o.status).collect()
    }

    /// Paths of files present on disk after the batch
    pub fn available_paths(&self) -> Vec<&Path> {
        self.outcomes
            .iter()
            .filter(|o| o.status.is_available())
            .filter_map(|o| o.path.as_deref())
            .collect()
    }

    pub fn count(&self, predicate: impl Fn(&ItemStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| predicate(&o.status)).count()
    }

    pub fn downloaded(&self) -> usize {
        self.count(|s| *s == ItemStatus::Downloaded)
    }

    pub fn already_present(&self) -> usize {
        self.count(|s| *s == ItemStatus::AlreadyPresent)
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| *s == ItemStatus::Skipped)
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, ItemStatus::Failed(_)))
    }

    pub fn no_data(&self) -> usize {
        self.count(|s| *s == ItemStatus::NoData)
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} downloaded, {} already present, {} skipped, {} failed, {} without data",
            self.downloaded(),
            self.already_present(),
            self.skipped(),
            self.failed(),
            self.no_data()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(status: ItemStatus) -> ItemOutcome {
        let target = ResolvedTarget {
            name: "Malta".to_string(),
            format: FormatTag::OsmPbf,
            url: Some(Url::parse("https://download.geofabrik.de/europe/malta-latest.osm.pbf").unwrap()),
            local_path: PathBuf::from("/data/malta/malta-latest.osm.pbf"),
        };
        ItemOutcome::new("Malta", target, status)
    }

    #[test]
    fn test_counts_and_paths() {
        let report = BatchReport {
            outcomes: vec![
                outcome(ItemStatus::Downloaded),
                outcome(ItemStatus::Skipped),
                outcome(ItemStatus::Failed("timeout".to_string())),
                outcome(ItemStatus::AlreadyPresent),
            ],
        };

        assert_eq!(report.downloaded(), 1);
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.already_present(), 1);
        assert_eq!(report.available_paths().len(), 2);
        assert_eq!(
            report.to_string(),
            "1 downloaded, 1 already present, 1 skipped, 1 failed, 0 without data"
        );
    }

    #[test]
    fn test_no_file_means_no_path() {
        let target = ResolvedTarget {
            name: "Antarctica".to_string(),
            format: FormatTag::ShpZip,
            url: None,
            local_path: PathBuf::from("/data/antarctica-shp-zip"),
        };
        let outcome = ItemOutcome::new("Antarctica", target, ItemStatus::NoData);
        assert!(outcome.path.is_none());
        assert_eq!(outcome.status.to_string(), "no data");
    }
}
