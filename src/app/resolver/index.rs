//! Normalized name lookup
//!
//! Maps lower-cased, punctuation-insensitive variants of every region name
//! (and a few well-known aliases) to the canonical name.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::app::catalogue::Catalogue;
use crate::app::models::DataSource;

const GEOFABRIK_ALIASES: &[(&str, &str)] = &[
    ("us", "United States of America"),
    ("usa", "United States of America"),
    ("united states", "United States of America"),
];

/// Normalized variant -> canonical region name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NameIndex {
    keys: BTreeMap<String, String>,
    names: Vec<String>,
}

impl NameIndex {
    /// Index every region of the catalogue plus the source's aliases
    pub fn build(catalogue: &Catalogue) -> Self {
        let mut index = Self::default();
        for name in catalogue.names() {
            index.insert(name);
        }

        let aliases: &[(&str, &str)] = match catalogue.source() {
            DataSource::Geofabrik => GEOFABRIK_ALIASES,
            DataSource::Bbbike => &[],
        };
        for (alias, target) in aliases {
            if catalogue.contains(target) {
                index
                    .keys
                    .entry(Self::normalize(alias))
                    .or_insert_with(|| target.to_string());
            }
        }

        index
    }

    fn insert(&mut self, name: &str) {
        self.names.push(name.to_string());
        for key in Self::variants(name) {
            // First registered name keeps a shared variant
            self.keys.entry(key).or_insert_with(|| name.to_string());
        }
    }

    /// Lower-case, treat punctuation as word breaks, collapse whitespace
    pub fn normalize(text: &str) -> String {
        text.chars()
            .flat_map(|c| {
                let c = if c.is_alphanumeric() { c } else { ' ' };
                c.to_lowercase()
            })
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn variants(text: &str) -> Vec<String> {
        let spaced = Self::normalize(text);
        let compact = spaced.replace(' ', "");
        if compact == spaced {
            vec![spaced]
        } else {
            vec![spaced, compact]
        }
    }

    /// Canonical name whose variant matches `input`
    pub fn lookup(&self, input: &str) -> Option<&str> {
        Self::variants(input)
            .iter()
            .find_map(|key| self.keys.get(key))
            .map(String::as_str)
    }

    /// Candidate pool for fuzzy matching, in catalogue order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::catalogue::Region;
    use url::Url;

    fn catalogue(source: DataSource, names: &[&str]) -> Catalogue {
        let root = Url::parse(source.root_url()).unwrap();
        let regions = names.iter().map(|n| Region::new(*n, None)).collect();
        Catalogue::from_regions(
            source,
            root,
            names.iter().map(|n| n.to_string()).collect(),
            regions,
        )
    }

    #[test]
    fn test_normalize() {
        assert_eq!(NameIndex::normalize("  Great-Britain "), "great britain");
        assert_eq!(NameIndex::normalize("Baden-Württemberg"), "baden württemberg");
        assert_eq!(NameIndex::normalize("Isle_of  Man"), "isle of man");
    }

    #[test]
    fn test_lookup_variants() {
        let index = NameIndex::build(&catalogue(
            DataSource::Geofabrik,
            &["Great Britain", "Isle of Man"],
        ));

        assert_eq!(index.lookup("great britain"), Some("Great Britain"));
        assert_eq!(index.lookup("GREAT-BRITAIN"), Some("Great Britain"));
        assert_eq!(index.lookup("greatbritain"), Some("Great Britain"));
        assert_eq!(index.lookup("isle_of_man"), Some("Isle of Man"));
        assert_eq!(index.lookup("britain"), None);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_aliases_only_for_present_targets() {
        let with_us = NameIndex::build(&catalogue(
            DataSource::Geofabrik,
            &["United States of America", "Canada"],
        ));
        assert_eq!(with_us.lookup("USA"), Some("United States of America"));
        assert_eq!(with_us.lookup("us"), Some("United States of America"));

        let without_us = NameIndex::build(&catalogue(DataSource::Geofabrik, &["Canada"]));
        assert_eq!(without_us.lookup("usa"), None);
    }
}
