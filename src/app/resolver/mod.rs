//! Region name resolution and subregion expansion
//!
//! `resolve` turns arbitrary user input into a canonical region name, trying
//! in order an exact hit, a normalized lookup, and finally the best fuzzy
//! candidate. The acceptance cutoff defaults to zero, so any non-blank input
//! resolves to some region of a non-empty catalogue; raise
//! `min_similarity` to reject weak matches instead.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::app::catalogue::Catalogue;
use crate::app::models::DataSource;
use crate::constants::resolver;
use crate::errors::{ResolveError, ResolveResult};

pub mod index;

pub use index::NameIndex;

/// Scores how well a candidate name matches a query, in `0.0..=1.0`
pub trait SimilarityScorer: Send + Sync + fmt::Debug {
    fn score(&self, query: &str, candidate: &str) -> f64;
}

/// Normalized Levenshtein over the whole name and its longer words
#[derive(Debug, Default, Clone, Copy)]
pub struct LevenshteinScorer;

impl SimilarityScorer for LevenshteinScorer {
    fn score(&self, query: &str, candidate: &str) -> f64 {
        let query = NameIndex::normalize(query);
        let candidate = NameIndex::normalize(candidate);

        let mut best = strsim::normalized_levenshtein(&query, &candidate);
        for token in candidate.split(' ') {
            if token.chars().count() < 3 {
                continue;
            }
            best = best.max(strsim::normalized_levenshtein(&query, token));
        }
        best
    }
}

/// Resolver tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Fuzzy matches scoring below this are rejected
    pub min_similarity: f64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            min_similarity: resolver::DEFAULT_MIN_SIMILARITY,
        }
    }
}

/// How an input was matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchKind {
    /// Input (or its path stem) is a canonical name
    Exact,
    /// Input matches a normalized variant or alias
    Normalized,
    /// Best candidate by similarity score
    Fuzzy,
}

/// Outcome of resolving one input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub name: String,
    pub kind: MatchKind,
    pub score: f64,
}

/// Resolves names against one frozen catalogue
#[derive(Debug, Clone)]
pub struct Resolver {
    catalogue: Arc<Catalogue>,
    index: Arc<NameIndex>,
    scorer: Arc<dyn SimilarityScorer>,
    config: ResolverConfig,
}

impl Resolver {
    pub fn new(catalogue: Arc<Catalogue>, index: Arc<NameIndex>, config: ResolverConfig) -> Self {
        Self {
            catalogue,
            index,
            scorer: Arc::new(LevenshteinScorer),
            config,
        }
    }

    pub fn with_scorer(mut self, scorer: Arc<dyn SimilarityScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn catalogue(&self) -> &Arc<Catalogue> {
        &self.catalogue
    }

    /// Resolve input to a canonical region name
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::NameNotResolvable` for blank input, an empty
    /// catalogue, or a best fuzzy score below `min_similarity`.
    pub fn resolve(&self, input: &str) -> ResolveResult<String> {
        self.resolve_detailed(input).map(|resolution| resolution.name)
    }

    /// Resolve input and report how it matched
    ///
    /// # Errors
    ///
    /// See [`Resolver::resolve`].
    pub fn resolve_detailed(&self, input: &str) -> ResolveResult<Resolution> {
        let trimmed = input.trim();
        let not_resolvable = |reason: String| ResolveError::NameNotResolvable {
            input: input.to_string(),
            reason,
        };

        if trimmed.is_empty() {
            return Err(not_resolvable("input is blank".to_string()));
        }
        if self.catalogue.is_empty() {
            return Err(not_resolvable("the catalogue is empty".to_string()));
        }

        if self.catalogue.contains(trimmed) {
            return Ok(Resolution {
                name: trimmed.to_string(),
                kind: MatchKind::Exact,
                score: 1.0,
            });
        }

        let key = match_key(trimmed);
        if self.catalogue.contains(&key) {
            return Ok(Resolution {
                name: key,
                kind: MatchKind::Exact,
                score: 1.0,
            });
        }

        if let Some(name) = self.index.lookup(&key) {
            return Ok(Resolution {
                name: name.to_string(),
                kind: MatchKind::Normalized,
                score: 1.0,
            });
        }

        match self.best_match(&key) {
            Some((name, score)) if score >= self.config.min_similarity => {
                debug!("Resolved '{}' to '{}' (similarity {:.2})", input, name, score);
                Ok(Resolution {
                    name,
                    kind: MatchKind::Fuzzy,
                    score,
                })
            }
            Some((name, score)) => Err(not_resolvable(format!(
                "closest region '{}' scored {:.2}, below the {:.2} cutoff",
                name, score, self.config.min_similarity
            ))),
            None => Err(not_resolvable("no candidate names".to_string())),
        }
    }

    /// Highest scoring candidate; ties keep catalogue order
    pub fn best_match(&self, query: &str) -> Option<(String, f64)> {
        let mut best: Option<(&str, f64)> = None;
        for candidate in self.index.names() {
            let score = self.scorer.score(query, candidate);
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((candidate, score));
            }
        }
        best.map(|(name, score)| (name.to_string(), score))
    }

    /// Subregions of a canonical region
    ///
    /// Shallow expansion returns the direct children, or the region itself
    /// when it is a leaf. Deep expansion replaces every non-leaf child by its
    /// own expansion until only leaves remain; each name is expanded at most
    /// once and each leaf reported once, in first-seen order. Unknown names
    /// expand to nothing.
    pub fn expand(&self, name: &str, deep: bool) -> Vec<String> {
        let Some(region) = self.catalogue.get(name) else {
            return Vec::new();
        };
        if region.is_leaf() {
            return vec![region.name.clone()];
        }
        if !deep {
            return region.children.clone();
        }

        let mut leaves = Vec::new();
        let mut emitted: HashSet<&str> = HashSet::new();
        let mut expanded: HashSet<&str> = HashSet::from([region.name.as_str()]);
        let mut pending: Vec<&str> = region.children.iter().rev().map(String::as_str).collect();

        while let Some(current) = pending.pop() {
            let Some(node) = self.catalogue.get(current) else {
                continue;
            };
            if node.is_leaf() {
                if emitted.insert(current) {
                    leaves.push(current.to_string());
                }
            } else if expanded.insert(current) {
                pending.extend(node.children.iter().rev().map(String::as_str));
            }
        }

        leaves
    }
}

/// Reduce a path, URL or file name to the region stem it names
///
/// `https://download.geofabrik.de/europe/great-britain-latest.osm.pbf`
/// becomes `great-britain`. Plain names pass through unchanged.
pub fn match_key(input: &str) -> String {
    let trimmed = input.trim();
    let is_path = trimmed.contains('/') || trimmed.contains('\\') || has_known_extension(trimmed);
    if !is_path {
        return trimmed.to_string();
    }

    let segment = trimmed
        .split(['/', '\\'])
        .filter(|s| !s.is_empty())
        .last()
        .unwrap_or(trimmed);
    let mut stem = segment.split('.').next().unwrap_or(segment);

    loop {
        let stripped = resolver::FILE_STEM_SUFFIXES
            .iter()
            .find_map(|suffix| stem.strip_suffix(suffix));
        match stripped {
            Some(shorter) if !shorter.is_empty() => stem = shorter,
            _ => break,
        }
    }

    stem.to_string()
}

fn has_known_extension(input: &str) -> bool {
    let lowered = input.to_lowercase();
    lowered.ends_with(".html")
        || DataSource::ALL
            .iter()
            .flat_map(|source| source.formats())
            .any(|format| lowered.ends_with(format.extension()))
}
