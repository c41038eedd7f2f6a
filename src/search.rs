//! Fuzzy search over a catalog snapshot
//!
//! Every entry is matched on its `name` and `symbol`. A field score lies in
//! `[0, 1]`: the fraction of the query that had to be edited to find it in
//! the field, plus a penalty for how far from the start of the field the
//! match begins (`start / distance`). 0 is an exact match. Fields scoring
//! above the threshold do not match.
//!
//! Matching fields are combined into one relevance value, lower is better:
//!
//! ```text
//! relevance = Π max(score, ε) ^ (weight × norm)      norm = 1 / √tokens(field)
//! ```
//!
//! so a short field matched exactly ("Bitcoin") outranks a longer field that
//! merely contains the query ("Bitcoin Cash"). Equal relevance keeps
//! snapshot order.

use crate::{
    config::EngineConfig,
    constants::{DEFAULT_MATCH_DISTANCE, DEFAULT_SEARCH_THRESHOLD},
    types::{CatalogSnapshot, MarketEntry},
};

/// Both fields weigh the same
const FIELD_WEIGHT: f64 = 0.5;

/// Matching knobs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOptions {
    /// Highest field score that still counts as a match
    pub threshold: f64,
    /// Characters from the field start at which proximity costs a full point
    pub distance: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_SEARCH_THRESHOLD,
            distance: DEFAULT_MATCH_DISTANCE,
        }
    }
}

impl From<&EngineConfig> for SearchOptions {
    fn from(config: &EngineConfig) -> Self {
        Self {
            threshold: config.search_threshold,
            distance: config.match_distance,
        }
    }
}

/// A lowercased field ready for matching
#[derive(Debug, Clone)]
struct IndexedField {
    chars: Vec<char>,
    norm: f64,
}

impl IndexedField {
    fn new(text: &str) -> Self {
        let tokens = text.split_whitespace().count().max(1) as f64;
        Self {
            chars: text.to_lowercase().chars().collect(),
            norm: (1000.0 / tokens.sqrt()).round() / 1000.0,
        }
    }
}

#[derive(Debug, Clone)]
struct IndexedRecord {
    entry: MarketEntry,
    fields: [IndexedField; 2],
}

/// One search result
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit<'a> {
    pub entry: &'a MarketEntry,
    /// Best field score in `[0, threshold]`
    pub score: f64,
    /// Combined relevance, lower ranks first
    pub relevance: f64,
}

/// Read-only fuzzy index over one snapshot's entries
///
/// Never updated in place. When the snapshot changes, build a new index.
#[derive(Debug, Clone)]
pub struct SearchIndex {
    records: Vec<IndexedRecord>,
    options: SearchOptions,
}

impl SearchIndex {
    /// Builds an index with default options
    pub fn build(entries: &[MarketEntry]) -> Self {
        Self::build_with(entries, SearchOptions::default())
    }

    /// Builds an index with explicit options
    pub fn build_with(entries: &[MarketEntry], options: SearchOptions) -> Self {
        let records = entries
            .iter()
            .map(|entry| IndexedRecord {
                fields: [IndexedField::new(&entry.name), IndexedField::new(&entry.symbol)],
                entry: entry.clone(),
            })
            .collect();

        Self { records, options }
    }

    /// Builds an index over a snapshot's entries, in snapshot order
    pub fn from_snapshot(snapshot: &CatalogSnapshot, options: SearchOptions) -> Self {
        Self::build_with(&snapshot.entries, options)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns matching entries, best match first. A blank query matches nothing.
    pub fn query(&self, text: &str) -> Vec<MarketEntry> {
        self.query_scored(text)
            .into_iter()
            .map(|hit| hit.entry.clone())
            .collect()
    }

    /// Like [`query`](Self::query) but keeps the scores
    pub fn query_scored(&self, text: &str) -> Vec<SearchHit<'_>> {
        let pattern: Vec<char> = text.trim().to_lowercase().chars().collect();
        if pattern.is_empty() {
            return Vec::new();
        }

        let mut hits: Vec<SearchHit<'_>> = self
            .records
            .iter()
            .filter_map(|record| self.score_record(&pattern, record))
            .collect();

        // sort_by is stable, ties stay in snapshot order
        hits.sort_by(|a, b| a.relevance.total_cmp(&b.relevance));
        hits
    }

    fn score_record<'a>(
        &self,
        pattern: &[char],
        record: &'a IndexedRecord,
    ) -> Option<SearchHit<'a>> {
        let mut best: Option<f64> = None;
        let mut relevance = 1.0;

        for field in &record.fields {
            let Some(score) = field_score(pattern, &field.chars, self.options.distance) else {
                continue;
            };
            if score > self.options.threshold {
                continue;
            }
            relevance *= score.max(f64::EPSILON).powf(FIELD_WEIGHT * field.norm);
            best = Some(best.map_or(score, |b: f64| b.min(score)));
        }

        best.map(|score| SearchHit {
            entry: &record.entry,
            score,
            relevance,
        })
    }
}

/// Scores `pattern` against `text`. `None` when the field is empty.
///
/// Approximate substring matching: the match may start and end anywhere in
/// `text`, each inserted, deleted or substituted character costs one error.
fn field_score(pattern: &[char], text: &[char], distance: usize) -> Option<f64> {
    if text.is_empty() {
        return None;
    }
    if pattern == text {
        return Some(0.0);
    }

    let m = pattern.len();
    let n = text.len();

    // (errors, start of match in text) per text position
    let mut prev: Vec<(usize, usize)> = (0..=n).map(|j| (0, j)).collect();
    let mut cur: Vec<(usize, usize)> = vec![(0, 0); n + 1];

    for i in 1..=m {
        cur[0] = (i, 0);
        for j in 1..=n {
            let substitution = (
                prev[j - 1].0 + usize::from(pattern[i - 1] != text[j - 1]),
                prev[j - 1].1,
            );
            let skip_pattern = (prev[j].0 + 1, prev[j].1);
            let skip_text = (cur[j - 1].0 + 1, cur[j - 1].1);
            cur[j] = substitution.min(skip_pattern).min(skip_text);
        }
        std::mem::swap(&mut prev, &mut cur);
    }

    let best = prev
        .iter()
        .map(|&(errors, start)| {
            let accuracy = errors as f64 / m as f64;
            let proximity = if distance == 0 {
                if start == 0 {
                    0.0
                } else {
                    1.0
                }
            } else {
                start as f64 / distance as f64
            };
            accuracy + proximity
        })
        .fold(f64::INFINITY, f64::min);

    Some(best.min(1.0))
}
