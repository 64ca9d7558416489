//! The query description the cache keys on.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::query::filter::Filter;

/// Ranking function selected for a query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RankingMode {
    /// Phrase proximity combined with BM25.
    #[default]
    ProximityBm25,
    /// Plain BM25.
    Bm25,
    /// No ranking, every match weighs the same.
    None,
    /// Number of matched keyword occurrences.
    WordCount,
    /// A user supplied ranking expression.
    Expr(String),
}

/// Options that influence which matches a query produces and their weights.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct QueryOptions {
    /// Ranking function.
    pub ranking: RankingMode,
    /// Per-field weight overrides.
    pub field_weights: BTreeMap<String, u32>,
    /// Upper bound on matches kept by the sorter.
    pub max_matches: usize,
    /// Restrict matching to these fields (empty means all).
    pub fields: Vec<String>,
}

impl QueryOptions {
    /// Create default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the ranking mode.
    pub fn with_ranking(mut self, ranking: RankingMode) -> Self {
        self.ranking = ranking;
        self
    }

    /// Set a field weight.
    pub fn with_field_weight<S: Into<String>>(mut self, field: S, weight: u32) -> Self {
        self.field_weights.insert(field.into(), weight);
        self
    }

    /// Set the sorter bound.
    pub fn with_max_matches(mut self, max_matches: usize) -> Self {
        self.max_matches = max_matches;
        self
    }
}

/// A full-text query as seen by the cache: text, options and filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SearchQuery {
    /// Raw query text.
    pub text: String,
    /// Query options.
    pub options: QueryOptions,
    /// Filters in the order they are applied.
    pub filters: Vec<Filter>,
}

impl SearchQuery {
    /// Create a query with default options and no filters.
    pub fn new<S: Into<String>>(text: S) -> Self {
        SearchQuery {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Replace the options.
    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    /// Append a filter.
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }
}
