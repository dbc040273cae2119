//! Query execution against the index

use gallery_core::{Asset, TagSet};
use gallery_index::{IndexCache, IndexSnapshot};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;

/// What to order results by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Display name, case-insensitive
    Name,
    /// Upload timestamp, full precision
    UploadedAt,
    /// Number of tags
    TagCount,
    /// Sorted tag list joined with `,`, compared as a string
    Tags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// A filter plus an ordering
#[derive(Debug, Clone, PartialEq)]
pub struct AssetQuery {
    /// Every one of these tags must be on a matching asset
    pub filter_tags: TagSet,
    /// Case-insensitive substrings; each must appear in the name, the tag
    /// list or the `YYYY-MM-DD` upload date
    pub search: Vec<String>,
    pub sort_key: SortKey,
    pub direction: SortDirection,
}

impl Default for AssetQuery {
    /// Everything, newest first
    fn default() -> Self {
        Self {
            filter_tags: TagSet::new(),
            search: Vec::new(),
            sort_key: SortKey::UploadedAt,
            direction: SortDirection::Descending,
        }
    }
}

impl AssetQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tags(mut self, tags: TagSet) -> Self {
        self.filter_tags = tags;
        self
    }

    /// Add a free-text term; blank terms are ignored
    pub fn with_text(mut self, text: &str) -> Self {
        let text = text.trim();
        if !text.is_empty() {
            self.search.push(text.to_lowercase());
        }
        self
    }

    pub fn sort_by(mut self, key: SortKey, direction: SortDirection) -> Self {
        self.sort_key = key;
        self.direction = direction;
        self
    }

    /// Check whether an asset passes the filter
    pub fn matches(&self, asset: &Asset) -> bool {
        asset.tags.contains_all(&self.filter_tags)
            && self.search.iter().all(|term| matches_text(asset, term))
    }
}

/// Answers queries from index snapshots
#[derive(Debug, Clone)]
pub struct QueryEngine {
    index: Arc<IndexCache>,
}

impl QueryEngine {
    pub fn new(index: Arc<IndexCache>) -> Self {
        Self { index }
    }

    /// Assets carrying every tag in `filter_tags`, ordered by `sort_key`.
    ///
    /// Never fails: no match yields an empty vector.
    pub fn query(
        &self,
        filter_tags: &TagSet,
        sort_key: SortKey,
        direction: SortDirection,
    ) -> Vec<Asset> {
        let query = AssetQuery::new()
            .with_tags(filter_tags.clone())
            .sort_by(sort_key, direction);
        self.run(&query)
    }

    /// Run a full query
    pub fn run(&self, query: &AssetQuery) -> Vec<Asset> {
        execute_query(&self.index.snapshot(), query)
    }
}

/// Execute a query against one snapshot
pub fn execute_query(snapshot: &IndexSnapshot, query: &AssetQuery) -> Vec<Asset> {
    let mut results: Vec<Asset> = snapshot
        .iter()
        .filter(|a| query.matches(a))
        .cloned()
        .collect();

    results.sort_by(|a, b| {
        let primary = compare_by(a, b, query.sort_key);
        let primary = match query.direction {
            SortDirection::Ascending => primary,
            SortDirection::Descending => primary.reverse(),
        };
        // Ties always fall back to ascending id
        primary.then_with(|| a.id.cmp(&b.id))
    });

    results
}

fn compare_by(a: &Asset, b: &Asset, key: SortKey) -> Ordering {
    match key {
        SortKey::Name => a
            .display_name
            .chars()
            .flat_map(char::to_lowercase)
            .cmp(b.display_name.chars().flat_map(char::to_lowercase)),
        SortKey::UploadedAt => a.uploaded_at.cmp(&b.uploaded_at),
        SortKey::TagCount => a.tags.len().cmp(&b.tags.len()),
        SortKey::Tags => a.tags.joined().cmp(&b.tags.joined()),
    }
}

/// `term` must already be lower-case
fn matches_text(asset: &Asset, term: &str) -> bool {
    asset.display_name.to_lowercase().contains(term)
        || asset.tags.joined().contains(term)
        || asset.upload_date().contains(term)
}
