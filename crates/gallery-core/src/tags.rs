//! Case-normalized tag sets

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A set of asset tags.
///
/// Tags are trimmed and lower-cased on the way in, so `"Cat"`, `" cat"` and
/// `"CAT"` are the same tag. Empty tags are dropped. Iteration is in sorted
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct TagSet(BTreeSet<String>);

impl TagSet {
    /// Create an empty tag set
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a comma-separated list such as `"furniture, Medieval,,chair"`
    pub fn parse(text: &str) -> Self {
        text.split(',').collect()
    }

    /// Normalize a single tag, returning `None` if nothing is left
    pub fn normalize(tag: &str) -> Option<String> {
        let tag = tag.trim();
        if tag.is_empty() {
            None
        } else {
            Some(tag.to_lowercase())
        }
    }

    /// Insert a tag, returning whether it was new
    pub fn insert(&mut self, tag: &str) -> bool {
        match Self::normalize(tag) {
            Some(tag) => self.0.insert(tag),
            None => false,
        }
    }

    /// Check whether a tag is present (case-insensitive)
    pub fn contains(&self, tag: &str) -> bool {
        Self::normalize(tag)
            .map(|t| self.0.contains(&t))
            .unwrap_or(false)
    }

    /// Check whether every tag of `other` is present in this set
    pub fn contains_all(&self, other: &TagSet) -> bool {
        other.0.is_subset(&self.0)
    }

    /// Iterate over tags in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|s| s.as_str())
    }

    /// Tags joined with `,` in sorted order
    pub fn joined(&self) -> String {
        self.iter().collect::<Vec<_>>().join(",")
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for TagSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = TagSet::new();
        for tag in iter {
            set.insert(tag.as_ref());
        }
        set
    }
}

impl From<Vec<String>> for TagSet {
    fn from(tags: Vec<String>) -> Self {
        tags.into_iter().collect()
    }
}

impl From<TagSet> for Vec<String> {
    fn from(tags: TagSet) -> Self {
        tags.0.into_iter().collect()
    }
}

impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.iter().collect::<Vec<_>>().join(", "))
    }
}
