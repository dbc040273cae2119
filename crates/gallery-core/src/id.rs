//! Asset identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single-assignment asset identifier.
///
/// Identifiers are handed out by the store's allocator and are never
/// reused, even after the asset they named has been deleted. The raw value
/// doubles as the name of the asset's storage directory.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(u64);

impl AssetId {
    /// Create an AssetId from a raw value (for deserialization/testing)
    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw u64 value
    pub fn raw(&self) -> u64 {
        self.0
    }

    /// Parse a storage directory name back into an id.
    ///
    /// Only canonical decimal names are accepted, so `007` or `+7` are
    /// treated as foreign entries rather than aliases of asset 7.
    pub fn from_dir_name(name: &str) -> Option<Self> {
        let id: u64 = name.parse().ok()?;
        if id.to_string() == name {
            Some(Self(id))
        } else {
            None
        }
    }
}

impl fmt::Debug for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetId({})", self.0)
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AssetId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}
