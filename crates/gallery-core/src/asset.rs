//! The cataloged asset and the reference to its stored model

use crate::hash::ContentHash;
use crate::id::AssetId;
use crate::tags::TagSet;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;

/// Directory under the storage root holding one subtree per asset
pub const ASSETS_DIR: &str = "assets";

/// File name of the raw model inside an asset's subtree
pub const MODEL_FILE: &str = "model";

/// Reference to an asset's stored model, derived from its id alone.
#[derive(Clone, Copy, Hash, Eq, PartialEq)]
pub struct ContentRef(AssetId);

impl ContentRef {
    pub fn for_id(id: AssetId) -> Self {
        Self(id)
    }

    /// The asset this content belongs to
    pub fn id(&self) -> AssetId {
        self.0
    }

    /// Location relative to the storage root: `assets/<id>/model`
    pub fn relative_path(&self) -> PathBuf {
        PathBuf::from(ASSETS_DIR)
            .join(self.0.to_string())
            .join(MODEL_FILE)
    }
}

impl fmt::Debug for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentRef({})", self.0)
    }
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", ASSETS_DIR, self.0, MODEL_FILE)
    }
}

impl Serialize for ContentRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A cataloged 3D model plus its metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Asset {
    pub id: AssetId,
    pub display_name: String,
    pub uploaded_at: DateTime<Utc>,
    pub tags: TagSet,
    pub content_ref: ContentRef,
    /// Lower-case file extension hint for the viewer (e.g. `obj`, `stl`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    pub size: u64,
    pub hash: ContentHash,
}

impl Asset {
    /// Upload date as `YYYY-MM-DD`
    pub fn upload_date(&self) -> String {
        self.uploaded_at.format("%Y-%m-%d").to_string()
    }
}
