//! Per-asset metadata records
//!
//! Records are TOML files at `assets/<id>/meta.toml`:
//!
//! ```toml
//! [asset]
//! version = 1
//! name = "tavern_chair.obj"
//! uploaded_at = "2024-03-09T17:45:00.123456Z"
//! tags = ["furniture", "medieval"]
//! format = "obj"
//! size = 48213
//! hash = "sha256:..."
//! ```
//!
//! Unknown keys are kept in [`MetadataRecord::extra`] and written back
//! unchanged, so an edit by an older build never drops a newer writer's data.

use crate::atomic::{prune_empty_dir, write_atomic};
use crate::layout::StorageLayout;
use chrono::{DateTime, Utc};
use gallery_core::{Asset, AssetId, ContentHash, ContentRef, GalleryError, Result, TagSet};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

/// File name of the metadata record inside an asset's subtree
pub const METADATA_FILE: &str = "meta.toml";

const RECORD_VERSION: u32 = 1;

fn current_version() -> u32 {
    RECORD_VERSION
}

/// Persisted metadata of one asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    #[serde(default = "current_version")]
    pub version: u32,
    pub name: String,
    pub uploaded_at: DateTime<Utc>,
    #[serde(default)]
    pub tags: TagSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default)]
    pub size: u64,
    pub hash: ContentHash,
    /// Keys this build does not know about
    #[serde(flatten)]
    pub extra: toml::Table,
}

impl MetadataRecord {
    /// Capture the persisted part of an asset
    pub fn from_asset(asset: &Asset) -> Self {
        Self {
            version: RECORD_VERSION,
            name: asset.display_name.clone(),
            uploaded_at: asset.uploaded_at,
            tags: asset.tags.clone(),
            format: asset.format.clone(),
            size: asset.size,
            hash: asset.hash,
            extra: toml::Table::new(),
        }
    }

    /// Materialize the asset this record describes
    pub fn to_asset(&self, id: AssetId) -> Asset {
        Asset {
            id,
            display_name: self.name.clone(),
            uploaded_at: self.uploaded_at,
            tags: self.tags.clone(),
            content_ref: ContentRef::for_id(id),
            format: self.format.clone(),
            size: self.size,
            hash: self.hash,
        }
    }
}

/// TOML file format for metadata records
#[derive(Serialize, Deserialize)]
struct MetadataFile {
    asset: MetadataRecord,
}

/// A record on disk that could not be parsed
#[derive(Debug, Clone, PartialEq)]
pub struct CorruptRecord {
    pub id: AssetId,
    pub path: PathBuf,
    pub reason: String,
}

/// Everything `list_all` found
#[derive(Debug, Clone, Default)]
pub struct ListedRecords {
    /// Parsed records, sorted by id
    pub records: Vec<(AssetId, MetadataRecord)>,
    pub corrupt: Vec<CorruptRecord>,
}

/// Structured metadata storage, one TOML record per asset
#[derive(Debug, Clone)]
pub struct MetadataStore {
    layout: StorageLayout,
}

impl MetadataStore {
    pub fn new(layout: StorageLayout) -> Self {
        Self { layout }
    }

    pub fn path(&self, id: AssetId) -> PathBuf {
        self.layout.asset_dir(id).join(METADATA_FILE)
    }

    /// Create or atomically replace the record for `id`
    pub fn put(&self, id: AssetId, record: &MetadataRecord) -> Result<()> {
        let path = self.path(id);
        let content = toml::to_string_pretty(&MetadataFile {
            asset: record.clone(),
        })?;

        write_atomic(&path, content.as_bytes())
            .map_err(|source| GalleryError::WriteFailure { path, source })?;

        tracing::debug!(asset = %id, "wrote metadata");
        Ok(())
    }

    /// Load the record for `id`
    pub fn get(&self, id: AssetId) -> Result<MetadataRecord> {
        let path = self.path(id);
        let content = fs::read_to_string(&path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => GalleryError::NotFound(format!("metadata for asset {}", id)),
            _ => GalleryError::ReadFailure {
                path: path.clone(),
                source,
            },
        })?;

        let file: MetadataFile =
            toml::from_str(&content).map_err(|e| GalleryError::CorruptMetadata {
                path,
                reason: e.to_string(),
            })?;
        Ok(file.asset)
    }

    /// Check whether a record exists for `id`
    pub fn contains(&self, id: AssetId) -> bool {
        self.path(id).is_file()
    }

    /// Remove the record for `id`. Removing an absent record succeeds.
    pub fn remove(&self, id: AssetId) -> Result<()> {
        let path = self.path(id);
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(source) => return Err(GalleryError::RemoveFailure { path, source }),
        }

        prune_empty_dir(&self.layout.asset_dir(id));
        Ok(())
    }

    /// Load every persisted record.
    ///
    /// Unparsable records are returned separately instead of failing the
    /// whole listing; I/O errors on the directory itself still fail.
    pub fn list_all(&self) -> Result<ListedRecords> {
        let mut listed = ListedRecords::default();

        for entry in self.layout.scan()?.entries {
            if !entry.has_metadata {
                continue;
            }
            match self.get(entry.id) {
                Ok(record) => listed.records.push((entry.id, record)),
                Err(GalleryError::CorruptMetadata { path, reason }) => {
                    listed.corrupt.push(CorruptRecord {
                        id: entry.id,
                        path,
                        reason,
                    });
                }
                // Removed between scan and read
                Err(GalleryError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }

        Ok(listed)
    }
}
