//! Consistency findings from an index rebuild

use gallery_core::AssetId;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// A storage inconsistency found while rebuilding the index.
///
/// These never fail a rebuild; the affected entry is left out of the index
/// and the warning is reported to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConsistencyWarning {
    /// A metadata record whose model file is missing
    OrphanedMetadata { id: AssetId, path: PathBuf },
    /// A model file without a metadata record
    OrphanedFile { id: AssetId, path: PathBuf },
    /// A metadata record that could not be parsed
    CorruptMetadata {
        id: AssetId,
        path: PathBuf,
        reason: String,
    },
    /// A temporary file left behind by an interrupted write
    StaleTempFile { path: PathBuf },
    /// Something under `assets/` that is not an asset subtree
    ForeignEntry { path: PathBuf },
}

impl ConsistencyWarning {
    /// The asset this warning concerns, if any
    pub fn asset_id(&self) -> Option<AssetId> {
        match self {
            ConsistencyWarning::OrphanedMetadata { id, .. }
            | ConsistencyWarning::OrphanedFile { id, .. }
            | ConsistencyWarning::CorruptMetadata { id, .. } => Some(*id),
            ConsistencyWarning::StaleTempFile { .. } | ConsistencyWarning::ForeignEntry { .. } => {
                None
            }
        }
    }
}

impl fmt::Display for ConsistencyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsistencyWarning::OrphanedMetadata { id, path } => write!(
                f,
                "orphaned metadata: asset {} has a record at {} but no model file",
                id,
                path.display()
            ),
            ConsistencyWarning::OrphanedFile { id, path } => write!(
                f,
                "orphaned file: asset {} has a model at {} but no metadata record",
                id,
                path.display()
            ),
            ConsistencyWarning::CorruptMetadata { id, path, reason } => write!(
                f,
                "corrupt metadata: asset {} at {}: {}",
                id,
                path.display(),
                reason
            ),
            ConsistencyWarning::StaleTempFile { path } => {
                write!(f, "stale temporary file: {}", path.display())
            }
            ConsistencyWarning::ForeignEntry { path } => {
                write!(f, "unrecognized entry in storage: {}", path.display())
            }
        }
    }
}

/// Outcome of `IndexCache::rebuild`
#[derive(Debug, Clone, Default, Serialize)]
pub struct RebuildReport {
    /// Number of assets that made it into the index
    pub indexed: usize,
    pub warnings: Vec<ConsistencyWarning>,
}

impl RebuildReport {
    /// True when storage and index are in one-to-one correspondence
    pub fn is_consistent(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Ids of orphaned model files
    pub fn orphaned_files(&self) -> Vec<AssetId> {
        self.warnings
            .iter()
            .filter_map(|w| match w {
                ConsistencyWarning::OrphanedFile { id, .. } => Some(*id),
                _ => None,
            })
            .collect()
    }

    /// Ids of orphaned metadata records
    pub fn orphaned_metadata(&self) -> Vec<AssetId> {
        self.warnings
            .iter()
            .filter_map(|w| match w {
                ConsistencyWarning::OrphanedMetadata { id, .. } => Some(*id),
                _ => None,
            })
            .collect()
    }

    /// Drop warnings that have been dealt with
    pub fn resolve(&mut self, handled: &[ConsistencyWarning]) {
        self.warnings.retain(|w| !handled.contains(w));
    }
}
