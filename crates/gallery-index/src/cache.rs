//! Snapshot-friendly in-memory index

use crate::report::{ConsistencyWarning, RebuildReport};
use gallery_core::{Asset, AssetId, ContentRef, Result};
use gallery_store::{FileStore, MetadataStore, StorageLayout};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, PoisonError, RwLock};

type AssetMap = BTreeMap<AssetId, Asset>;

/// In-memory mirror of every cataloged asset, keyed by id.
///
/// Readers take a snapshot (an `Arc` clone under a short read lock) and
/// iterate it without holding any lock. Writers copy the map if a snapshot
/// is still alive, mutate the copy and publish it, so a reader always sees a
/// whole pre- or post-mutation state.
///
/// Writers are expected to be serialized by the caller; the lock here only
/// guards publication.
#[derive(Debug, Default)]
pub struct IndexCache {
    assets: RwLock<Arc<AssetMap>>,
}

/// Immutable point-in-time view of the index
#[derive(Debug, Clone)]
pub struct IndexSnapshot {
    assets: Arc<AssetMap>,
}

impl IndexSnapshot {
    pub fn get(&self, id: AssetId) -> Option<&Asset> {
        self.assets.get(&id)
    }

    /// Iterate in id order
    pub fn iter(&self) -> impl Iterator<Item = &Asset> {
        self.assets.values()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

impl IndexCache {
    /// Create a new empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the index with the current contents of storage.
    ///
    /// A record is indexed only if its model file exists. Everything that
    /// breaks the file/record pairing is reported as a consistency warning
    /// and logged; none of it fails the rebuild.
    pub fn rebuild(
        &self,
        layout: &StorageLayout,
        files: &FileStore,
        metadata: &MetadataStore,
    ) -> Result<RebuildReport> {
        let scan = layout.scan()?;
        let listed = metadata.list_all()?;
        let mut report = RebuildReport::default();
        let mut rebuilt = AssetMap::new();
        let mut with_record = BTreeSet::new();

        for (id, record) in listed.records {
            with_record.insert(id);
            if files.contains(id) {
                rebuilt.insert(id, record.to_asset(id));
            } else {
                report.warnings.push(ConsistencyWarning::OrphanedMetadata {
                    id,
                    path: metadata.path(id),
                });
            }
        }

        for corrupt in listed.corrupt {
            with_record.insert(corrupt.id);
            report.warnings.push(ConsistencyWarning::CorruptMetadata {
                id: corrupt.id,
                path: corrupt.path,
                reason: corrupt.reason,
            });
        }

        for id in files.list_ids()? {
            if !with_record.contains(&id) {
                report.warnings.push(ConsistencyWarning::OrphanedFile {
                    id,
                    path: files.path(&ContentRef::for_id(id)),
                });
            }
        }

        for entry in &scan.entries {
            for path in &entry.temp_files {
                report
                    .warnings
                    .push(ConsistencyWarning::StaleTempFile { path: path.clone() });
            }
        }

        for path in scan.foreign {
            report.warnings.push(ConsistencyWarning::ForeignEntry { path });
        }

        for warning in &report.warnings {
            tracing::warn!("{}", warning);
        }

        report.indexed = rebuilt.len();
        *self.assets.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(rebuilt);

        tracing::info!(
            indexed = report.indexed,
            warnings = report.warnings.len(),
            "rebuilt asset index"
        );
        Ok(report)
    }

    /// Insert or replace an asset, returning the previous entry
    pub fn upsert(&self, asset: Asset) -> Option<Asset> {
        let mut guard = self.assets.write().unwrap_or_else(PoisonError::into_inner);
        Arc::make_mut(&mut *guard).insert(asset.id, asset)
    }

    /// Remove an asset, returning it if it was present
    pub fn remove(&self, id: AssetId) -> Option<Asset> {
        let mut guard = self.assets.write().unwrap_or_else(PoisonError::into_inner);
        if !guard.contains_key(&id) {
            return None;
        }
        Arc::make_mut(&mut *guard).remove(&id)
    }

    pub fn get(&self, id: AssetId) -> Option<Asset> {
        self.snapshot().get(id).cloned()
    }

    pub fn contains(&self, id: AssetId) -> bool {
        self.snapshot().get(id).is_some()
    }

    /// Every indexed asset, in id order
    pub fn all(&self) -> Vec<Asset> {
        self.snapshot().iter().cloned().collect()
    }

    /// Take a point-in-time view without copying the assets
    pub fn snapshot(&self) -> IndexSnapshot {
        let guard = self.assets.read().unwrap_or_else(PoisonError::into_inner);
        IndexSnapshot {
            assets: Arc::clone(&*guard),
        }
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}
