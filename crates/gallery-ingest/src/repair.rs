//! Cleanup of inconsistencies found by a rebuild

use gallery_core::ContentRef;
use gallery_index::{ConsistencyWarning, IndexCache};
use gallery_store::{FileStore, MetadataStore, StorageLayout};
use serde::Serialize;

/// What a repair pass did with each warning
#[derive(Debug, Clone, Default, Serialize)]
pub struct RepairSummary {
    pub removed: Vec<ConsistencyWarning>,
    /// Left in place: corrupt records and foreign entries need a human, and
    /// anything that became indexed since the report was taken is kept.
    pub skipped: Vec<ConsistencyWarning>,
}

impl RepairSummary {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.skipped.is_empty()
    }
}

pub(crate) fn apply(
    warnings: &[ConsistencyWarning],
    index: &IndexCache,
    layout: &StorageLayout,
    files: &FileStore,
    metadata: &MetadataStore,
) -> RepairSummary {
    let mut summary = RepairSummary::default();

    for warning in warnings {
        // Indexed since the report was taken
        if warning.asset_id().is_some_and(|id| index.contains(id)) {
            summary.skipped.push(warning.clone());
            continue;
        }

        let outcome = match warning {
            ConsistencyWarning::OrphanedFile { id, .. } => {
                files.remove(&ContentRef::for_id(*id)).map(|_| true)
            }
            ConsistencyWarning::OrphanedMetadata { id, .. } => metadata.remove(*id).map(|_| true),
            ConsistencyWarning::StaleTempFile { path } => layout.remove_temp_file(path),
            _ => Ok(false),
        };

        match outcome {
            Ok(true) => {
                tracing::info!("repaired: {}", warning);
                summary.removed.push(warning.clone());
            }
            Ok(false) => summary.skipped.push(warning.clone()),
            Err(e) => {
                tracing::warn!("could not repair {}: {}", warning, e);
                summary.skipped.push(warning.clone());
            }
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use gallery_core::{AssetId, ContentHash, TagSet};
    use gallery_store::MetadataRecord;
    use std::fs;

    #[test]
    fn test_indexed_assets_are_left_alone() {
        let root = std::env::temp_dir().join(format!("gallery_repair_test_{}", uuid::Uuid::new_v4()));
        let layout = StorageLayout::open(&root).unwrap();
        let files = FileStore::new(layout.clone());
        let metadata = MetadataStore::new(layout.clone());
        let index = IndexCache::new();

        files.put(AssetId::from_raw(1), b"late").unwrap();
        files.put(AssetId::from_raw(2), b"lost").unwrap();
        let report = index.rebuild(&layout, &files, &metadata).unwrap();
        assert_eq!(report.orphaned_files().len(), 2);

        // The record for 1 lands after the report was taken
        let record = MetadataRecord {
            version: 1,
            name: "late.obj".to_string(),
            uploaded_at: Utc::now(),
            tags: TagSet::new(),
            format: None,
            size: 4,
            hash: ContentHash::from_bytes(b"late"),
            extra: Default::default(),
        };
        metadata.put(AssetId::from_raw(1), &record).unwrap();
        index.upsert(record.to_asset(AssetId::from_raw(1)));

        let summary = apply(&report.warnings, &index, &layout, &files, &metadata);
        assert_eq!(summary.removed.len(), 1);
        assert_eq!(summary.removed[0].asset_id(), Some(AssetId::from_raw(2)));
        assert_eq!(summary.skipped[0].asset_id(), Some(AssetId::from_raw(1)));
        assert!(files.contains(AssetId::from_raw(1)));
        assert!(!files.contains(AssetId::from_raw(2)));

        fs::remove_dir_all(&root).ok();
    }
}
