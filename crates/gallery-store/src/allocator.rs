//! Collision-free asset identifier allocation

use crate::atomic::write_atomic;
use crate::layout::StorageLayout;
use gallery_core::{AssetId, GalleryError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

const WATERMARK_FILE: &str = "allocator.toml";

const FIRST_ID: u64 = 1;

/// Exclusive upper bound of the id space. TOML integers are signed, so the
/// watermark must fit in an `i64`.
const ID_LIMIT: u64 = i64::MAX as u64;

#[derive(Debug, Serialize, Deserialize)]
struct Watermark {
    next: u64,
}

/// Hands out asset ids that are unique for the lifetime of a storage root.
///
/// The next free id is persisted in `allocator.toml` before an id is
/// returned, so ids of deleted assets are not reissued after a restart. On
/// open the counter is also raised above every id present under `assets/`,
/// which covers roots whose watermark was lost.
#[derive(Debug)]
pub struct IdentifierAllocator {
    next: Mutex<u64>,
    watermark_path: PathBuf,
}

impl IdentifierAllocator {
    /// Open the allocator for a storage root
    pub fn open(layout: &StorageLayout) -> Result<Self> {
        let watermark_path = layout.root().join(WATERMARK_FILE);
        let persisted = Self::read_watermark(&watermark_path)?;
        let scanned = layout
            .scan()?
            .max_id()
            .map(|id| id.raw().saturating_add(1))
            .unwrap_or(FIRST_ID);

        let next = persisted
            .unwrap_or(FIRST_ID)
            .max(scanned)
            .clamp(FIRST_ID, ID_LIMIT);
        tracing::debug!(next, "identifier allocator ready");

        Ok(Self {
            next: Mutex::new(next),
            watermark_path,
        })
    }

    /// Allocate a fresh id.
    ///
    /// Fails with `AllocationExhausted` once the id space is used up, and
    /// with `WriteFailure` if the watermark cannot be persisted (no id is
    /// consumed in that case).
    pub fn allocate(&self) -> Result<AssetId> {
        let mut next = self.next.lock().unwrap_or_else(PoisonError::into_inner);
        if *next >= ID_LIMIT {
            return Err(GalleryError::AllocationExhausted);
        }

        let id = *next;
        self.write_watermark(id + 1)?;
        *next = id + 1;
        Ok(AssetId::from_raw(id))
    }

    /// Read the persisted watermark.
    ///
    /// A missing file means a fresh root. A watermark that does not parse is
    /// ignored with a warning and the storage scan decides alone; that can
    /// reissue the id of the most recently deleted asset.
    fn read_watermark(path: &Path) -> Result<Option<u64>> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(GalleryError::ReadFailure {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        match toml::from_str::<Watermark>(&content) {
            Ok(w) => Ok(Some(w.next)),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "ignoring unreadable id watermark, falling back to storage scan"
                );
                Ok(None)
            }
        }
    }

    fn write_watermark(&self, next: u64) -> Result<()> {
        let content = toml::to_string(&Watermark { next })?;
        write_atomic(&self.watermark_path, content.as_bytes()).map_err(|source| {
            GalleryError::WriteFailure {
                path: self.watermark_path.clone(),
                source,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_layout() -> (PathBuf, StorageLayout) {
        let root = std::env::temp_dir().join(format!("gallery_alloc_test_{}", uuid::Uuid::new_v4()));
        let layout = StorageLayout::open(&root).unwrap();
        (root, layout)
    }

    #[test]
    fn test_allocate_is_unique_and_increasing() {
        let (root, layout) = temp_layout();
        let alloc = IdentifierAllocator::open(&layout).unwrap();

        let a = alloc.allocate().unwrap();
        let b = alloc.allocate().unwrap();
        assert_eq!(a, AssetId::from_raw(1));
        assert!(b > a);

        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_ids_survive_restart() {
        let (root, layout) = temp_layout();
        let first = IdentifierAllocator::open(&layout).unwrap();
        first.allocate().unwrap();
        let last = first.allocate().unwrap();
        drop(first);

        // Nothing was written under assets/, only the watermark remembers
        let reopened = IdentifierAllocator::open(&layout).unwrap();
        assert!(reopened.allocate().unwrap() > last);

        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_seeds_above_existing_subtrees() {
        let (root, layout) = temp_layout();
        fs::create_dir_all(layout.asset_dir(AssetId::from_raw(41))).unwrap();

        let alloc = IdentifierAllocator::open(&layout).unwrap();
        assert_eq!(alloc.allocate().unwrap(), AssetId::from_raw(42));

        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_corrupt_watermark_falls_back_to_scan() {
        let (root, layout) = temp_layout();
        fs::write(root.join(WATERMARK_FILE), "next = \"many\"").unwrap();
        fs::create_dir_all(layout.asset_dir(AssetId::from_raw(5))).unwrap();

        let alloc = IdentifierAllocator::open(&layout).unwrap();
        assert_eq!(alloc.allocate().unwrap(), AssetId::from_raw(6));

        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_unreadable_watermark_fails_open() {
        let (root, layout) = temp_layout();
        // A directory in place of the file reads as an I/O error, not as absent
        fs::create_dir_all(root.join(WATERMARK_FILE)).unwrap();

        let err = IdentifierAllocator::open(&layout).unwrap_err();
        assert!(matches!(err, GalleryError::ReadFailure { ref path, .. } if path.ends_with(WATERMARK_FILE)));

        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_exhaustion() {
        let (root, layout) = temp_layout();
        let alloc = IdentifierAllocator {
            next: Mutex::new(ID_LIMIT - 1),
            watermark_path: layout.root().join(WATERMARK_FILE),
        };

        assert_eq!(alloc.allocate().unwrap(), AssetId::from_raw(ID_LIMIT - 1));
        assert!(matches!(
            alloc.allocate(),
            Err(GalleryError::AllocationExhausted)
        ));

        fs::remove_dir_all(&root).ok();
    }
}
