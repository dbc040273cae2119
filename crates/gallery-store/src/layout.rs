//! Storage root layout and directory scanning

use crate::atomic::is_temp_name;
use crate::metadata::METADATA_FILE;
use gallery_core::{AssetId, GalleryError, Result, ASSETS_DIR, MODEL_FILE};
use std::fs;
use std::path::{Path, PathBuf};

/// Paths inside one gallery storage root
#[derive(Debug, Clone)]
pub struct StorageLayout {
    root: PathBuf,
}

/// What a scan found in one asset subtree
#[derive(Debug, Clone, PartialEq)]
pub struct AssetEntry {
    pub id: AssetId,
    pub dir: PathBuf,
    pub has_model: bool,
    pub has_metadata: bool,
    /// Temporary files left behind by interrupted writes
    pub temp_files: Vec<PathBuf>,
}

/// Result of scanning the `assets/` directory
#[derive(Debug, Clone, Default)]
pub struct StorageScan {
    /// Asset subtrees, sorted by id
    pub entries: Vec<AssetEntry>,
    /// Entries under `assets/` that are not asset subtrees
    pub foreign: Vec<PathBuf>,
}

impl StorageScan {
    /// Largest id that has a subtree on disk, orphans included
    pub fn max_id(&self) -> Option<AssetId> {
        self.entries.iter().map(|e| e.id).max()
    }
}

impl StorageLayout {
    /// Open a storage root, creating `assets/` if needed
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let layout = Self {
            root: root.as_ref().to_path_buf(),
        };
        let assets = layout.assets_dir();
        fs::create_dir_all(&assets).map_err(|source| GalleryError::WriteFailure {
            path: assets,
            source,
        })?;
        Ok(layout)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.root.join(ASSETS_DIR)
    }

    pub fn asset_dir(&self, id: AssetId) -> PathBuf {
        self.assets_dir().join(id.to_string())
    }

    /// Walk `assets/` and report what each subtree contains.
    ///
    /// Read-only: nothing is repaired or removed here.
    pub fn scan(&self) -> Result<StorageScan> {
        let mut scan = StorageScan::default();
        let assets = self.assets_dir();

        if !assets.exists() {
            return Ok(scan);
        }

        for entry in fs::read_dir(&assets).map_err(|e| read_failure(&assets, e))? {
            let entry = entry.map_err(|e| read_failure(&assets, e))?;
            let path = entry.path();
            let name = entry.file_name();
            let id = name.to_str().and_then(AssetId::from_dir_name);

            match id {
                Some(id) if path.is_dir() => {
                    scan.entries.push(Self::scan_asset_dir(id, path)?);
                }
                _ => scan.foreign.push(path),
            }
        }

        scan.entries.sort_by_key(|e| e.id);
        scan.foreign.sort();
        Ok(scan)
    }

    fn scan_asset_dir(id: AssetId, dir: PathBuf) -> Result<AssetEntry> {
        let mut entry = AssetEntry {
            id,
            dir: dir.clone(),
            has_model: false,
            has_metadata: false,
            temp_files: Vec::new(),
        };

        let files = fs::read_dir(&dir).map_err(|e| read_failure(&dir, e))?;

        for file in files.flatten() {
            let name = file.file_name();
            let name = name.to_string_lossy();
            if name == MODEL_FILE {
                entry.has_model = true;
            } else if name == METADATA_FILE {
                entry.has_metadata = true;
            } else if is_temp_name(&name) {
                entry.temp_files.push(file.path());
            }
        }

        entry.temp_files.sort();
        Ok(entry)
    }

    /// Delete an abandoned temp file reported by `scan`.
    ///
    /// Returns `false` without touching anything if `path` is not a temp
    /// file inside an asset subtree.
    pub fn remove_temp_file(&self, path: &Path) -> Result<bool> {
        let is_temp = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(is_temp_name);
        if !is_temp || !path.starts_with(self.assets_dir()) {
            return Ok(false);
        }

        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
            Err(source) => Err(GalleryError::RemoveFailure {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

fn read_failure(path: &Path, source: std::io::Error) -> GalleryError {
    GalleryError::ReadFailure {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root() -> PathBuf {
        std::env::temp_dir().join(format!("gallery_layout_test_{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_open_creates_assets_dir() {
        let root = temp_root();
        let layout = StorageLayout::open(&root).unwrap();
        assert!(layout.assets_dir().is_dir());
        assert_eq!(
            layout.asset_dir(AssetId::from_raw(3)),
            root.join("assets").join("3")
        );
        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_scan_classifies_entries() {
        let root = temp_root();
        let layout = StorageLayout::open(&root).unwrap();

        let complete = layout.asset_dir(AssetId::from_raw(1));
        fs::create_dir_all(&complete).unwrap();
        fs::write(complete.join(MODEL_FILE), b"v 0 0 0").unwrap();
        fs::write(complete.join(METADATA_FILE), b"[asset]").unwrap();

        let half = layout.asset_dir(AssetId::from_raw(10));
        fs::create_dir_all(&half).unwrap();
        fs::write(half.join(MODEL_FILE), b"v 0 0 0").unwrap();
        fs::write(half.join(".meta.toml.abc.tmp"), b"[ass").unwrap();

        fs::write(layout.assets_dir().join("notes.txt"), b"hi").unwrap();

        let scan = layout.scan().unwrap();
        assert_eq!(scan.entries.len(), 2);
        assert_eq!(scan.entries[0].id, AssetId::from_raw(1));
        assert!(scan.entries[0].has_model && scan.entries[0].has_metadata);
        assert!(scan.entries[1].has_model && !scan.entries[1].has_metadata);
        assert_eq!(scan.entries[1].temp_files.len(), 1);
        assert_eq!(scan.foreign.len(), 1);
        assert_eq!(scan.max_id(), Some(AssetId::from_raw(10)));

        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_remove_temp_file_only_touches_temps() {
        let root = temp_root();
        let layout = StorageLayout::open(&root).unwrap();
        let dir = layout.asset_dir(AssetId::from_raw(2));
        fs::create_dir_all(&dir).unwrap();
        let temp = dir.join(".model.0123.tmp");
        let model = dir.join(MODEL_FILE);
        fs::write(&temp, b"half").unwrap();
        fs::write(&model, b"whole").unwrap();

        assert!(!layout.remove_temp_file(&model).unwrap());
        assert!(model.exists());
        assert!(layout.remove_temp_file(&temp).unwrap());
        assert!(!temp.exists());

        fs::remove_dir_all(&root).ok();
    }
}
