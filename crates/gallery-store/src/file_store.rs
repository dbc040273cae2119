//! Identifier-keyed model file storage

use crate::atomic::{prune_empty_dir, write_atomic};
use crate::layout::StorageLayout;
use gallery_core::{AssetId, ContentRef, GalleryError, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

/// Raw model storage.
///
/// Stores each model at `assets/<id>/model`. Content is write-once: a second
/// `put` for the same id is rejected, and nothing edits a model in place.
#[derive(Debug, Clone)]
pub struct FileStore {
    layout: StorageLayout,
}

impl FileStore {
    pub fn new(layout: StorageLayout) -> Self {
        Self { layout }
    }

    /// Absolute path of a stored model, for collaborators that want a file handle
    pub fn path(&self, content: &ContentRef) -> PathBuf {
        self.layout.root().join(content.relative_path())
    }

    /// Store the bytes of a new asset
    pub fn put(&self, id: AssetId, bytes: &[u8]) -> Result<ContentRef> {
        let content = ContentRef::for_id(id);
        let dest = self.path(&content);

        if dest.exists() {
            return Err(GalleryError::AlreadyExists(id));
        }

        write_atomic(&dest, bytes).map_err(|source| GalleryError::WriteFailure {
            path: dest.clone(),
            source,
        })?;

        tracing::debug!(asset = %id, bytes = bytes.len(), "stored model");
        Ok(content)
    }

    /// Read the full content of a stored model
    pub fn get(&self, content: &ContentRef) -> Result<Vec<u8>> {
        let path = self.path(content);
        fs::read(&path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => GalleryError::NotFound(format!("content {}", content)),
            _ => GalleryError::ReadFailure { path, source },
        })
    }

    /// Size in bytes of a stored model
    pub fn size(&self, content: &ContentRef) -> Result<u64> {
        let path = self.path(content);
        fs::metadata(&path)
            .map(|m| m.len())
            .map_err(|source| match source.kind() {
                ErrorKind::NotFound => GalleryError::NotFound(format!("content {}", content)),
                _ => GalleryError::ReadFailure { path, source },
            })
    }

    /// Check whether a model is stored for `id`
    pub fn contains(&self, id: AssetId) -> bool {
        self.path(&ContentRef::for_id(id)).is_file()
    }

    /// Remove a stored model. Removing an absent model succeeds.
    pub fn remove(&self, content: &ContentRef) -> Result<()> {
        let path = self.path(content);
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(source) => return Err(GalleryError::RemoveFailure { path, source }),
        }

        prune_empty_dir(&self.layout.asset_dir(content.id()));
        Ok(())
    }

    /// List all ids that have a stored model
    pub fn list_ids(&self) -> Result<Vec<AssetId>> {
        Ok(self
            .layout
            .scan()?
            .entries
            .into_iter()
            .filter(|e| e.has_model)
            .map(|e| e.id)
            .collect())
    }
}
