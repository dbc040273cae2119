//! Asset ingestion, editing and removal

use crate::repair::{self, RepairSummary};
use crate::task::{run_blocking, run_detached};
use chrono::Utc;
use gallery_core::{Asset, AssetId, ContentHash, ContentRef, GalleryError, Result, TagSet};
use gallery_index::{IndexCache, RebuildReport};
use gallery_store::{FileStore, IdentifierAllocator, MetadataRecord, MetadataStore, StorageLayout};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

/// An asset waiting to be written
struct Draft {
    name: String,
    tags: TagSet,
    format: Option<String>,
    bytes: Vec<u8>,
}

/// Coordinates every mutation of the catalog.
///
/// Mutations are serialized by a single async lock and each one runs as its
/// own task, so an abandoned caller never leaves a half-applied change. The
/// index is only updated after both the model file and its metadata record
/// are durable.
#[derive(Debug, Clone)]
pub struct IngestionPipeline {
    layout: StorageLayout,
    allocator: Arc<IdentifierAllocator>,
    files: FileStore,
    metadata: MetadataStore,
    index: Arc<IndexCache>,
    write_lock: Arc<Mutex<()>>,
}

impl IngestionPipeline {
    pub fn new(
        layout: StorageLayout,
        allocator: Arc<IdentifierAllocator>,
        index: Arc<IndexCache>,
    ) -> Self {
        Self {
            files: FileStore::new(layout.clone()),
            metadata: MetadataStore::new(layout.clone()),
            layout,
            allocator,
            index,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn files(&self) -> &FileStore {
        &self.files
    }

    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    /// Store a new model and make it visible to queries.
    ///
    /// The format is taken from the extension of `name`, if it has one.
    pub async fn add(&self, name: &str, tags: TagSet, bytes: Vec<u8>) -> Result<Asset> {
        let draft = Draft {
            name: name.to_string(),
            format: format_from_path(Path::new(name)),
            tags,
            bytes,
        };
        let this = self.clone();
        run_detached(async move { this.ingest(draft).await }).await
    }

    /// Store a model read from a file on disk.
    ///
    /// The display name defaults to the file name.
    pub async fn add_file(&self, path: &Path, name: Option<&str>, tags: TagSet) -> Result<Asset> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| GalleryError::ReadFailure {
                path: path.to_path_buf(),
                source,
            })?;

        let name = match name {
            Some(name) => name.to_string(),
            None => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    GalleryError::InvalidContent(format!("{} has no file name", path.display()))
                })?,
        };

        let draft = Draft {
            name,
            format: format_from_path(path),
            tags,
            bytes,
        };
        let this = self.clone();
        run_detached(async move { this.ingest(draft).await }).await
    }

    /// Remove an asset from the index, then its record, then its model.
    ///
    /// Once the index entry is gone the asset is deleted as far as callers
    /// are concerned; storage cleanup failures are logged and left for the
    /// next rebuild to report.
    pub async fn delete(&self, id: AssetId) -> Result<Asset> {
        let this = self.clone();
        run_detached(async move {
            let _guard = this.write_lock.lock().await;

            let asset = this
                .index
                .remove(id)
                .ok_or_else(|| GalleryError::NotFound(format!("asset {}", id)))?;

            let files = this.files.clone();
            let metadata = this.metadata.clone();
            let content = asset.content_ref;
            run_blocking(move || {
                if let Err(e) = metadata.remove(id) {
                    tracing::warn!(asset = %id, "failed to remove metadata: {}", e);
                }
                if let Err(e) = files.remove(&content) {
                    tracing::warn!(asset = %id, "failed to remove model: {}", e);
                }
                Ok(())
            })
            .await?;

            tracing::info!(asset = %id, "deleted asset");
            Ok(asset)
        })
        .await
    }

    /// Change the display name of an asset
    pub async fn rename(&self, id: AssetId, name: &str) -> Result<Asset> {
        let name = name.to_string();
        self.update(id, move |record| record.name = name).await
    }

    /// Replace the tag set of an asset
    pub async fn retag(&self, id: AssetId, tags: TagSet) -> Result<Asset> {
        self.update(id, move |record| record.tags = tags).await
    }

    /// Re-hash the stored model of an asset and compare with its record
    pub async fn verify(&self, id: AssetId) -> Result<()> {
        let asset = self
            .index
            .get(id)
            .ok_or_else(|| GalleryError::NotFound(format!("asset {}", id)))?;
        let files = self.files.clone();

        run_blocking(move || {
            // A length change is caught without reading the whole model
            let size = files.size(&asset.content_ref)?;
            if size != asset.size {
                return Err(GalleryError::IntegrityMismatch {
                    id,
                    expected: format!("{} bytes", asset.size),
                    actual: format!("{} bytes", size),
                });
            }

            let bytes = files.get(&asset.content_ref)?;
            let actual = ContentHash::from_bytes(&bytes);
            if actual != asset.hash {
                return Err(GalleryError::IntegrityMismatch {
                    id,
                    expected: asset.hash.to_prefixed_hex(),
                    actual: actual.to_prefixed_hex(),
                });
            }
            Ok(())
        })
        .await
    }

    /// Delete the leftovers described by a rebuild report.
    ///
    /// Indexed assets are never touched.
    pub async fn repair(&self, report: &RebuildReport) -> Result<RepairSummary> {
        let warnings = report.warnings.clone();
        let this = self.clone();
        run_detached(async move {
            let _guard = this.write_lock.lock().await;
            let index = Arc::clone(&this.index);
            let layout = this.layout.clone();
            let files = this.files.clone();
            let metadata = this.metadata.clone();
            run_blocking(move || {
                Ok(repair::apply(&warnings, &index, &layout, &files, &metadata))
            })
            .await
        })
        .await
    }

    /// Path of the stored model for an indexed asset
    pub fn content_path(&self, id: AssetId) -> Result<PathBuf> {
        let asset = self
            .index
            .get(id)
            .ok_or_else(|| GalleryError::NotFound(format!("asset {}", id)))?;
        Ok(self.files.path(&asset.content_ref))
    }

    async fn ingest(&self, draft: Draft) -> Result<Asset> {
        if draft.bytes.is_empty() {
            return Err(GalleryError::InvalidContent(format!(
                "{} is empty",
                draft.name
            )));
        }

        let _guard = self.write_lock.lock().await;
        let this = self.clone();
        let asset = run_blocking(move || this.write_new(draft)).await?;

        self.index.upsert(asset.clone());
        tracing::info!(
            asset = %asset.id,
            name = %asset.display_name,
            bytes = asset.size,
            "added asset"
        );
        Ok(asset)
    }

    /// Write file and record for a fresh id, rolling back the file if the
    /// record cannot be written.
    fn write_new(&self, draft: Draft) -> Result<Asset> {
        let id = self.allocator.allocate()?;

        let content_ref = match self.files.put(id, &draft.bytes) {
            Ok(content_ref) => content_ref,
            Err(cause) => {
                if !matches!(cause, GalleryError::AlreadyExists(_)) {
                    self.discard(id);
                }
                return Err(GalleryError::IngestionFailed {
                    id,
                    cause: Box::new(cause),
                });
            }
        };

        let asset = Asset {
            id,
            display_name: draft.name,
            uploaded_at: Utc::now(),
            tags: draft.tags,
            content_ref,
            format: draft.format,
            size: draft.bytes.len() as u64,
            hash: ContentHash::from_bytes(&draft.bytes),
        };

        if let Err(cause) = self.metadata.put(id, &MetadataRecord::from_asset(&asset)) {
            self.discard(id);
            return Err(GalleryError::IngestionFailed {
                id,
                cause: Box::new(cause),
            });
        }

        Ok(asset)
    }

    /// Best-effort removal of whatever an interrupted ingestion wrote
    fn discard(&self, id: AssetId) {
        if let Err(e) = self.files.remove(&ContentRef::for_id(id)) {
            tracing::warn!(asset = %id, "rollback could not remove model: {}", e);
        }
    }

    /// Read-modify-write of one metadata record, then refresh the index
    async fn update<F>(&self, id: AssetId, edit: F) -> Result<Asset>
    where
        F: FnOnce(&mut MetadataRecord) + Send + 'static,
    {
        let this = self.clone();
        run_detached(async move {
            let _guard = this.write_lock.lock().await;
            if !this.index.contains(id) {
                return Err(GalleryError::NotFound(format!("asset {}", id)));
            }

            let metadata = this.metadata.clone();
            let asset = run_blocking(move || {
                let mut record = metadata.get(id)?;
                edit(&mut record);
                metadata.put(id, &record)?;
                Ok(record.to_asset(id))
            })
            .await?;

            this.index.upsert(asset.clone());
            tracing::info!(asset = %id, "updated asset metadata");
            Ok(asset)
        })
        .await
    }
}

/// Lowercased file extension, used as the model format
fn format_from_path(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(str::to_lowercase)
}
