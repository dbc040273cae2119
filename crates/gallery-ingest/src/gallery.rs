//! The gallery facade used by presentation layers

use crate::pipeline::IngestionPipeline;
use crate::repair::RepairSummary;
use crate::task::run_blocking;
use gallery_core::{Asset, AssetId, GalleryError, Result, TagSet};
use gallery_index::{IndexCache, RebuildReport};
use gallery_query::{AssetQuery, QueryEngine, SortDirection, SortKey};
use gallery_store::{FileStore, IdentifierAllocator, MetadataStore, StorageLayout};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// An opened gallery: storage, index, query engine and ingestion pipeline.
///
/// Cloning is cheap and every clone shares the same index and write lock.
#[derive(Debug, Clone)]
pub struct Gallery {
    layout: StorageLayout,
    index: Arc<IndexCache>,
    engine: QueryEngine,
    pipeline: IngestionPipeline,
    report: Arc<Mutex<RebuildReport>>,
}

impl Gallery {
    /// Open (or create) the gallery at `root` and rebuild its index.
    ///
    /// Inconsistencies found on disk do not fail the open; they are in
    /// `rebuild_report()`.
    pub async fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let index = Arc::new(IndexCache::new());

        let rebuild_index = Arc::clone(&index);
        let (layout, allocator, report) = run_blocking(move || {
            let layout = StorageLayout::open(&root)?;
            let allocator = IdentifierAllocator::open(&layout)?;
            let files = FileStore::new(layout.clone());
            let metadata = MetadataStore::new(layout.clone());
            let report = rebuild_index.rebuild(&layout, &files, &metadata)?;
            Ok((layout, allocator, report))
        })
        .await?;

        tracing::info!(root = %layout.root().display(), assets = report.indexed, "opened gallery");

        Ok(Self {
            engine: QueryEngine::new(Arc::clone(&index)),
            pipeline: IngestionPipeline::new(layout.clone(), Arc::new(allocator), Arc::clone(&index)),
            layout,
            index,
            report: Arc::new(Mutex::new(report)),
        })
    }

    pub fn root(&self) -> &Path {
        self.layout.root()
    }

    /// What the startup rebuild found, minus anything repaired since
    pub fn rebuild_report(&self) -> RebuildReport {
        self.report
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub async fn add(&self, name: &str, tags: TagSet, bytes: Vec<u8>) -> Result<Asset> {
        self.pipeline.add(name, tags, bytes).await
    }

    pub async fn add_file(&self, path: &Path, name: Option<&str>, tags: TagSet) -> Result<Asset> {
        self.pipeline.add_file(path, name, tags).await
    }

    pub async fn delete(&self, id: AssetId) -> Result<Asset> {
        self.pipeline.delete(id).await
    }

    pub async fn rename(&self, id: AssetId, name: &str) -> Result<Asset> {
        self.pipeline.rename(id, name).await
    }

    pub async fn retag(&self, id: AssetId, tags: TagSet) -> Result<Asset> {
        self.pipeline.retag(id, tags).await
    }

    /// Assets carrying every tag in `filter_tags`, ordered by `sort_key`
    pub fn query(
        &self,
        filter_tags: &TagSet,
        sort_key: SortKey,
        direction: SortDirection,
    ) -> Vec<Asset> {
        self.engine.query(filter_tags, sort_key, direction)
    }

    /// Run a full query, including free-text terms
    pub fn search(&self, query: &AssetQuery) -> Vec<Asset> {
        self.engine.run(query)
    }

    pub fn get(&self, id: AssetId) -> Result<Asset> {
        self.index
            .get(id)
            .ok_or_else(|| GalleryError::NotFound(format!("asset {}", id)))
    }

    /// Full content of an asset's stored model
    pub async fn get_content(&self, id: AssetId) -> Result<Vec<u8>> {
        let asset = self.get(id)?;
        let files = self.pipeline.files().clone();
        run_blocking(move || files.get(&asset.content_ref)).await
    }

    /// Where the model of an asset lives on disk
    pub fn content_path(&self, id: AssetId) -> Result<PathBuf> {
        self.pipeline.content_path(id)
    }

    pub async fn verify(&self, id: AssetId) -> Result<()> {
        self.pipeline.verify(id).await
    }

    /// Clean up what the startup rebuild reported.
    ///
    /// Removed entries are dropped from `rebuild_report()`, so a second
    /// repair only retries what was skipped.
    pub async fn repair(&self) -> Result<RepairSummary> {
        let pending = self.rebuild_report();
        let summary = self.pipeline.repair(&pending).await?;
        self.report
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .resolve(&summary.removed);
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gallery_core::ContentRef;
    use std::fs;

    fn temp_root() -> PathBuf {
        std::env::temp_dir().join(format!("gallery_test_{}", uuid::Uuid::new_v4()))
    }

    fn all(gallery: &Gallery) -> Vec<Asset> {
        gallery.query(&TagSet::new(), SortKey::UploadedAt, SortDirection::Ascending)
    }

    #[tokio::test]
    async fn test_add_then_query() {
        let root = temp_root();
        let gallery = Gallery::open(&root).await.unwrap();
        assert!(gallery.is_empty());
        assert!(gallery.rebuild_report().is_consistent());

        let asset = gallery
            .add("cube.obj", TagSet::parse("Cat, furniture"), b"v 0 0 0\n".to_vec())
            .await
            .unwrap();
        assert_eq!(asset.id, AssetId::from_raw(1));
        assert_eq!(asset.format.as_deref(), Some("obj"));
        assert_eq!(asset.size, 8);

        let found = gallery.query(&TagSet::parse("cat"), SortKey::Name, SortDirection::Ascending);
        assert_eq!(found, vec![asset.clone()]);
        assert!(root.join("assets/1/model").is_file());
        assert!(root.join("assets/1/meta.toml").is_file());

        fs::remove_dir_all(&root).ok();
    }

    #[tokio::test]
    async fn test_empty_content_rejected() {
        let root = temp_root();
        let gallery = Gallery::open(&root).await.unwrap();

        let err = gallery.add("empty.stl", TagSet::new(), Vec::new()).await.unwrap_err();
        assert!(matches!(err, GalleryError::InvalidContent(_)));
        assert!(gallery.is_empty());
        assert!(!root.join("assets/1").exists());

        fs::remove_dir_all(&root).ok();
    }

    #[tokio::test]
    async fn test_content_round_trip_and_verify() {
        let root = temp_root();
        let gallery = Gallery::open(&root).await.unwrap();
        let bytes: Vec<u8> = (0..=255u8).cycle().take(4096).collect();

        let asset = gallery.add("blob.bin", TagSet::new(), bytes.clone()).await.unwrap();
        assert_eq!(gallery.get_content(asset.id).await.unwrap(), bytes);
        gallery.verify(asset.id).await.unwrap();

        let mut flipped = bytes.clone();
        flipped[0] ^= 0xff;
        fs::write(gallery.content_path(asset.id).unwrap(), &flipped).unwrap();
        match gallery.verify(asset.id).await.unwrap_err() {
            GalleryError::IntegrityMismatch { expected, .. } => assert!(expected.starts_with("sha256:")),
            other => panic!("unexpected error: {other}"),
        }

        fs::write(gallery.content_path(asset.id).unwrap(), b"tampered").unwrap();
        match gallery.verify(asset.id).await.unwrap_err() {
            GalleryError::IntegrityMismatch { expected, actual, .. } => {
                assert_eq!(expected, "4096 bytes");
                assert_eq!(actual, "8 bytes");
            }
            other => panic!("unexpected error: {other}"),
        }

        fs::remove_dir_all(&root).ok();
    }

    #[tokio::test]
    async fn test_delete_removes_everything() {
        let root = temp_root();
        let gallery = Gallery::open(&root).await.unwrap();
        let asset = gallery.add("a.obj", TagSet::parse("x"), b"a".to_vec()).await.unwrap();

        let deleted = gallery.delete(asset.id).await.unwrap();
        assert_eq!(deleted.id, asset.id);
        assert!(all(&gallery).is_empty());
        assert!(gallery.get_content(asset.id).await.unwrap_err().is_not_found());
        assert!(!root.join("assets/1").exists());

        let again = gallery.delete(asset.id).await.unwrap_err();
        assert!(again.is_not_found());

        fs::remove_dir_all(&root).ok();
    }

    #[tokio::test]
    async fn test_unknown_ids_are_not_found() {
        let root = temp_root();
        let gallery = Gallery::open(&root).await.unwrap();
        let missing = AssetId::from_raw(42);

        assert!(gallery.get(missing).unwrap_err().is_not_found());
        assert!(gallery.rename(missing, "x").await.unwrap_err().is_not_found());
        assert!(gallery.retag(missing, TagSet::new()).await.unwrap_err().is_not_found());
        assert!(gallery.verify(missing).await.unwrap_err().is_not_found());
        assert!(gallery.content_path(missing).unwrap_err().is_not_found());

        fs::remove_dir_all(&root).ok();
    }

    #[tokio::test]
    async fn test_tag_filter_scenario() {
        let root = temp_root();
        let gallery = Gallery::open(&root).await.unwrap();

        let x = gallery.add("X", TagSet::parse("cat"), b"x".to_vec()).await.unwrap();
        let y = gallery.add("Y", TagSet::parse("cat,dog"), b"y".to_vec()).await.unwrap();

        let cats = gallery.query(&TagSet::parse("cat"), SortKey::Name, SortDirection::Ascending);
        assert_eq!(cats.iter().map(|a| a.id).collect::<Vec<_>>(), vec![x.id, y.id]);

        let dogs = gallery.query(&TagSet::parse("dog"), SortKey::Name, SortDirection::Ascending);
        assert_eq!(dogs.iter().map(|a| a.id).collect::<Vec<_>>(), vec![y.id]);

        let both = gallery.query(&TagSet::parse("cat,dog"), SortKey::Name, SortDirection::Descending);
        assert_eq!(both.len(), 1);

        let none = gallery.query(&TagSet::parse("bird"), SortKey::Name, SortDirection::Ascending);
        assert!(none.is_empty());

        fs::remove_dir_all(&root).ok();
    }

    #[tokio::test]
    async fn test_rename_and_retag_persist() {
        let root = temp_root();
        let id = {
            let gallery = Gallery::open(&root).await.unwrap();
            let asset = gallery.add("draft.stl", TagSet::parse("wip"), b"solid".to_vec()).await.unwrap();
            let renamed = gallery.rename(asset.id, "Final Part").await.unwrap();
            assert_eq!(renamed.display_name, "Final Part");
            let retagged = gallery.retag(asset.id, TagSet::parse("done, printed")).await.unwrap();
            assert_eq!(retagged.tags, TagSet::parse("done,printed"));
            assert_eq!(retagged.uploaded_at, asset.uploaded_at);
            asset.id
        };

        let reopened = Gallery::open(&root).await.unwrap();
        let asset = reopened.get(id).unwrap();
        assert_eq!(asset.display_name, "Final Part");
        assert!(asset.tags.contains("printed"));
        assert!(!asset.tags.contains("wip"));
        assert_eq!(asset.format.as_deref(), Some("stl"));

        fs::remove_dir_all(&root).ok();
    }

    #[tokio::test]
    async fn test_rename_keeps_unknown_record_keys() {
        let root = temp_root();
        let id = {
            let gallery = Gallery::open(&root).await.unwrap();
            gallery.add("bot.stl", TagSet::parse("robot"), b"solid bot".to_vec()).await.unwrap().id
        };

        // A newer writer added keys this build does not know
        let record_path = root.join("assets/1/meta.toml");
        let original = fs::read_to_string(&record_path).unwrap();
        let extended = original
            .replace("version = 1", "version = 3")
            .replace("[asset]\n", "[asset]\nthumbnail = \"previews/1.png\"\n");
        fs::write(&record_path, extended).unwrap();

        let gallery = Gallery::open(&root).await.unwrap();
        gallery.rename(id, "Walker").await.unwrap();
        gallery.retag(id, TagSet::parse("robot, legs")).await.unwrap();

        let rewritten = fs::read_to_string(&record_path).unwrap();
        assert!(rewritten.contains("thumbnail = \"previews/1.png\""));
        assert!(rewritten.contains("version = 3"));
        assert!(rewritten.contains("Walker"));

        fs::remove_dir_all(&root).ok();
    }

    #[tokio::test]
    async fn test_add_file_uses_file_name() {
        let root = temp_root();
        let gallery = Gallery::open(&root).await.unwrap();
        let source = root.join("Teapot.GLB");
        fs::write(&source, b"glTF").unwrap();

        let asset = gallery.add_file(&source, None, TagSet::parse("kitchen")).await.unwrap();
        assert_eq!(asset.display_name, "Teapot.GLB");
        assert_eq!(asset.format.as_deref(), Some("glb"));

        let named = gallery.add_file(&source, Some("Pot"), TagSet::new()).await.unwrap();
        assert_eq!(named.display_name, "Pot");

        let err = gallery
            .add_file(&root.join("missing.obj"), None, TagSet::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GalleryError::ReadFailure { .. }));

        fs::remove_dir_all(&root).ok();
    }

    #[tokio::test]
    async fn test_failed_metadata_write_rolls_back() {
        let root = temp_root();
        let gallery = Gallery::open(&root).await.unwrap();

        // A directory where the record should go makes the rename fail
        fs::create_dir_all(root.join("assets/1/meta.toml")).unwrap();

        let err = gallery.add("a.obj", TagSet::new(), b"a".to_vec()).await.unwrap_err();
        match err {
            GalleryError::IngestionFailed { id, .. } => assert_eq!(id, AssetId::from_raw(1)),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!root.join("assets/1/model").exists());
        assert!(all(&gallery).is_empty());

        fs::remove_dir_all(root.join("assets/1")).unwrap();
        let asset = gallery.add("a.obj", TagSet::new(), b"a".to_vec()).await.unwrap();
        assert_eq!(asset.id, AssetId::from_raw(2));

        fs::remove_dir_all(&root).ok();
    }

    #[tokio::test]
    async fn test_orphaned_file_after_crash() {
        let root = temp_root();
        {
            let gallery = Gallery::open(&root).await.unwrap();
            gallery.add("kept.obj", TagSet::new(), b"kept".to_vec()).await.unwrap();
        }

        // Crash between the model write and the record write
        let layout = StorageLayout::open(&root).unwrap();
        FileStore::new(layout).put(AssetId::from_raw(5), b"partial").unwrap();

        let gallery = Gallery::open(&root).await.unwrap();
        assert_eq!(gallery.rebuild_report().orphaned_files(), vec![AssetId::from_raw(5)]);
        assert_eq!(gallery.len(), 1);
        assert!(gallery.get(AssetId::from_raw(5)).is_err());

        let next = gallery.add("new.obj", TagSet::new(), b"new".to_vec()).await.unwrap();
        assert_eq!(next.id, AssetId::from_raw(6));

        let summary = gallery.repair().await.unwrap();
        assert_eq!(summary.removed.len(), 1);
        assert!(!root.join(ContentRef::for_id(AssetId::from_raw(5)).relative_path()).exists());
        assert_eq!(gallery.len(), 2);
        assert!(gallery.rebuild_report().is_consistent());

        let again = gallery.repair().await.unwrap();
        assert!(again.is_empty());

        let reopened = Gallery::open(&root).await.unwrap();
        assert!(reopened.rebuild_report().is_consistent());
        assert_eq!(reopened.len(), 2);

        fs::remove_dir_all(&root).ok();
    }

    #[tokio::test]
    async fn test_orphaned_metadata_is_not_indexed() {
        let root = temp_root();
        let id = {
            let gallery = Gallery::open(&root).await.unwrap();
            gallery.add("gone.obj", TagSet::new(), b"gone".to_vec()).await.unwrap().id
        };
        fs::remove_file(root.join("assets/1/model")).unwrap();

        let gallery = Gallery::open(&root).await.unwrap();
        assert_eq!(gallery.rebuild_report().orphaned_metadata(), vec![id]);
        assert!(gallery.is_empty());

        gallery.repair().await.unwrap();
        assert!(!root.join("assets/1").exists());
        assert!(gallery.rebuild_report().orphaned_metadata().is_empty());

        fs::remove_dir_all(&root).ok();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_queries_never_see_partial_assets() {
        let root = temp_root();
        let gallery = Gallery::open(&root).await.unwrap();
        let bytes = vec![7u8; 256 * 1024];

        let mut readers = Vec::new();
        for _ in 0..8 {
            let gallery = gallery.clone();
            readers.push(tokio::spawn(async move {
                for _ in 0..200 {
                    let seen = all(&gallery);
                    assert!(seen.len() <= 1);
                    for asset in &seen {
                        let content = gallery.get_content(asset.id).await.unwrap();
                        assert_eq!(content.len() as u64, asset.size);
                    }
                    tokio::task::yield_now().await;
                }
            }));
        }

        let added = gallery.add("big.stl", TagSet::parse("big"), bytes).await.unwrap();
        for reader in readers {
            reader.await.unwrap();
        }
        assert_eq!(all(&gallery), vec![added]);

        fs::remove_dir_all(&root).ok();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_adds_get_distinct_ids() {
        let root = temp_root();
        let gallery = Gallery::open(&root).await.unwrap();

        let mut tasks = Vec::new();
        for i in 0..16u8 {
            let gallery = gallery.clone();
            tasks.push(tokio::spawn(async move {
                gallery
                    .add(&format!("part_{i}.obj"), TagSet::new(), vec![i + 1])
                    .await
                    .unwrap()
                    .id
            }));
        }

        let mut ids = Vec::new();
        for task in tasks {
            ids.push(task.await.unwrap());
        }
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 16);
        assert_eq!(gallery.len(), 16);

        fs::remove_dir_all(&root).ok();
    }
}
