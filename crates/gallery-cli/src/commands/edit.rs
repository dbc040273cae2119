//! Rename, retag and delete commands

use anyhow::{Context, Result};
use gallery_core::{AssetId, TagSet};
use gallery_ingest::Gallery;

pub async fn rename(gallery: &Gallery, id: AssetId, name: &str) -> Result<()> {
    let asset = gallery
        .rename(id, name)
        .await
        .with_context(|| format!("Failed to rename asset {}", id))?;
    println!("Renamed asset {} to '{}'", asset.id, asset.display_name);
    Ok(())
}

pub async fn retag(gallery: &Gallery, id: AssetId, tags: &str) -> Result<()> {
    let asset = gallery
        .retag(id, TagSet::parse(tags))
        .await
        .with_context(|| format!("Failed to retag asset {}", id))?;
    println!("Asset {} tags: {}", asset.id, asset.tags);
    Ok(())
}

pub async fn delete(gallery: &Gallery, id: AssetId) -> Result<()> {
    let asset = gallery
        .delete(id)
        .await
        .with_context(|| format!("Failed to delete asset {}", id))?;
    println!("Deleted asset {}: {}", asset.id, asset.display_name);
    Ok(())
}
