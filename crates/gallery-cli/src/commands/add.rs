//! Add command

use crate::config::GalleryConfig;
use anyhow::{Context, Result};
use gallery_core::TagSet;
use gallery_ingest::Gallery;
use std::path::Path;

pub async fn run(
    gallery: &Gallery,
    config: &GalleryConfig,
    path: &Path,
    name: Option<&str>,
    tags: Option<&str>,
) -> Result<()> {
    let tags = match tags {
        Some(list) => TagSet::parse(list),
        None => config.default_tags.clone(),
    };

    let asset = gallery
        .add_file(path, name, tags)
        .await
        .with_context(|| format!("Failed to add {}", path.display()))?;

    println!("Added asset {}: {}", asset.id, asset.display_name);
    println!("  Tags: {}", asset.tags);
    println!("  Size: {} bytes", asset.size);
    println!("  Hash: {}", asset.hash.to_prefixed_hex());

    Ok(())
}
