//! Export raw model bytes

use anyhow::{Context, Result};
use gallery_core::AssetId;
use gallery_ingest::Gallery;
use std::path::Path;
use tokio::io::AsyncWriteExt;

pub async fn run(gallery: &Gallery, id: AssetId, output: Option<&Path>) -> Result<()> {
    let bytes = gallery
        .get_content(id)
        .await
        .with_context(|| format!("Failed to read content of asset {}", id))?;

    match output {
        Some(path) => {
            tokio::fs::write(path, &bytes)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Wrote {} bytes to {}", bytes.len(), path.display());
        }
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(&bytes).await?;
            stdout.flush().await?;
        }
    }

    Ok(())
}
