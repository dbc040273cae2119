//! Consistency check command

use anyhow::Result;
use gallery_ingest::Gallery;
use gallery_query::{SortDirection, SortKey};

pub async fn run(gallery: &Gallery, repair: bool, verify: bool) -> Result<()> {
    let report = gallery.rebuild_report();
    println!("Indexed {} asset(s)", gallery.len());

    if report.is_consistent() {
        println!("Storage is consistent.");
    } else {
        println!("{} warning(s):", report.warnings.len());
        for warning in &report.warnings {
            println!("  - {}", warning);
        }
    }

    if repair && !report.is_consistent() {
        let summary = gallery.repair().await?;
        println!(
            "Repaired {} issue(s), left {} for manual review",
            summary.removed.len(),
            summary.skipped.len()
        );
    }

    if verify {
        let mut mismatches = 0;
        let assets = gallery.query(&Default::default(), SortKey::UploadedAt, SortDirection::Ascending);
        for asset in &assets {
            match gallery.verify(asset.id).await {
                Ok(()) => {}
                Err(e) => {
                    mismatches += 1;
                    println!("  ✗ asset {}: {}", asset.id, e);
                }
            }
        }
        println!("Verified {} asset(s), {} mismatch(es)", assets.len(), mismatches);
        if mismatches > 0 {
            anyhow::bail!("{} asset(s) failed verification", mismatches);
        }
    }

    Ok(())
}
