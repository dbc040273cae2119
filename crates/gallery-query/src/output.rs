//! Query result formatting

use gallery_core::Asset;
use serde::Serialize;

/// Format results as JSON
pub fn format_json(assets: &[Asset]) -> String {
    serde_json::to_string_pretty(assets).unwrap_or_else(|_| "[]".to_string())
}

/// Format results as TOML
pub fn format_toml(assets: &[Asset]) -> String {
    let wrapper = AssetListWrapper { assets };
    toml::to_string_pretty(&wrapper).unwrap_or_default()
}

/// Format results as an aligned text table
pub fn format_table(assets: &[Asset]) -> String {
    if assets.is_empty() {
        return "No assets.".to_string();
    }

    let rows: Vec<[String; 4]> = assets
        .iter()
        .map(|a| {
            [
                a.id.to_string(),
                a.display_name.clone(),
                a.upload_date(),
                a.tags.to_string(),
            ]
        })
        .collect();

    let header = ["ID", "NAME", "UPLOADED", "TAGS"];
    let mut widths = header.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let render = |cells: [&str; 4]| -> String {
        let line: Vec<String> = cells
            .iter()
            .zip(widths.iter())
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect();
        line.join("  ").trim_end().to_string()
    };

    let mut out = vec![render(header)];
    for row in &rows {
        out.push(render([
            row[0].as_str(),
            row[1].as_str(),
            row[2].as_str(),
            row[3].as_str(),
        ]));
    }
    out.join("\n")
}

#[derive(Serialize)]
struct AssetListWrapper<'a> {
    assets: &'a [Asset],
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use gallery_core::{AssetId, ContentHash, ContentRef, TagSet};

    fn sample() -> Vec<Asset> {
        let id = AssetId::from_raw(7);
        vec![Asset {
            id,
            display_name: "tavern_chair.obj".to_string(),
            uploaded_at: Utc.with_ymd_and_hms(2024, 3, 9, 17, 45, 0).unwrap(),
            tags: TagSet::parse("medieval,furniture"),
            content_ref: ContentRef::for_id(id),
            format: Some("obj".to_string()),
            size: 12,
            hash: ContentHash::from_bytes(b"chair"),
        }]
    }

    #[test]
    fn test_format_json() {
        let json = format_json(&sample());
        assert!(json.contains("tavern_chair.obj"));
        assert!(json.contains("assets/7/model"));
        assert!(json.contains("sha256:"));
    }

    #[test]
    fn test_format_toml() {
        let text = format_toml(&sample());
        assert!(text.contains("[[assets]]"));
        assert!(text.contains("display_name = \"tavern_chair.obj\""));
    }

    #[test]
    fn test_format_table() {
        let table = format_table(&sample());
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("ID"));
        assert!(lines[1].contains("2024-03-09"));
        assert!(lines[1].ends_with("furniture, medieval"));
        assert_eq!(format_table(&[]), "No assets.");
    }
}
