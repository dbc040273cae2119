//! List, query and show commands

use anyhow::{Context, Result};
use gallery_core::{Asset, AssetId};
use gallery_ingest::Gallery;
use gallery_query::{
    format_json, format_table, format_toml, parse_query, AssetQuery, SortDirection, SortKey,
};

pub struct ListArgs {
    pub tags: Vec<String>,
    pub search: Option<String>,
    pub sort: SortKey,
    pub order: SortDirection,
    pub format: String,
}

pub fn run(gallery: &Gallery, args: ListArgs) -> Result<()> {
    let mut query = AssetQuery::new()
        .with_tags(args.tags.iter().collect())
        .sort_by(args.sort, args.order);
    if let Some(text) = &args.search {
        query = query.with_text(text);
    }

    let results = gallery.search(&query);
    println!("{}", render(&results, &args.format)?);
    Ok(())
}

pub fn query(gallery: &Gallery, query_str: &str, format: &str) -> Result<()> {
    let query = parse_query(query_str).context("Failed to parse query")?;
    let results = gallery.search(&query);
    println!("{}", render(&results, format)?);
    Ok(())
}

pub fn show(gallery: &Gallery, id: AssetId, format: &str) -> Result<()> {
    let asset = gallery.get(id)?;
    println!("{}", render(std::slice::from_ref(&asset), format)?);
    Ok(())
}

/// Format query results for the terminal
pub fn render(assets: &[Asset], format: &str) -> Result<String> {
    Ok(match format {
        "table" => format_table(assets),
        "json" => format_json(assets),
        "toml" => format_toml(assets),
        _ => anyhow::bail!("Unknown format: {}", format),
    })
}
