//! Gallery CLI - Command-line interface for the model gallery

mod commands;
mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use commands::{add, cat, check, edit, list, shell};
use config::GalleryConfig;
use gallery_core::{AssetId, GalleryError};
use gallery_ingest::Gallery;
use gallery_query::{SortDirection, SortKey};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gallery")]
#[command(about = "Catalog, tag and query 3D model assets", long_about = None)]
#[command(version)]
struct Cli {
    /// Storage root (overrides config and GALLERY_ROOT)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Add a model file to the gallery
    Add {
        /// Path to the model file (e.g., chair.obj)
        path: PathBuf,

        /// Display name (defaults to the file name)
        #[arg(long)]
        name: Option<String>,

        /// Comma-separated tags (defaults to the configured default tags)
        #[arg(long)]
        tags: Option<String>,
    },

    /// List assets, optionally filtered by tags
    List {
        /// Required tag (repeatable; all must match)
        #[arg(long)]
        tag: Vec<String>,

        /// Free-text search over name, tags and upload date
        #[arg(long)]
        search: Option<String>,

        /// Sort key (name, uploaded, tag_count, tags)
        #[arg(long, default_value = "uploaded", value_parser = parse_sort_key)]
        sort: SortKey,

        /// Sort direction (asc or desc)
        #[arg(long, default_value = "desc", value_parser = parse_direction)]
        order: SortDirection,

        /// Output format (table, json or toml)
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Query assets (e.g., "assets where tag == 'chair' order by name")
    Query {
        query: String,

        /// Output format (table, json or toml)
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Show one asset
    Show {
        id: AssetId,

        /// Output format (table, json or toml)
        #[arg(long, default_value = "toml")]
        format: String,
    },

    /// Change the display name of an asset
    Rename { id: AssetId, name: String },

    /// Replace the tags of an asset
    Retag {
        id: AssetId,

        /// Comma-separated tags
        tags: String,
    },

    /// Delete an asset and its stored model
    Delete { id: AssetId },

    /// Write the raw model bytes to stdout or a file
    Cat {
        id: AssetId,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Report storage inconsistencies found at startup
    Check {
        /// Remove orphaned files, orphaned records and stale temp files
        #[arg(long)]
        repair: bool,

        /// Re-hash every stored model
        #[arg(long)]
        verify: bool,
    },

    /// Interactive command loop
    Shell,
}

fn parse_sort_key(s: &str) -> Result<SortKey, String> {
    match s.to_lowercase().as_str() {
        "name" => Ok(SortKey::Name),
        "uploaded" | "date" => Ok(SortKey::UploadedAt),
        "tag_count" => Ok(SortKey::TagCount),
        "tags" => Ok(SortKey::Tags),
        _ => Err(format!(
            "unknown sort key '{}'; valid values: name, uploaded, tag_count, tags",
            s
        )),
    }
}

fn parse_direction(s: &str) -> Result<SortDirection, String> {
    match s.to_lowercase().as_str() {
        "asc" | "ascending" => Ok(SortDirection::Ascending),
        "desc" | "descending" => Ok(SortDirection::Descending),
        _ => Err(format!("unknown direction '{}'; valid values: asc, desc", s)),
    }
}

fn init_tracing(config: &GalleryConfig, verbose: bool) {
    let level = if verbose { "debug" } else { config.log_level.as_str() };
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Run one command against an open gallery
pub(crate) async fn execute(gallery: &Gallery, config: &GalleryConfig, command: Commands) -> Result<()> {
    match command {
        Commands::Add { path, name, tags } => {
            add::run(gallery, config, &path, name.as_deref(), tags.as_deref()).await
        }
        Commands::List {
            tag,
            search,
            sort,
            order,
            format,
        } => list::run(gallery, list::ListArgs {
            tags: tag,
            search,
            sort,
            order,
            format,
        }),
        Commands::Query { query, format } => list::query(gallery, &query, &format),
        Commands::Show { id, format } => list::show(gallery, id, &format),
        Commands::Rename { id, name } => edit::rename(gallery, id, &name).await,
        Commands::Retag { id, tags } => edit::retag(gallery, id, &tags).await,
        Commands::Delete { id } => edit::delete(gallery, id).await,
        Commands::Cat { id, output } => cat::run(gallery, id, output.as_deref()).await,
        Commands::Check { repair, verify } => check::run(gallery, repair, verify).await,
        Commands::Shell => anyhow::bail!("Already in an interactive shell"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = GalleryConfig::load().context("Failed to load configuration")?;
    if let Some(root) = cli.root {
        config.root = root;
    }
    init_tracing(&config, cli.verbose);

    let gallery = Gallery::open(&config.root)
        .await
        .with_context(|| format!("Failed to open gallery at {}", config.root.display()))?;

    let result = match cli.command {
        Commands::Shell => shell::run(&gallery, &config).await,
        command => execute(&gallery, &config, command).await,
    };

    if let Err(e) = &result {
        if let Some(GalleryError::AllocationExhausted) = e.downcast_ref::<GalleryError>() {
            tracing::error!("identifier space exhausted; no further assets can be added");
        }
    }
    result
}
