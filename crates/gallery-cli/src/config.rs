//! Layered configuration
//!
//! Config is loaded with these layers of precedence (highest wins):
//! 1. Command-line flags (applied by the caller)
//! 2. Environment variables: `GALLERY_ROOT`, `GALLERY_LOG`
//! 3. Project-local: `.gallery/config.toml`
//! 4. Global: `~/.gallery/config.toml`

use anyhow::{Context, Result};
use gallery_core::TagSet;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_ROOT: &str = "gallery_storage";
const DEFAULT_TAG: &str = "default";
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSection {
    #[serde(default)]
    pub root: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestSection {
    /// Tags applied when `add` is given none
    #[serde(default)]
    pub default_tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogSection {
    #[serde(default)]
    pub level: Option<String>,
}

/// Top-level config file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GalleryConfigFile {
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub ingest: IngestSection,
    #[serde(default)]
    pub log: LogSection,
}

/// Resolved configuration with defaults and environment overrides applied
#[derive(Debug, Clone)]
pub struct GalleryConfig {
    pub root: PathBuf,
    pub default_tags: TagSet,
    pub log_level: String,
}

impl GalleryConfig {
    /// Load config with layered precedence: global < project < env vars
    pub fn load() -> Result<Self> {
        let mut config = GalleryConfigFile::default();

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                let global = Self::load_file(&global_path)?;
                Self::merge_into(&mut config, global);
            }
        }

        let local_path = PathBuf::from(".gallery/config.toml");
        if local_path.exists() {
            let local = Self::load_file(&local_path)?;
            Self::merge_into(&mut config, local);
        }

        Self::apply_env_overrides(&mut config, |key| std::env::var(key).ok());

        Ok(Self::resolve(config))
    }

    fn resolve(file: GalleryConfigFile) -> Self {
        let default_tags = file
            .ingest
            .default_tags
            .map(|tags| tags.iter().collect())
            .unwrap_or_else(|| TagSet::parse(DEFAULT_TAG));

        Self {
            root: file
                .storage
                .root
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ROOT)),
            default_tags,
            log_level: file
                .log
                .level
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        }
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".gallery").join("config.toml"))
    }

    fn load_file(path: &Path) -> Result<GalleryConfigFile> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }

    fn merge_into(base: &mut GalleryConfigFile, overlay: GalleryConfigFile) {
        if overlay.storage.root.is_some() {
            base.storage.root = overlay.storage.root;
        }
        if overlay.ingest.default_tags.is_some() {
            base.ingest.default_tags = overlay.ingest.default_tags;
        }
        if overlay.log.level.is_some() {
            base.log.level = overlay.log.level;
        }
    }

    fn apply_env_overrides<F>(config: &mut GalleryConfigFile, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root) = var("GALLERY_ROOT").filter(|v| !v.is_empty()) {
            config.storage.root = Some(PathBuf::from(root));
        }
        if let Some(level) = var("GALLERY_LOG").filter(|v| !v.is_empty()) {
            config.log.level = Some(level);
        }
    }
}
