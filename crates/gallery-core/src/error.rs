//! Error types for the gallery

use crate::id::AssetId;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for gallery operations
#[derive(Debug, Error)]
pub enum GalleryError {
    /// The identifier space is used up. Callers treat this as fatal.
    #[error("Identifier space exhausted")]
    AllocationExhausted,

    #[error("Invalid content: {0}")]
    InvalidContent(String),

    #[error("Content already exists for asset {0}")]
    AlreadyExists(AssetId),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Write failed for {}: {source}", .path.display())]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Read failed for {}: {source}", .path.display())]
    ReadFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Remove failed for {}: {source}", .path.display())]
    RemoveFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt metadata at {}: {reason}", .path.display())]
    CorruptMetadata { path: PathBuf, reason: String },

    /// An ingestion step failed; anything already written has been rolled back.
    #[error("Ingestion of asset {id} failed: {cause}")]
    IngestionFailed {
        id: AssetId,
        #[source]
        cause: Box<GalleryError>,
    },

    #[error("Integrity mismatch for asset {id}: expected {expected}, found {actual}")]
    IntegrityMismatch {
        id: AssetId,
        expected: String,
        actual: String,
    },

    #[error("Background task failed: {0}")]
    TaskFailed(String),

    #[error("TOML serialization error: {0}")]
    TomlSerError(String),
}

impl GalleryError {
    /// Whether the process should stop after this error
    pub fn is_fatal(&self) -> bool {
        matches!(self, GalleryError::AllocationExhausted)
    }

    /// Whether this error means the asset or its content is absent
    pub fn is_not_found(&self) -> bool {
        matches!(self, GalleryError::NotFound(_))
    }
}

/// Result type alias for gallery operations
pub type Result<T> = std::result::Result<T, GalleryError>;

impl From<toml::ser::Error> for GalleryError {
    fn from(err: toml::ser::Error) -> Self {
        GalleryError::TomlSerError(err.to_string())
    }
}
