//! Gallery Core - Foundational types for the model gallery
//!
//! This crate provides the types every other gallery crate depends on:
//! - `AssetId` - Single-assignment asset identifiers
//! - `TagSet` - Case-normalized tag sets
//! - `ContentRef` - Storage location of a model, derived from its id
//! - `ContentHash` - SHA-256 content hashing for integrity checks
//! - `Asset` - The cataloged unit
//! - Error types and Result alias

mod asset;
mod error;
mod hash;
mod id;
mod tags;

pub use asset::{Asset, ContentRef, ASSETS_DIR, MODEL_FILE};
pub use error::{GalleryError, Result};
pub use hash::ContentHash;
pub use id::AssetId;
pub use tags::TagSet;
