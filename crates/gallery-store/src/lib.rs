//! Gallery Store - Durable storage for models and their metadata
//!
//! Each asset owns a subtree of the storage root keyed by its id:
//!
//! ```text
//! <root>/allocator.toml
//! <root>/assets/<id>/model
//! <root>/assets/<id>/meta.toml
//! ```
//!
//! Every write goes to a temporary sibling first and is renamed into place,
//! so a crash never leaves a partial model or metadata record visible.

mod allocator;
mod atomic;
mod file_store;
mod layout;
mod metadata;

pub use allocator::IdentifierAllocator;
pub use file_store::FileStore;
pub use layout::{AssetEntry, StorageLayout, StorageScan};
pub use metadata::{CorruptRecord, ListedRecords, MetadataRecord, MetadataStore};
