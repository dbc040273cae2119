//! Gallery Index - In-memory mirror of the catalog
//!
//! The index is the only thing queries read. It is rebuilt from storage once
//! at startup and then kept in step with every mutation.

mod cache;
mod report;

pub use cache::{IndexCache, IndexSnapshot};
pub use report::{ConsistencyWarning, RebuildReport};
