//! Gallery Ingest - Adding, editing and removing assets
//!
//! The `IngestionPipeline` owns every structural mutation of the catalog and
//! keeps file, metadata and index in step. `Gallery` wires the pipeline,
//! the index and the query engine into the API the presentation layer uses.

mod gallery;
mod pipeline;
mod repair;
mod task;

pub use gallery::Gallery;
pub use pipeline::IngestionPipeline;
pub use repair::RepairSummary;
