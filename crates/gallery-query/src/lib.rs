//! Gallery Query - Filtering and ordering the catalog
//!
//! Queries run against a snapshot of the in-memory index and never touch
//! storage. A small query language is provided for the CLI:
//!
//! ```text
//! assets where tag == 'cat' and text contains 'chair' order by name desc
//! ```

mod engine;
mod output;
mod parser;

pub use engine::{execute_query, AssetQuery, QueryEngine, SortDirection, SortKey};
pub use output::{format_json, format_table, format_toml};
pub use parser::{parse_query, QueryError};
