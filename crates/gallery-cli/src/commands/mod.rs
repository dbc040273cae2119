//! CLI command implementations

pub mod add;
pub mod cat;
pub mod check;
pub mod edit;
pub mod list;
pub mod shell;
