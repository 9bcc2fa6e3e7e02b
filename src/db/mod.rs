//! Database module: SQLite post log and bot-state repository.
//!
//! The log is append-only; deduplication is a higher-layer decision made
//! through `exists_successful_post`, not a storage constraint. Row views
//! live in `crate::model` to keep the repository focused on SQL.

pub mod repo;

pub use repo::*;
