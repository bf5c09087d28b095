//! Shared database schema, migrations, and query builders.
//!
//! Every builder returns `(sql, values)` for the server's rusqlite bridge.

pub mod fields;
pub mod host;
pub mod migrations;
pub mod properties;
pub mod query;
pub mod tables;
pub mod view_members;
pub mod views;

// Re-export tables for convenience
pub use tables::*;

/// A built statement: SQL text plus positional parameters.
pub type Built = (String, sea_query::Values);
