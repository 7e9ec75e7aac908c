// crates/ixquery/src/lib.rs

//! Command-line querying of a prebuilt, read-only tantivy index.
//!
//! A run resolves [`settings::QuerySettings`], opens an [`index::IndexSet`],
//! builds one [`executor::QueryExecutor`] and dispatches a single
//! [`mode::Mode`]: a query, a match-all, an id dump, an index enumeration,
//! or a script of further queries.

pub mod cli;
pub mod enumerate;
pub mod error;
pub mod executor;
pub mod filter;
pub mod format;
pub mod index;
pub mod lookup;
pub mod mode;
pub mod projection;
pub mod script;
pub mod settings;

pub use error::{Error, Result};
