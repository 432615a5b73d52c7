//! Database access layer.
//!
//! [`SchemaIntrospector`] and [`QueryExecutor`] are the two read operations
//! the pipeline needs. The default implementation is
//! [`mssql::MssqlDatabase`]; tests and other backends implement the traits
//! directly and plug into [`crate::pipeline::Pipeline`] unchanged.
//!
//! Trait methods use `impl Future` in their signatures (stable since Rust
//! 1.75) so no extra `async-trait` crate is required.

pub mod mssql;

use std::future::Future;

use crate::error::PipelineError;
use crate::result::ResultSet;
use crate::schema::SchemaMap;

/// Enumerates the tables and columns visible in the configured namespace.
pub trait SchemaIntrospector: Send + Sync + 'static {
    /// Fetch a fresh [`SchemaMap`]. An empty namespace yields an empty map.
    ///
    /// Fails with [`PipelineError::Connection`] when the database cannot be
    /// reached and [`PipelineError::SchemaQuery`] when the metadata query
    /// itself fails.
    fn fetch_schema(&self) -> impl Future<Output = Result<SchemaMap, PipelineError>> + Send;
}

/// Runs one statement and materializes every row it returns.
pub trait QueryExecutor: Send + Sync + 'static {
    /// Fails with [`PipelineError::Execution`] for any driver error,
    /// connection failures included.
    fn execute(&self, query: &str)
    -> impl Future<Output = Result<ResultSet, PipelineError>> + Send;
}

/// Both halves of the database surface.
pub trait Database: SchemaIntrospector + QueryExecutor {}

impl<T: SchemaIntrospector + QueryExecutor> Database for T {}
