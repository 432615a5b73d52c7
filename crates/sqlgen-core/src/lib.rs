//! sqlgen-core: turn a natural-language prompt into a SQL Server query with a
//! locally hosted model, run it, and hand back the rows.
//!
//! The request path is strictly sequential:
//! schema fetch → prompt build → generation → cleanup → execution.
//! Nothing here keeps state between requests.

pub mod cleaner;
pub mod db;
pub mod error;
pub mod generator;
pub mod pipeline;
pub mod result;
pub mod schema;

pub use cleaner::clean;
pub use db::mssql::{DbConfig, MssqlDatabase};
pub use db::{Database, QueryExecutor, SchemaIntrospector};
pub use error::{PipelineError, Stage};
pub use generator::{GeneratorConfig, QueryGenerator};
pub use pipeline::{Pipeline, QueryOutcome};
pub use result::{CellValue, ResultSet};
pub use schema::SchemaMap;
