use thiserror::Error;

/// The step of the request pipeline an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    SchemaFetch,
    Generation,
    Execution,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::SchemaFetch => "schema_fetch",
            Stage::Generation => "generation",
            Stage::Execution => "execution",
        }
    }
}

/// Every way a single prompt → rows request can fail.
///
/// Each variant carries the underlying cause as text; the rendered message
/// is what the error view shows to the user.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The database could not be reached (schema fetch or execution).
    #[error("database connection failed: {0}")]
    Connection(String),

    /// The metadata query against `INFORMATION_SCHEMA` failed.
    #[error("schema introspection failed: {0}")]
    SchemaQuery(String),

    /// The generation endpoint failed or streamed something unusable.
    #[error("error generating SQL query: {0}")]
    Generation(String),

    /// The generated statement failed to run.
    #[error("query execution failed: {0}")]
    Execution(String),
}

impl PipelineError {
    /// Which stage produced this error.
    ///
    /// Connection failures are attributed to schema fetch, the first stage
    /// that opens a connection.
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Connection(_) | PipelineError::SchemaQuery(_) => Stage::SchemaFetch,
            PipelineError::Generation(_) => Stage::Generation,
            PipelineError::Execution(_) => Stage::Execution,
        }
    }
}
