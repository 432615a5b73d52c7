//! Prompt → rows orchestration for a single request.

use tracing::{debug, info, info_span, Instrument};

use crate::db::Database;
use crate::error::PipelineError;
use crate::generator::QueryGenerator;
use crate::result::ResultSet;

/// Everything the results view shows after a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    /// The prompt exactly as submitted.
    pub prompt: String,
    /// The cleaned statement that was executed.
    pub sql: String,
    pub result: ResultSet,
}

/// Runs schema fetch → generation → execution, stopping at the first failure.
///
/// Holds no per-request state; one instance serves concurrent requests.
#[derive(Debug)]
pub struct Pipeline<D> {
    db: D,
    generator: QueryGenerator,
}

impl<D: Database> Pipeline<D> {
    pub fn new(db: D, generator: QueryGenerator) -> Self {
        Self { db, generator }
    }

    pub fn database(&self) -> &D {
        &self.db
    }

    pub async fn run(&self, prompt: &str) -> Result<QueryOutcome, PipelineError> {
        let span = info_span!("pipeline", prompt_len = prompt.len());
        async move {
            let schema = self.db.fetch_schema().await?;
            debug!(tables = schema.len(), "schema ready");

            let sql = self.generator.generate_sql(prompt, &schema).await?;
            info!(sql = %sql, "generated query");

            let result = self.db.execute(&sql).await?;
            debug!(rows = result.rows.len(), "query returned");

            Ok(QueryOutcome {
                prompt: prompt.to_owned(),
                sql,
                result,
            })
        }
        .instrument(span)
        .await
    }
}
