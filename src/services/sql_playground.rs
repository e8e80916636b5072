use std::sync::Arc;

use super::CrudError;
use crate::database::{QueryExecutor, QueryOutput};

/// Runs operator-supplied SQL verbatim. No validation and no statement
/// whitelist: callers must sit behind the access gate.
#[derive(Clone)]
pub struct SqlPlayground {
    executor: Arc<dyn QueryExecutor>,
}

impl SqlPlayground {
    pub fn new(executor: Arc<dyn QueryExecutor>) -> Self {
        Self { executor }
    }

    pub async fn execute(&self, sql: &str) -> Result<QueryOutput, CrudError> {
        if sql.trim().is_empty() {
            return Err(CrudError::QueryExecutionError("Query is empty".to_string()));
        }

        let mut output = self.executor.query(sql, &[]).await.map_err(|e| {
            tracing::warn!("Ad-hoc SQL failed: {}", e);
            CrudError::from_adhoc(e)
        })?;

        // A query that matched nothing still has a header
        if output.rows.is_empty() && output.columns.is_empty() {
            match self.executor.result_columns(sql).await {
                Ok(columns) => output.columns = columns,
                Err(e) => tracing::debug!("No result columns for ad-hoc SQL: {}", e),
            }
        }

        Ok(output)
    }
}
