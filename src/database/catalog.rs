//! Live lookups against the PostgreSQL catalog. Nothing here is cached: every
//! call is a round trip, so dropped or renamed tables are rejected immediately.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use super::executor::{DatabaseError, QueryExecutor, SqlStatement};

pub const LIST_TABLES_SQL: &str = "SELECT table_name FROM information_schema.tables \
     WHERE table_schema = $1 AND table_type = 'BASE TABLE' ORDER BY table_name";

pub const LIST_COLUMNS_SQL: &str = "SELECT a.attname AS column_name, \
     format_type(a.atttypid, a.atttypmod) AS data_type, \
     format_type(a.atttypid, NULL) AS cast_type \
     FROM pg_catalog.pg_attribute a \
     JOIN pg_catalog.pg_class c ON c.oid = a.attrelid \
     JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace \
     WHERE n.nspname = $1 AND c.relname = $2 AND a.attnum > 0 AND NOT a.attisdropped \
     ORDER BY a.attnum";

/// A column of a live table as reported by the catalog
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    /// Type as rendered by `format_type`, e.g. `integer` or `character varying(255)`
    pub data_type: String,
    /// Same type without its modifier (`character varying`); used for parameter casts
    pub cast_type: String,
}

#[derive(Clone)]
pub struct TableCatalog {
    executor: Arc<dyn QueryExecutor>,
    schema: String,
}

impl TableCatalog {
    pub fn new(executor: Arc<dyn QueryExecutor>, schema: impl Into<String>) -> Self {
        Self { executor, schema: schema.into() }
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Names of the base tables in the application schema, sorted
    pub async fn list_tables(&self) -> Result<Vec<String>, DatabaseError> {
        let stmt = SqlStatement::new(LIST_TABLES_SQL, vec![Value::from(self.schema.as_str())]);
        let output = self.executor.run(&stmt).await?;

        Ok(output
            .rows
            .into_iter()
            .filter_map(|row| row.get("table_name").and_then(|v| v.as_str()).map(str::to_string))
            .collect())
    }

    /// Exact, case-sensitive membership in the live table list
    pub async fn is_valid_table(&self, name: &str) -> Result<bool, DatabaseError> {
        let tables = self.list_tables().await?;
        Ok(tables.iter().any(|t| t == name))
    }

    /// Columns of `table` in ordinal order; empty when the table does not exist
    pub async fn describe_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, DatabaseError> {
        let stmt = SqlStatement::new(
            LIST_COLUMNS_SQL,
            vec![Value::from(self.schema.as_str()), Value::from(table)],
        );
        let output = self.executor.run(&stmt).await?;

        Ok(output
            .rows
            .into_iter()
            .filter_map(|row| {
                let name = row.get("column_name")?.as_str()?.to_string();
                let data_type = row.get("data_type")?.as_str()?.to_string();
                let cast_type = row
                    .get("cast_type")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| base_type(&data_type));
                Some(ColumnInfo { name, data_type, cast_type })
            })
            .collect())
    }
}

/// Strip a type modifier: `character varying(5)` -> `character varying`,
/// `numeric(6,2)[]` -> `numeric[]`
pub fn base_type(data_type: &str) -> String {
    match (data_type.find('('), data_type.find(')')) {
        (Some(open), Some(close)) if open < close => {
            format!("{}{}", data_type[..open].trim_end(), &data_type[close + 1..])
        }
        _ => data_type.to_string(),
    }
}
