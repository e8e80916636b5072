use std::sync::Arc;

use serde_json::Value;

use super::CrudError;
use crate::database::catalog::{ColumnInfo, TableCatalog};
use crate::database::query_builder::{is_safe_identifier, BoundColumn, ColumnSpec, QueryBuilder};
use crate::database::{QueryExecutor, Row};
use crate::types::{Page, PageRequest};

/// Primary key column addressed by `/api/:table/:id`
pub const ID_COLUMN: &str = "id";

/// Table-driven CRUD: validates identifiers against the live catalog, then
/// runs parameterized statements built by [`QueryBuilder`]
#[derive(Clone)]
pub struct TableService {
    executor: Arc<dyn QueryExecutor>,
    catalog: TableCatalog,
}

impl TableService {
    pub fn new(executor: Arc<dyn QueryExecutor>, schema: impl Into<String>) -> Self {
        let catalog = TableCatalog::new(executor.clone(), schema);
        Self { executor, catalog }
    }

    pub async fn list_tables(&self) -> Result<Vec<String>, CrudError> {
        Ok(self.catalog.list_tables().await?)
    }

    pub async fn is_valid_table(&self, name: &str) -> Result<bool, CrudError> {
        Ok(self.catalog.is_valid_table(name).await?)
    }

    /// Paginated `SELECT *`; row order is unspecified
    pub async fn select_page(&self, table: &str, request: PageRequest) -> Result<Page, CrudError> {
        let builder = self.require_table(table).await?;

        let count = self.executor.run(&builder.count()).await?;
        let total_items = count
            .rows
            .first()
            .and_then(|row| row.get("count"))
            .and_then(count_value)
            .ok_or_else(|| CrudError::QueryError(format!("COUNT on '{}' returned no value", table)))?;

        let page = self
            .executor
            .run(&builder.select_page(request.limit as i64, request.offset()))
            .await?;

        tracing::debug!(
            "Selected page {} of '{}' ({} rows, {} total)",
            request.page,
            table,
            page.rows.len(),
            total_items
        );
        Ok(Page::new(total_items, request, page.rows))
    }

    pub async fn insert_row(&self, table: &str, payload: &Value) -> Result<Row, CrudError> {
        let builder = self.require_table(table).await?;
        let columns = self.catalog.describe_columns(table).await?;
        let bound = bind_payload(table, &columns, payload)?;

        let output = self
            .executor
            .run(&builder.insert(&bound)?)
            .await
            .map_err(CrudError::from_write)?;

        output
            .first_row()
            .ok_or_else(|| CrudError::QueryError(format!("INSERT into '{}' returned no row", table)))
    }

    /// `None` when no row has the given id
    pub async fn update_row(&self, table: &str, id: &str, payload: &Value) -> Result<Option<Row>, CrudError> {
        let builder = self.require_table(table).await?;
        let columns = self.catalog.describe_columns(table).await?;
        let bound = bind_payload(table, &columns, payload)?;
        let id = bind_id(table, &columns, id)?;

        let output = self
            .executor
            .run(&builder.update(&bound, &id)?)
            .await
            .map_err(CrudError::from_write)?;

        Ok(output.first_row())
    }

    /// Idempotent: deleting a missing row is not an error. Returns rows removed.
    pub async fn delete_row(&self, table: &str, id: &str) -> Result<u64, CrudError> {
        let builder = self.require_table(table).await?;
        let columns = self.catalog.describe_columns(table).await?;
        let id = bind_id(table, &columns, id)?;

        let output = self
            .executor
            .run(&builder.delete(&id))
            .await
            .map_err(CrudError::from_write)?;

        Ok(output.row_count)
    }

    /// Privileged DDL passthrough
    pub async fn create_table(&self, name: &str, columns: &[ColumnSpec]) -> Result<(), CrudError> {
        let stmt = QueryBuilder::create_table(name, columns)?;
        self.executor.run(&stmt).await.map_err(CrudError::from_write)?;
        tracing::info!("Created table '{}' with {} columns", name, columns.len());
        Ok(())
    }

    async fn require_table(&self, table: &str) -> Result<QueryBuilder, CrudError> {
        if !self.catalog.is_valid_table(table).await? {
            tracing::warn!("Rejected unknown table name: {:?}", table);
            return Err(CrudError::InvalidTableName(table.to_string()));
        }
        Ok(QueryBuilder::new(table))
    }
}

/// Pair every payload key with its catalog column; rejects unsafe or unknown names
fn bind_payload(table: &str, columns: &[ColumnInfo], payload: &Value) -> Result<Vec<BoundColumn>, CrudError> {
    let object = payload
        .as_object()
        .ok_or_else(|| CrudError::InvalidColumnPayload("Request body must be a JSON object".to_string()))?;
    if object.is_empty() {
        return Err(CrudError::InvalidColumnPayload("Request body must contain at least one column".to_string()));
    }

    object
        .iter()
        .map(|(key, value)| {
            if !is_safe_identifier(key) {
                return Err(CrudError::InvalidColumnPayload(format!("Invalid column name: {}", key)));
            }
            let column = columns
                .iter()
                .find(|c| c.name == *key)
                .ok_or_else(|| CrudError::InvalidColumnPayload(format!("Unknown column '{}' for table '{}'", key, table)))?;
            Ok(BoundColumn {
                name: column.name.clone(),
                cast_type: column.cast_type.clone(),
                value: value.clone(),
            })
        })
        .collect()
}

fn bind_id(table: &str, columns: &[ColumnInfo], id: &str) -> Result<BoundColumn, CrudError> {
    let column = columns
        .iter()
        .find(|c| c.name == ID_COLUMN)
        .ok_or_else(|| CrudError::InvalidColumnPayload(format!("Table '{}' has no '{}' column", table, ID_COLUMN)))?;
    Ok(BoundColumn {
        name: column.name.clone(),
        cast_type: column.cast_type.clone(),
        value: Value::String(id.to_string()),
    })
}

/// COUNT(*) is bigint; accept it as a JSON number or its text form
fn count_value(v: &Value) -> Option<u64> {
    match v {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn columns() -> Vec<ColumnInfo> {
        vec![
            ColumnInfo { name: "id".into(), data_type: "integer".into(), cast_type: "integer".into() },
            ColumnInfo { name: "name".into(), data_type: "text".into(), cast_type: "text".into() },
            ColumnInfo {
                name: "value".into(),
                data_type: "character varying(50)".into(),
                cast_type: "character varying".into(),
            },
        ]
    }

    #[test]
    fn payload_keeps_key_order_and_catalog_types() {
        let bound = bind_payload("items", &columns(), &json!({"value": "1", "name": "A"})).unwrap();
        assert_eq!(bound[0].name, "value");
        // Length limit stays on the column so over-long values fail instead of truncating
        assert_eq!(bound[0].cast_type, "character varying");
        assert_eq!(bound[1].name, "name");
    }

    #[test]
    fn payload_must_be_non_empty_object() {
        assert!(matches!(
            bind_payload("items", &columns(), &json!({})),
            Err(CrudError::InvalidColumnPayload(_))
        ));
        assert!(matches!(
            bind_payload("items", &columns(), &json!(["name"])),
            Err(CrudError::InvalidColumnPayload(_))
        ));
    }

    #[test]
    fn payload_rejects_unsafe_and_unknown_columns() {
        let err = bind_payload("items", &columns(), &json!({"name = 'x' --": 1})).unwrap_err();
        assert!(err.to_string().starts_with("Invalid column name"));
        let err = bind_payload("items", &columns(), &json!({"colour": "red"})).unwrap_err();
        assert_eq!(err.to_string(), "Unknown column 'colour' for table 'items'");
    }

    #[test]
    fn id_requires_id_column() {
        let id = bind_id("items", &columns(), "5").unwrap();
        assert_eq!(id.cast_type, "integer");
        assert_eq!(id.value, json!("5"));
        assert!(bind_id("logs", &columns()[1..], "5").is_err());
    }

    #[test]
    fn count_accepts_number_or_text() {
        assert_eq!(count_value(&json!(3)), Some(3));
        assert_eq!(count_value(&json!("12")), Some(12));
        assert_eq!(count_value(&Value::Null), None);
    }
}
