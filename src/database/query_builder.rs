//! SQL text generation for table-driven CRUD.
//!
//! Only identifiers are ever written into SQL text, and only after they have
//! been validated (tables against the live catalog, columns against
//! [`is_safe_identifier`] and the table's column list). Every data value is
//! returned as a positional parameter in [`SqlStatement::params`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::executor::SqlStatement;

/// Longest identifier PostgreSQL keeps without truncation (NAMEDATALEN - 1)
pub const MAX_IDENTIFIER_LEN: usize = 63;

#[derive(Debug, Error, PartialEq)]
pub enum QueryBuildError {
    #[error("Invalid table name: {0}")]
    InvalidTableName(String),

    #[error("Invalid column name: {0}")]
    InvalidColumn(String),

    #[error("At least one column is required")]
    EmptyColumns,

    #[error("Column '{0}' is missing a type")]
    MissingType(String),
}

/// One column of a CREATE TABLE request; `type` and `constraints` are DDL fragments used verbatim
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default)]
    pub constraints: Option<String>,
}

/// A column name paired with the type its parameter is cast to and the value to bind
#[derive(Debug, Clone, PartialEq)]
pub struct BoundColumn {
    pub name: String,
    /// Base type without typmod (`character varying`, not `character varying(5)`):
    /// an explicit cast to a length-limited type truncates instead of failing
    pub cast_type: String,
    pub value: Value,
}

/// Alphanumeric plus underscore, non-empty, within PostgreSQL's identifier length
pub fn is_safe_identifier(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_IDENTIFIER_LEN
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Quote SQL identifier to prevent injection
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Render a JSON value as the text parameter PostgreSQL will cast to the column type
pub fn text_param(value: &Value) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::String(s) => Value::String(s.clone()),
        Value::Bool(b) => Value::String(b.to_string()),
        Value::Number(n) => Value::String(n.to_string()),
        Value::Array(_) | Value::Object(_) => Value::String(value.to_string()),
    }
}

/// Builds statements against one (already validated) table
pub struct QueryBuilder {
    table: String,
}

impl QueryBuilder {
    pub fn new(table_name: &str) -> Self {
        Self { table: quote_identifier(table_name) }
    }

    pub fn count(&self) -> SqlStatement {
        SqlStatement::raw(format!("SELECT COUNT(*) AS count FROM {}", self.table))
    }

    /// Unordered page: rows come back in whatever order the database returns them
    pub fn select_page(&self, limit: i64, offset: i64) -> SqlStatement {
        SqlStatement::new(
            format!("SELECT * FROM {} LIMIT $1 OFFSET $2", self.table),
            vec![Value::from(limit), Value::from(offset)],
        )
    }

    pub fn insert(&self, columns: &[BoundColumn]) -> Result<SqlStatement, QueryBuildError> {
        Self::check_columns(columns)?;

        let names = columns
            .iter()
            .map(|c| quote_identifier(&c.name))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = columns
            .iter()
            .enumerate()
            .map(|(i, c)| placeholder(i + 1, &c.cast_type))
            .collect::<Vec<_>>()
            .join(", ");

        Ok(SqlStatement::new(
            format!("INSERT INTO {} ({}) VALUES ({}) RETURNING *", self.table, names, placeholders),
            columns.iter().map(|c| text_param(&c.value)).collect(),
        ))
    }

    pub fn update(&self, columns: &[BoundColumn], id: &BoundColumn) -> Result<SqlStatement, QueryBuildError> {
        Self::check_columns(columns)?;

        let assignments = columns
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{} = {}", quote_identifier(&c.name), placeholder(i + 1, &c.cast_type)))
            .collect::<Vec<_>>()
            .join(", ");

        let mut params: Vec<Value> = columns.iter().map(|c| text_param(&c.value)).collect();
        params.push(text_param(&id.value));

        Ok(SqlStatement::new(
            format!(
                "UPDATE {} SET {} WHERE {} = {} RETURNING *",
                self.table,
                assignments,
                quote_identifier(&id.name),
                placeholder(params.len(), &id.cast_type)
            ),
            params,
        ))
    }

    pub fn delete(&self, id: &BoundColumn) -> SqlStatement {
        SqlStatement::new(
            format!(
                "DELETE FROM {} WHERE {} = {}",
                self.table,
                quote_identifier(&id.name),
                placeholder(1, &id.cast_type)
            ),
            vec![text_param(&id.value)],
        )
    }

    /// CREATE TABLE from caller-supplied column specs. Names must be safe identifiers;
    /// types and constraints are passed through as written.
    pub fn create_table(table_name: &str, columns: &[ColumnSpec]) -> Result<SqlStatement, QueryBuildError> {
        if !is_safe_identifier(table_name) {
            return Err(QueryBuildError::InvalidTableName(table_name.to_string()));
        }
        if columns.is_empty() {
            return Err(QueryBuildError::EmptyColumns);
        }

        let mut defs = Vec::with_capacity(columns.len());
        for column in columns {
            if !is_safe_identifier(&column.name) {
                return Err(QueryBuildError::InvalidColumn(column.name.clone()));
            }
            let data_type = column.data_type.trim();
            if data_type.is_empty() {
                return Err(QueryBuildError::MissingType(column.name.clone()));
            }
            let mut def = format!("{} {}", quote_identifier(&column.name), data_type);
            if let Some(constraints) = column.constraints.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
                def.push(' ');
                def.push_str(constraints);
            }
            defs.push(def);
        }

        Ok(SqlStatement::raw(format!(
            "CREATE TABLE {} ({})",
            quote_identifier(table_name),
            defs.join(", ")
        )))
    }

    fn check_columns(columns: &[BoundColumn]) -> Result<(), QueryBuildError> {
        if columns.is_empty() {
            return Err(QueryBuildError::EmptyColumns);
        }
        match columns.iter().find(|c| !is_safe_identifier(&c.name)) {
            Some(bad) => Err(QueryBuildError::InvalidColumn(bad.name.clone())),
            None => Ok(()),
        }
    }
}

fn placeholder(index: usize, cast_type: &str) -> String {
    format!("${}::{}", index, cast_type)
}
