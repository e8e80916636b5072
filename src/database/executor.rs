use std::collections::HashSet;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// A single result row keyed by column name, in the column order the driver returned
pub type Row = Map<String, Value>;

/// Errors raised while talking to the database
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// The pool could not hand out a connection (timeout, closed pool, network)
    #[error("Database unavailable: {0}")]
    Unavailable(String),

    /// The server accepted the connection but rejected the statement
    #[error("{message}")]
    Query {
        message: String,
        /// SQLSTATE code reported by PostgreSQL, when there is one
        code: Option<String>,
    },

    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,
}

impl DatabaseError {
    pub fn query(message: impl Into<String>) -> Self {
        DatabaseError::Query { message: message.into(), code: None }
    }

    pub fn sqlstate(&self) -> Option<&str> {
        match self {
            DatabaseError::Query { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => DatabaseError::Unavailable(err.to_string()),
            sqlx::Error::Database(db_err) => DatabaseError::Query {
                message: db_err.message().to_string(),
                code: db_err.code().map(|c| c.into_owned()),
            },
            other => DatabaseError::query(other.to_string()),
        }
    }
}

/// A statement with positional `$n` placeholders and the values bound to them
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl SqlStatement {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self { sql: sql.into(), params }
    }

    pub fn raw(sql: impl Into<String>) -> Self {
        Self { sql: sql.into(), params: vec![] }
    }
}

/// Rows and affected-row count produced by one call to [`QueryExecutor::query`]
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueryOutput {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    #[serde(rename = "rowCount")]
    pub row_count: u64,
}

impl QueryOutput {
    /// Build an output from rows. Columns are every name any row carries, in
    /// first-seen order, so rows from later statements keep their columns too.
    pub fn from_rows(rows: Vec<Row>, row_count: u64) -> Self {
        let columns = {
            let mut seen = HashSet::new();
            rows.iter()
                .flat_map(|r| r.keys())
                .filter(|name| seen.insert(name.as_str()))
                .cloned()
                .collect()
        };
        Self { columns, rows, row_count }
    }

    pub fn first_row(self) -> Option<Row> {
        self.rows.into_iter().next()
    }
}

/// The connection pool as seen by the core: run one statement, get rows back.
///
/// Statements without parameters may contain several SQL commands; statements
/// with parameters are prepared and must be a single command.
#[async_trait]
pub trait QueryExecutor: Send + Sync + 'static {
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryOutput, DatabaseError>;

    async fn run(&self, statement: &SqlStatement) -> Result<QueryOutput, DatabaseError> {
        self.query(&statement.sql, &statement.params).await
    }

    /// Result column names of a single statement, without executing it
    async fn result_columns(&self, _sql: &str) -> Result<Vec<String>, DatabaseError> {
        Ok(vec![])
    }
}
