pub mod sql_playground;
pub mod table_service;

pub use sql_playground::SqlPlayground;
pub use table_service::TableService;

use thiserror::Error;

use crate::database::query_builder::QueryBuildError;
use crate::database::DatabaseError;

/// Failures of the table-driven CRUD core and the SQL playground
#[derive(Debug, Error)]
pub enum CrudError {
    #[error("Invalid table name: {0}")]
    InvalidTableName(String),

    #[error("{0}")]
    InvalidColumnPayload(String),

    #[error("{0}")]
    InvalidPagination(String),

    /// The database rejected a write; the message is relayed to the caller
    #[error("{message}")]
    ConstraintViolation { message: String, code: Option<String> },

    #[error("Database unavailable: {0}")]
    DatabaseUnavailable(String),

    #[error("Query failed: {0}")]
    QueryError(String),

    /// Ad-hoc SQL failed; the raw database message is relayed
    #[error("{0}")]
    QueryExecutionError(String),
}

impl CrudError {
    /// Map a failure of a write statement (INSERT/UPDATE/DELETE/DDL)
    pub fn from_write(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Query { message, code } => CrudError::ConstraintViolation { message, code },
            other => other.into(),
        }
    }

    /// Map a failure of caller-supplied SQL
    pub fn from_adhoc(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Query { message, .. } => CrudError::QueryExecutionError(message),
            other => other.into(),
        }
    }
}

impl From<DatabaseError> for CrudError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Unavailable(msg) => CrudError::DatabaseUnavailable(msg),
            DatabaseError::Query { message, .. } => CrudError::QueryError(message),
            other => CrudError::DatabaseUnavailable(other.to_string()),
        }
    }
}

impl From<QueryBuildError> for CrudError {
    fn from(err: QueryBuildError) -> Self {
        match err {
            QueryBuildError::InvalidTableName(name) => CrudError::InvalidTableName(name),
            other => CrudError::InvalidColumnPayload(other.to_string()),
        }
    }
}
