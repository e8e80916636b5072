pub mod catalog;
pub mod executor;
pub mod manager;
pub mod query_builder;
pub mod row;

pub use catalog::{ColumnInfo, TableCatalog};
pub use executor::{DatabaseError, QueryExecutor, QueryOutput, Row, SqlStatement};
pub use manager::{DatabaseManager, PgExecutor};
pub use query_builder::{ColumnSpec, QueryBuilder};
