use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::TryStreamExt;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Column, Either, Executor, PgPool, Statement};
use tracing::info;

use super::executor::{DatabaseError, QueryExecutor, QueryOutput};
use super::row::{bind_param, row_to_json};
use crate::config::DatabaseConfig;

/// Owns the process-wide connection pool: created once at startup, closed on shutdown
pub struct DatabaseManager {
    pool: PgPool,
}

impl DatabaseManager {
    /// Connect the pool using the configured URL and limits
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let url = config
            .url
            .as_deref()
            .ok_or(DatabaseError::ConfigMissing("DATABASE_URL or DB_HOST/DB_NAME"))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await?;

        info!(
            "Created database pool (max_connections={}, schema={})",
            config.max_connections, config.schema
        );
        Ok(Self { pool })
    }

    /// Executor handle sharing this manager's pool
    pub fn executor(&self, config: &DatabaseConfig) -> PgExecutor {
        PgExecutor::new(self.pool.clone(), config)
    }

    /// Close the pool, waiting for checked-out connections to be returned
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Closed database pool");
    }

    /// Assemble a connection URL from individual settings
    pub fn build_connection_string(
        host: &str,
        port: u16,
        user: &str,
        password: Option<&str>,
        database: &str,
    ) -> Result<String, DatabaseError> {
        let mut url = url::Url::parse(&format!("postgres://{}", host))
            .map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        url.set_port(Some(port)).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        url.set_username(user).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        url.set_password(password).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        url.set_path(&format!("/{}", database));
        Ok(url.into())
    }
}

/// [`QueryExecutor`] backed by a sqlx `PgPool`
#[derive(Clone)]
pub struct PgExecutor {
    pool: PgPool,
    log_queries: bool,
    slow_query_threshold: Option<Duration>,
}

impl PgExecutor {
    pub fn new(pool: PgPool, config: &DatabaseConfig) -> Self {
        Self {
            pool,
            log_queries: config.enable_query_logging,
            slow_query_threshold: config
                .enable_slow_query_warning
                .then(|| Duration::from_millis(config.slow_query_threshold_ms)),
        }
    }

    async fn fetch(&self, sql: &str, params: &[Value]) -> Result<QueryOutput, DatabaseError> {
        let mut rows = Vec::new();
        let mut row_count = 0u64;

        if params.is_empty() {
            // Unprepared: simple protocol, allows several statements in one string
            let mut stream = self.pool.fetch_many(sql);
            while let Some(item) = stream.try_next().await? {
                match item {
                    Either::Left(done) => row_count += done.rows_affected(),
                    Either::Right(row) => rows.push(row_to_json(&row)),
                }
            }
        } else {
            let mut q = sqlx::query(sql);
            for p in params {
                q = bind_param(q, p);
            }
            let mut stream = q.fetch_many(&self.pool);
            while let Some(item) = stream.try_next().await? {
                match item {
                    Either::Left(done) => row_count += done.rows_affected(),
                    Either::Right(row) => rows.push(row_to_json(&row)),
                }
            }
        }

        Ok(QueryOutput::from_rows(rows, row_count))
    }
}

#[async_trait]
impl QueryExecutor for PgExecutor {
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryOutput, DatabaseError> {
        if self.log_queries {
            tracing::debug!(params = params.len(), "SQL: {}", sql);
        }

        let started = Instant::now();
        let result = self.fetch(sql, params).await;
        let elapsed = started.elapsed();

        if let Some(threshold) = self.slow_query_threshold {
            if elapsed > threshold {
                tracing::warn!("Slow query ({} ms): {}", elapsed.as_millis(), sql);
            }
        }

        result
    }

    async fn result_columns(&self, sql: &str) -> Result<Vec<String>, DatabaseError> {
        let statement = self.pool.prepare(sql).await?;
        Ok(statement.columns().iter().map(|c| c.name().to_string()).collect())
    }
}
