//! Shared harness: an in-memory stand-in for PostgreSQL plus helpers that drive
//! the router with `tower::ServiceExt::oneshot`.
//!
//! `MemoryDb` understands exactly the statements the service layer emits
//! (catalog lookups, COUNT, paged SELECT, INSERT/UPDATE/DELETE with
//! `$n::type` placeholders, CREATE TABLE). Anything else is treated as ad-hoc
//! SQL and answered from canned results, or rejected with a syntax error.
#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Value};
use tower::ServiceExt;

use table_api_rust::config::AppConfig;
use table_api_rust::database::catalog::{base_type, LIST_COLUMNS_SQL, LIST_TABLES_SQL};
use table_api_rust::database::{DatabaseError, QueryExecutor, QueryOutput, Row};
use table_api_rust::server::{app, AppState};

pub const USER: &str = "admin";
pub const PASSWORD: &str = "s3cret";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Debug, Clone)]
struct MemTable {
    /// (name, catalog type)
    columns: Vec<(String, String)>,
    unique: Vec<String>,
    rows: Vec<Row>,
    next_id: i64,
}

#[derive(Default)]
pub struct MemoryDb {
    tables: Mutex<BTreeMap<String, MemTable>>,
    canned: Mutex<HashMap<String, QueryOutput>>,
    described: Mutex<HashMap<String, Vec<String>>>,
    statements: Mutex<Vec<(String, Vec<Value>)>>,
    unavailable: AtomicBool,
}

impl MemoryDb {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a table; an `id` column of type `integer` is auto-assigned on insert
    pub fn add_table(&self, name: &str, columns: &[(&str, &str)]) {
        self.tables.lock().unwrap().insert(
            name.to_string(),
            MemTable {
                columns: columns.iter().map(|(n, t)| (n.to_string(), t.to_string())).collect(),
                unique: vec![],
                rows: vec![],
                next_id: 1,
            },
        );
    }

    pub fn add_unique(&self, table: &str, column: &str) {
        if let Some(t) = self.tables.lock().unwrap().get_mut(table) {
            t.unique.push(column.to_string());
        }
    }

    pub fn drop_table(&self, name: &str) {
        self.tables.lock().unwrap().remove(name);
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.lock().unwrap().contains_key(name)
    }

    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    pub fn column_types(&self, table: &str) -> Vec<(String, String)> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .map(|t| t.columns.clone())
            .unwrap_or_default()
    }

    /// Result returned for an exact ad-hoc SQL string
    pub fn can(&self, sql: &str, output: QueryOutput) {
        self.canned.lock().unwrap().insert(sql.to_string(), output);
    }

    /// Result columns reported for `sql` without running it
    pub fn describe(&self, sql: &str, columns: &[&str]) {
        self.described
            .lock()
            .unwrap()
            .insert(sql.to_string(), columns.iter().map(|c| c.to_string()).collect());
    }

    pub fn set_unavailable(&self, down: bool) {
        self.unavailable.store(down, Ordering::SeqCst);
    }

    pub fn statements(&self) -> Vec<(String, Vec<Value>)> {
        self.statements.lock().unwrap().clone()
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<QueryOutput, DatabaseError> {
        if sql == "SELECT 1" {
            return Ok(QueryOutput::from_rows(vec![row(&[("?column?", json!(1))])], 1));
        }
        if sql == LIST_TABLES_SQL {
            let tables = self.tables.lock().unwrap();
            let rows = tables
                .keys()
                .map(|name| row(&[("table_name", json!(name))]))
                .collect::<Vec<_>>();
            let n = rows.len() as u64;
            return Ok(QueryOutput::from_rows(rows, n));
        }
        if sql == LIST_COLUMNS_SQL {
            let table = params.get(1).and_then(Value::as_str).unwrap_or_default();
            let rows = self
                .column_types(table)
                .into_iter()
                .map(|(n, t)| {
                    row(&[
                        ("column_name", json!(n)),
                        ("data_type", json!(t)),
                        ("cast_type", json!(base_type(&t))),
                    ])
                })
                .collect::<Vec<_>>();
            let n = rows.len() as u64;
            return Ok(QueryOutput::from_rows(rows, n));
        }
        if let Some(rest) = sql.strip_prefix("SELECT COUNT(*) AS count FROM ") {
            let (table, _) = ident(rest);
            let count = self.with_table(&table, |t| Ok(t.rows.len()))?;
            return Ok(QueryOutput::from_rows(vec![row(&[("count", json!(count))])], 1));
        }
        if let Some(rest) = sql.strip_prefix("SELECT * FROM ") {
            let (table, _) = ident(rest);
            let limit = params.first().and_then(Value::as_i64).unwrap_or(0) as usize;
            let offset = params.get(1).and_then(Value::as_i64).unwrap_or(0) as usize;
            let rows = self.with_table(&table, |t| {
                Ok(t.rows.iter().skip(offset).take(limit).cloned().collect::<Vec<_>>())
            })?;
            let n = rows.len() as u64;
            return Ok(QueryOutput::from_rows(rows, n));
        }
        if let Some(rest) = sql.strip_prefix("INSERT INTO ") {
            return self.insert(rest, params);
        }
        if let Some(rest) = sql.strip_prefix("UPDATE ") {
            return self.update(rest, params);
        }
        if let Some(rest) = sql.strip_prefix("DELETE FROM ") {
            return self.delete(rest, params);
        }
        if let Some(rest) = sql.strip_prefix("CREATE TABLE ") {
            return self.create(rest);
        }

        if let Some(output) = self.canned.lock().unwrap().get(sql) {
            return Ok(output.clone());
        }
        let token = sql.split_whitespace().next().unwrap_or_default();
        Err(DatabaseError::Query {
            message: format!("syntax error at or near \"{}\"", token),
            code: Some("42601".to_string()),
        })
    }

    fn with_table<T>(
        &self,
        table: &str,
        f: impl FnOnce(&mut MemTable) -> Result<T, DatabaseError>,
    ) -> Result<T, DatabaseError> {
        let mut tables = self.tables.lock().unwrap();
        match tables.get_mut(table) {
            Some(t) => f(t),
            None => Err(DatabaseError::Query {
                message: format!("relation \"{}\" does not exist", table),
                code: Some("42P01".to_string()),
            }),
        }
    }

    // "t" ("a", "b") VALUES ($1::text, $2::integer) RETURNING *
    fn insert(&self, rest: &str, params: &[Value]) -> Result<QueryOutput, DatabaseError> {
        let (table, rest) = ident(rest);
        let rest = rest.trim_start().trim_start_matches('(');
        let (names, rest) = rest.split_once(") VALUES (").unwrap_or((rest, ""));
        let (placeholders, _) = rest.split_once(") RETURNING *").unwrap_or((rest, ""));

        let names = names.split(", ").map(|n| ident(n).0).collect::<Vec<_>>();
        let types = placeholders.split(", ").map(cast_type).collect::<Vec<_>>();

        self.with_table(&table, |t| {
            let mut new_row = Row::new();
            for (col, _) in &t.columns {
                new_row.insert(col.clone(), Value::Null);
            }
            for (i, name) in names.iter().enumerate() {
                let value = typed(params.get(i).unwrap_or(&Value::Null), &types[i])?;
                new_row.insert(name.clone(), value);
            }
            if new_row.get("id") == Some(&Value::Null) {
                new_row.insert("id".to_string(), json!(t.next_id));
            }
            if let Some(id) = new_row.get("id").and_then(Value::as_i64) {
                t.next_id = t.next_id.max(id + 1);
            }
            check_length(t, &new_row)?;
            check_unique(&table, t, &new_row, None)?;
            t.rows.push(new_row.clone());
            Ok(QueryOutput::from_rows(vec![new_row], 1))
        })
    }

    // "t" SET "a" = $1::text WHERE "id" = $2::integer RETURNING *
    fn update(&self, rest: &str, params: &[Value]) -> Result<QueryOutput, DatabaseError> {
        let (table, rest) = ident(rest);
        let rest = rest.trim_start().trim_start_matches("SET ");
        let (assignments, condition) = rest.split_once(" WHERE ").unwrap_or((rest, ""));
        let condition = condition.trim_end_matches(" RETURNING *");

        let mut changes = Vec::new();
        for (i, assignment) in assignments.split(", ").enumerate() {
            let (name, placeholder) = assignment.split_once(" = ").unwrap_or((assignment, ""));
            let value = typed(params.get(i).unwrap_or(&Value::Null), &cast_type(placeholder))?;
            changes.push((ident(name).0, value));
        }
        let (id_col, id_placeholder) = condition.split_once(" = ").unwrap_or((condition, ""));
        let id_col = ident(id_col).0;
        let id = typed(params.last().unwrap_or(&Value::Null), &cast_type(id_placeholder))?;

        self.with_table(&table, |t| {
            let Some(pos) = t.rows.iter().position(|r| r.get(&id_col) == Some(&id)) else {
                return Ok(QueryOutput::default());
            };
            let mut updated = t.rows[pos].clone();
            for (name, value) in &changes {
                updated.insert(name.clone(), value.clone());
            }
            check_length(t, &updated)?;
            check_unique(&table, t, &updated, Some(pos))?;
            t.rows[pos] = updated.clone();
            Ok(QueryOutput::from_rows(vec![updated], 1))
        })
    }

    // "t" WHERE "id" = $1::integer
    fn delete(&self, rest: &str, params: &[Value]) -> Result<QueryOutput, DatabaseError> {
        let (table, rest) = ident(rest);
        let condition = rest.trim_start().trim_start_matches("WHERE ");
        let (id_col, placeholder) = condition.split_once(" = ").unwrap_or((condition, ""));
        let id_col = ident(id_col).0;
        let id = typed(params.first().unwrap_or(&Value::Null), &cast_type(placeholder))?;

        self.with_table(&table, |t| {
            let before = t.rows.len();
            t.rows.retain(|r| r.get(&id_col) != Some(&id));
            Ok(QueryOutput {
                row_count: (before - t.rows.len()) as u64,
                ..QueryOutput::default()
            })
        })
    }

    // "t" ("id" SERIAL PRIMARY KEY, "name" TEXT NOT NULL)
    fn create(&self, rest: &str) -> Result<QueryOutput, DatabaseError> {
        let (table, rest) = ident(rest);
        if self.has_table(&table) {
            return Err(DatabaseError::Query {
                message: format!("relation \"{}\" already exists", table),
                code: Some("42P07".to_string()),
            });
        }
        let body = rest.trim().trim_start_matches('(').trim_end_matches(')');

        let mut columns = Vec::new();
        let mut unique = Vec::new();
        for def in body.split(", ") {
            let (name, rest) = ident(def);
            let rest = rest.trim();
            let upper = rest.to_ascii_uppercase();
            let data_type = match upper.split_whitespace().next().unwrap_or_default() {
                "SERIAL" | "INTEGER" | "INT" | "INT4" => "integer".to_string(),
                "BIGINT" | "BIGSERIAL" => "bigint".to_string(),
                "BOOLEAN" | "BOOL" => "boolean".to_string(),
                "TEXT" => "text".to_string(),
                other => other.to_ascii_lowercase(),
            };
            if upper.contains("UNIQUE") {
                unique.push(name.clone());
            }
            columns.push((name, data_type));
        }

        self.tables.lock().unwrap().insert(
            table,
            MemTable { columns, unique, rows: vec![], next_id: 1 },
        );
        Ok(QueryOutput::default())
    }
}

#[async_trait]
impl QueryExecutor for MemoryDb {
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryOutput, DatabaseError> {
        self.statements
            .lock()
            .unwrap()
            .push((sql.to_string(), params.to_vec()));

        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DatabaseError::Unavailable("pool timed out while waiting for an open connection".to_string()));
        }
        self.execute(sql, params)
    }

    async fn result_columns(&self, sql: &str) -> Result<Vec<String>, DatabaseError> {
        self.described
            .lock()
            .unwrap()
            .get(sql)
            .cloned()
            .ok_or_else(|| DatabaseError::query("cannot insert multiple commands into a prepared statement"))
    }
}

pub fn row(pairs: &[(&str, Value)]) -> Row {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

/// Leading `"quoted"` identifier and the remainder
fn ident(s: &str) -> (String, &str) {
    let s = s.trim_start();
    let Some(body) = s.strip_prefix('"') else {
        return (s.to_string(), "");
    };
    let mut name = String::new();
    let mut chars = body.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c == '"' {
            if let Some((_, '"')) = chars.peek() {
                chars.next();
                name.push('"');
                continue;
            }
            return (name, &body[i + 1..]);
        }
        name.push(c);
    }
    (name, "")
}

fn cast_type(placeholder: &str) -> String {
    placeholder
        .split_once("::")
        .map(|(_, t)| t.trim().to_string())
        .unwrap_or_else(|| "text".to_string())
}

/// Apply the placeholder cast to a text parameter, the way PostgreSQL would
fn typed(param: &Value, data_type: &str) -> Result<Value, DatabaseError> {
    let Some(text) = param.as_str() else {
        return Ok(param.clone());
    };
    match data_type {
        "integer" | "bigint" | "smallint" => text.trim().parse::<i64>().map(Value::from).map_err(|_| {
            DatabaseError::Query {
                message: format!("invalid input syntax for type {}: \"{}\"", data_type, text),
                code: Some("22P02".to_string()),
            }
        }),
        "boolean" => match text {
            "true" | "t" => Ok(Value::Bool(true)),
            "false" | "f" => Ok(Value::Bool(false)),
            _ => Err(DatabaseError::Query {
                message: format!("invalid input syntax for type boolean: \"{}\"", text),
                code: Some("22P02".to_string()),
            }),
        },
        _ => Ok(Value::String(text.to_string())),
    }
}

/// Declared `character varying(n)` limits; the cast itself never truncates
fn check_length(t: &MemTable, candidate: &Row) -> Result<(), DatabaseError> {
    for (col, declared) in &t.columns {
        let Some(limit) = declared
            .strip_prefix("character varying(")
            .and_then(|rest| rest.strip_suffix(')'))
            .and_then(|n| n.parse::<usize>().ok())
        else {
            continue;
        };
        if let Some(text) = candidate.get(col).and_then(Value::as_str) {
            if text.chars().count() > limit {
                return Err(DatabaseError::Query {
                    message: format!("value too long for type {}", declared),
                    code: Some("22001".to_string()),
                });
            }
        }
    }
    Ok(())
}

fn check_unique(table: &str, t: &MemTable, candidate: &Row, skip: Option<usize>) -> Result<(), DatabaseError> {
    for col in &t.unique {
        let value = candidate.get(col).unwrap_or(&Value::Null);
        if value.is_null() {
            continue;
        }
        let clash = t
            .rows
            .iter()
            .enumerate()
            .any(|(i, r)| Some(i) != skip && r.get(col) == Some(value));
        if clash {
            return Err(DatabaseError::Query {
                message: format!("duplicate key value violates unique constraint \"{}_{}_key\"", table, col),
                code: Some("23505".to_string()),
            });
        }
    }
    Ok(())
}

/// Development preset with known credentials; rate limiting off
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.database.url = None;
    config.database.schema = "public".to_string();
    config.api.enable_rate_limiting = false;
    config.security.auth_username = Some(USER.to_string());
    config.security.auth_password = Some(PASSWORD.to_string());
    config.security.allow_sql_playground = true;
    config.security.enable_audit_logging = true;
    config
}

pub struct TestApp {
    pub router: Router,
    pub db: Arc<MemoryDb>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: AppConfig) -> Self {
        init_tracing();
        let db = MemoryDb::new();
        let state = AppState::new(config, db.clone());
        Self { router: app(state), db }
    }

    /// Router over a caller-supplied executor; `db` stays empty and unused
    pub fn with_executor(config: AppConfig, executor: Arc<dyn QueryExecutor>) -> Self {
        init_tracing();
        let state = AppState::new(config, executor);
        Self { router: app(state), db: MemoryDb::new() }
    }

    /// `items(id integer, name text, value text)`, the table most tests work on
    pub fn with_items() -> Self {
        let app = Self::new();
        app.db.add_table(
            "items",
            &[("id", "integer"), ("name", "text"), ("value", "text")],
        );
        app
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    /// Authenticated JSON request; returns status and parsed body (Null when empty)
    pub async fn call(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let response = self.send(json_request(method, uri, body, Some((USER, PASSWORD)))).await;
        let status = response.status();
        (status, body_json(response).await)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.call(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::PUT, uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.call(Method::DELETE, uri, None).await
    }
}

pub fn basic_auth(user: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{}:{}", user, password)))
}

pub fn json_request(method: Method, uri: &str, body: Option<Value>, auth: Option<(&str, &str)>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((user, password)) = auth {
        builder = builder.header(header::AUTHORIZATION, basic_auth(user, password));
    }
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    builder.body(body).expect("valid request")
}

pub async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("readable body");
    String::from_utf8_lossy(&bytes).into_owned()
}

pub async fn body_json(response: Response) -> Value {
    let text = body_text(response).await;
    if text.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}
