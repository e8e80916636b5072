// handlers/public - endpoints reachable without credentials

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::{json, Value};

use crate::server::AppState;

/// GET / - service description
pub async fn root(State(state): State<AppState>) -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "name": "Table API (Rust)",
        "version": version,
        "environment": format!("{:?}", state.config.environment),
        "endpoints": {
            "health": "GET /health (public)",
            "tables": "GET /api/tables",
            "read": "GET /api/:table?page=&limit=",
            "insert": "POST /api/:table",
            "update": "PUT /api/:table/:id",
            "delete": "DELETE /api/:table/:id",
            "sql": "POST /api/sql-playground[?download=csv] (privileged)",
            "ddl": "POST /api/create-table (privileged)",
        }
    }))
}

/// GET /health - pings the pool
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.executor.query("SELECT 1", &[]).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "database": "ok"
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "timestamp": now,
                    "database": "unavailable"
                })),
            )
        }
    }
}
