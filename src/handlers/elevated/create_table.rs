// handlers/elevated/create_table.rs - POST /api/create-table handler

use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{audit, require_privileged};
use crate::database::ColumnSpec;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateTableRequest {
    #[serde(rename = "tableName", alias = "table_name", alias = "name")]
    pub table_name: String,
    pub columns: Vec<ColumnSpec>,
}

/// POST /api/create-table - DDL passthrough. Names are checked as identifiers;
/// column types and constraints are forwarded as written.
pub async fn create(
    State(state): State<AppState>,
    user: Option<Extension<AuthUser>>,
    payload: Result<Json<CreateTableRequest>, JsonRejection>,
) -> ApiResult<Value> {
    require_privileged(&state)?;
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;

    audit(
        &state,
        user.as_deref(),
        "create-table",
        &format!("{} ({} columns)", request.table_name, request.columns.len()),
    );

    state.tables.create_table(&request.table_name, &request.columns).await?;

    Ok(ApiResponse::created(json!({
        "message": format!("Table '{}' created", request.table_name),
        "tableName": request.table_name,
    })))
}
