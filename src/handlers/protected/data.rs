use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::Value;

use crate::database::Row;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::server::AppState;
use crate::types::{Page, PageRequest};

/// Raw query string; parsed by [`PageRequest::parse`] so bad values map to 400
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// GET /api/:table - paginated rows
pub async fn table_get(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Page> {
    let request = PageRequest::parse(
        query.page.as_deref(),
        query.limit.as_deref(),
        state.config.api.default_page_size,
        state.config.api.max_page_size,
    )?;

    let page = state.tables.select_page(&table, request).await?;
    Ok(ApiResponse::success(page))
}

/// POST /api/:table - insert one row, returns it with generated columns
pub async fn table_post(
    State(state): State<AppState>,
    Path(table): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Row> {
    let Json(payload) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let row = state.tables.insert_row(&table, &payload).await?;
    Ok(ApiResponse::created(row))
}

/// PUT /api/:table/:id - partial update of the named columns
pub async fn record_put(
    State(state): State<AppState>,
    Path((table, id)): Path<(String, String)>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Row> {
    let Json(payload) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;

    match state.tables.update_row(&table, &id, &payload).await? {
        Some(row) => Ok(ApiResponse::success(row)),
        None => Err(ApiError::not_found(format!("Record '{}' not found in table '{}'", id, table))),
    }
}

/// DELETE /api/:table/:id - 204 whether or not the row existed
pub async fn record_delete(
    State(state): State<AppState>,
    Path((table, id)): Path<(String, String)>,
) -> ApiResult<()> {
    let removed = state.tables.delete_row(&table, &id).await?;
    tracing::debug!("Deleted {} row(s) from '{}' with id {}", removed, table, id);
    Ok(ApiResponse::no_content())
}
