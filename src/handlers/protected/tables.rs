use axum::extract::State;

use crate::middleware::{ApiResponse, ApiResult};
use crate::server::AppState;

/// GET /api/tables - names of the tables exposed through the API
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<String>> {
    let tables = state.tables.list_tables().await?;
    Ok(ApiResponse::success(tables))
}
