// handlers/elevated/sql_playground.rs - POST /api/sql-playground handler

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;

use super::{audit, require_privileged};
use crate::api::csv::to_csv;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, AuthUser};
use crate::server::AppState;

pub const CSV_FILENAME: &str = "query_result.csv";

#[derive(Debug, Deserialize)]
pub struct PlaygroundRequest {
    #[serde(alias = "sql")]
    pub query: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct PlaygroundQuery {
    pub download: Option<String>,
}

/**
 * POST /api/sql-playground - run arbitrary SQL
 *
 * Body: `{"query": "SELECT ..."}`. The statement text is executed verbatim,
 * multiple statements included. Returns `{columns, rows, rowCount}` or, with
 * `?download=csv`, the result rendered as a CSV attachment.
 *
 * Errors from the database are relayed unmodified with status 400.
 */
pub async fn execute(
    State(state): State<AppState>,
    user: Option<Extension<AuthUser>>,
    Query(params): Query<PlaygroundQuery>,
    payload: Result<Json<PlaygroundRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    require_privileged(&state)?;
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;

    audit(&state, user.as_deref(), "sql", &request.query);

    let output = state.playground.execute(&request.query).await?;

    if params.download.as_deref() == Some("csv") {
        let disposition = format!("attachment; filename=\"{}\"", CSV_FILENAME);
        return Ok((
            [
                (header::CONTENT_TYPE, HeaderValue::from_static("text/csv; charset=utf-8")),
                (
                    header::CONTENT_DISPOSITION,
                    HeaderValue::from_str(&disposition)
                        .map_err(|e| ApiError::internal_server_error(e.to_string()))?,
                ),
            ],
            to_csv(&output),
        )
            .into_response());
    }

    Ok(ApiResponse::success(output).into_response())
}
