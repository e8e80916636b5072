// handlers/elevated - privileged SQL behind Basic auth and the playground flag
pub mod create_table;
pub mod sql_playground;

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::server::AppState;

/// Reject unless privileged SQL is enabled for this deployment
pub(crate) fn require_privileged(state: &AppState) -> Result<(), ApiError> {
    if !state.config.security.allow_sql_playground {
        return Err(ApiError::forbidden("SQL playground is disabled"));
    }
    Ok(())
}

pub(crate) fn audit(state: &AppState, user: Option<&AuthUser>, action: &str, detail: &str) {
    if state.config.security.enable_audit_logging {
        let username = user.map(|u| u.username.as_str()).unwrap_or("unknown");
        tracing::info!(target: "audit", user = username, action, "{}", detail);
    }
}
