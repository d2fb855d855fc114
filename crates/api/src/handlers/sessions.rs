//! Handlers for listing and deleting device sessions.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use curfew_core::session::Session;

use crate::error::AppResult;
use crate::middleware::auth::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/sessions
///
/// Every session record, newest first.
pub async fn list_sessions(
    _admin: RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<Session>>>> {
    let sessions = state.control.list_sessions().await?;
    Ok(Json(DataResponse { data: sessions }))
}

/// DELETE /api/v1/sessions/{id}
///
/// Delete a session and close its connection if live. Returns 204.
pub async fn delete_session(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.control.delete_session(&id).await?;
    tracing::info!(session_id = %id, "Session deleted by administrator");
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/sessions
///
/// Delete every session. Returns 204.
pub async fn delete_all_sessions(
    _admin: RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<StatusCode> {
    let count = state.control.delete_all_sessions().await?;
    tracing::info!(count, "All sessions deleted by administrator");
    Ok(StatusCode::NO_CONTENT)
}
