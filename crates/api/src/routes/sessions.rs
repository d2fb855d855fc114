use axum::routing::{delete, get};
use axum::Router;

use crate::handlers::sessions;
use crate::state::AppState;

/// Session routes mounted at `/sessions`.
///
/// ```text
/// GET    /        -> list_sessions
/// DELETE /        -> delete_all_sessions
/// DELETE /{id}    -> delete_session
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(sessions::list_sessions).delete(sessions::delete_all_sessions),
        )
        .route("/{id}", delete(sessions::delete_session))
}
