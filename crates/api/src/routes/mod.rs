pub mod access;
pub mod health;
pub mod sessions;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /access/generate-code                issue grant code (POST)
/// /access/grant                        push direct grant (POST)
/// /access/block                        block device (POST)
/// /access/block-time/{device_id}       remaining block time (GET)
///
/// /sessions                            list, delete all (GET, DELETE)
/// /sessions/{id}                       delete one (DELETE)
/// ```
///
/// Every route requires the administrator password.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/access", access::router())
        .nest("/sessions", sessions::router())
}
