//! Route definitions for grant codes and device blocks.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::access;
use crate::state::AppState;

/// Access routes mounted at `/access`.
///
/// ```text
/// POST /generate-code              -> generate_code
/// POST /grant                      -> grant_access
/// POST /block                      -> block_device
/// GET  /block-time/{device_id}     -> block_time
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/generate-code", post(access::generate_code))
        .route("/grant", post(access::grant_access))
        .route("/block", post(access::block_device))
        .route("/block-time/{device_id}", get(access::block_time))
}
