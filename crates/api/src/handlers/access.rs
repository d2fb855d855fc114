//! Handlers for grant codes, direct grants and device blocks.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body shared by every duration-carrying access request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDurationRequest {
    pub device_id: String,
    pub seconds: i64,
}

impl DeviceDurationRequest {
    fn device_id(&self) -> AppResult<&str> {
        let device_id = self.device_id.trim();
        if device_id.is_empty() {
            return Err(AppError::BadRequest("deviceId must not be empty".into()));
        }
        Ok(device_id)
    }
}

#[derive(Debug, Serialize)]
pub struct GrantCodeResponse {
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct DurationResponse {
    pub seconds: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockTimeResponse {
    pub remaining_seconds: Option<u64>,
}

/// POST /api/v1/access/generate-code
///
/// Issue a grant code for the device's live session.
pub async fn generate_code(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<DeviceDurationRequest>,
) -> AppResult<Json<DataResponse<GrantCodeResponse>>> {
    let code = state
        .control
        .grant_time_for_device(input.device_id()?, input.seconds)
        .await?;

    Ok(Json(DataResponse {
        data: GrantCodeResponse { code },
    }))
}

/// POST /api/v1/access/grant
///
/// Push `GRANTED:<seconds>` straight to the device.
pub async fn grant_access(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<DeviceDurationRequest>,
) -> AppResult<Json<DataResponse<DurationResponse>>> {
    let seconds = state
        .control
        .grant_access(input.device_id()?, input.seconds)
        .await?;

    Ok(Json(DataResponse {
        data: DurationResponse { seconds },
    }))
}

/// POST /api/v1/access/block
///
/// Start a block window and push `BLOCK:<seconds>` to the device.
pub async fn block_device(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<DeviceDurationRequest>,
) -> AppResult<Json<DataResponse<DurationResponse>>> {
    let seconds = state
        .control
        .block_device(input.device_id()?, input.seconds)
        .await?;

    Ok(Json(DataResponse {
        data: DurationResponse { seconds },
    }))
}

/// GET /api/v1/access/block-time/{device_id}
///
/// Seconds left in the device's block window; `null` when not blocked.
pub async fn block_time(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> AppResult<Json<DataResponse<BlockTimeResponse>>> {
    let remaining_seconds = state.control.remaining_block_time(&device_id).await?;

    Ok(Json(DataResponse {
        data: BlockTimeResponse { remaining_seconds },
    }))
}
