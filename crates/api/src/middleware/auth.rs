//! Administrator authentication extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use curfew_core::error::CoreError;

use crate::auth::password::verify_password;
use crate::error::AppError;
use crate::state::AppState;

/// Proof that the request carried the administrator password.
///
/// The `Authorization` header holds the password either bare or as a
/// `Bearer` token; it is checked against `ADMIN_PASSWORD_HASH`. With no hash
/// configured every request is rejected.
///
/// ```ignore
/// async fn my_handler(_admin: RequireAdmin) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RequireAdmin;

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing Authorization header".into(),
                ))
            })?;

        let password = auth_header
            .strip_prefix("Bearer ")
            .unwrap_or(auth_header)
            .trim();

        let hash = state.config.admin_password_hash.as_deref().ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Administrative access is not configured".into(),
            ))
        })?;

        let valid = verify_password(password, hash).map_err(|e| {
            tracing::error!(error = %e, "ADMIN_PASSWORD_HASH is not a valid PHC string");
            AppError::Core(CoreError::Unauthorized("Invalid credentials".into()))
        })?;

        if !valid {
            tracing::warn!("Rejected administrative request with wrong password");
            return Err(AppError::Core(CoreError::Unauthorized(
                "Invalid credentials".into(),
            )));
        }

        Ok(RequireAdmin)
    }
}
