//! System/health API handlers.
//!
//! # Purpose
//! A lightweight probe endpoint for operators and readiness checks. It is the
//! only route outside the auth surface and requires no credential.
use crate::api::error::{ApiError, api_internal};
use crate::api::types::HealthStatus;
use crate::app::AppState;
use axum::Json;
use axum::extract::State;

#[utoipa::path(
    get,
    path = "/system/health",
    tag = "system",
    responses(
        (status = 200, description = "Service and store health", body = HealthStatus),
        (status = 500, description = "Backing store unavailable", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn system_health(
    State(state): State<AppState>,
) -> Result<Json<HealthStatus>, ApiError> {
    // Probe the backing store so a dead database surfaces here, not on the
    // first signin.
    if let Err(err) = state.store.health_check().await {
        return Err(api_internal("storage unavailable", &err));
    }
    Ok(Json(HealthStatus {
        status: "ok".to_string(),
    }))
}
