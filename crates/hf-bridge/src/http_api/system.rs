use std::sync::Arc;

use axum::{extract::State, response::Html, Json};
use serde::{Deserialize, Serialize};
use tracing::warn;

use hf_core::mode::Mode;
use hf_core::status::PollerStatus;

use super::state::ApiState;
use crate::api_error::ApiError;

/// GET /reboot
pub(crate) async fn reboot(State(state): State<Arc<ApiState>>) -> Result<Html<&'static str>, ApiError> {
    warn!("reboot requested from dashboard");
    state
        .devices
        .system
        .reboot()
        .await
        .map_err(|e| ApiError::InternalError(e.to_string()))?;
    Ok(Html("<h1>Rebooting...</h1>"))
}

/// Body of `GET /api/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub mode: Mode,
    /// `None` when the monitor did not answer.
    pub brightness: Option<u8>,
    pub poller: PollerStatus,
}

/// GET /api/status
pub(crate) async fn status(State(state): State<Arc<ApiState>>) -> Json<StatusResponse> {
    let brightness = state
        .devices
        .monitor
        .get_brightness()
        .await
        .inspect_err(|e| warn!(error = %e, "brightness query failed"))
        .ok();
    let poller = state.status.read().await.clone();
    Json(StatusResponse {
        mode: state.mode.current(),
        brightness,
        poller,
    })
}
