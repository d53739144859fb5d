use std::sync::Arc;

use axum::{extract::State, response::Redirect};
use tracing::info;

use hf_core::mode::Mode;

use super::state::{today, ApiState};
use crate::api_error::ApiError;

/// GET /screen/on -- manual mode, slideshow running, display on.
pub(crate) async fn screen_on(State(state): State<Arc<ApiState>>) -> Result<Redirect, ApiError> {
    info!("forcing screen on");
    state.mode.set(Mode::Manual, today())?;

    let slideshow = &state.devices.slideshow;
    if !slideshow.is_running().await {
        slideshow.start().await;
        tokio::time::sleep(state.warmup).await;
    }
    state.devices.display.on().await;
    Ok(Redirect::to("/"))
}

/// GET /screen/off -- manual mode, slideshow stopped, display off.
pub(crate) async fn screen_off(State(state): State<Arc<ApiState>>) -> Result<Redirect, ApiError> {
    info!("forcing screen off");
    state.mode.set(Mode::Manual, today())?;
    state.devices.slideshow.stop().await;
    state.devices.display.off().await;
    Ok(Redirect::to("/"))
}

/// GET /screen/auto -- hand control back to the poller.
///
/// The slideshow is stopped before the mode change is published. The poller
/// wakes on that change and must not see a slideshow that is about to die.
pub(crate) async fn screen_auto(State(state): State<Arc<ApiState>>) -> Result<Redirect, ApiError> {
    info!("returning to automatic mode");
    state.devices.slideshow.stop().await;
    state.mode.set(Mode::Auto, today())?;
    Ok(Redirect::to("/"))
}
