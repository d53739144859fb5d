use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use tracing::info;

use super::state::ApiState;
use crate::api_error::ApiError;

/// Parse a brightness path segment: a base-10 integer within `0..=100`.
pub(crate) fn parse_level(raw: &str) -> Result<u32, ApiError> {
    let level: u32 = raw.trim().parse().map_err(|_| {
        ApiError::BadRequest(format!("brightness must be an integer between 0 and 100, got '{raw}'"))
    })?;
    if level > 100 {
        return Err(ApiError::BadRequest(format!(
            "brightness must be between 0 and 100, got {level}"
        )));
    }
    Ok(level)
}

/// GET /brightness/set/{level}
pub(crate) async fn set_brightness(
    State(state): State<Arc<ApiState>>,
    Path(raw): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let level = parse_level(&raw)?;
    state.devices.monitor.set_brightness(level).await?;
    info!(level, "brightness updated");
    Ok(Json(json!({ "status": "ok", "brightness": level })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_boundaries() {
        assert_eq!(parse_level("0").unwrap(), 0);
        assert_eq!(parse_level("100").unwrap(), 100);
        assert_eq!(parse_level("42").unwrap(), 42);
    }

    #[test]
    fn rejects_out_of_range_and_garbage() {
        for raw in ["101", "-1", "abc", "", "50.5", "99999999999"] {
            assert!(
                matches!(parse_level(raw), Err(ApiError::BadRequest(_))),
                "{raw:?} should be rejected"
            );
        }
    }
}
