// ---------------------------------------------------------------------------
// HTTP API module directory
// ---------------------------------------------------------------------------
//
// One sub-module per area of the dashboard. This file owns the router and
// re-exports what the daemon needs.

mod brightness;
mod pages;
mod screen;
pub mod state;
pub mod stats;
pub mod system;

pub use state::ApiState;
pub use stats::SystemStats;
pub use system::StatusResponse;

pub use self::router::api_router;

mod router {
    use super::*;
    use axum::{
        http::Uri,
        middleware as axum_middleware,
        routing::get,
        Router,
    };
    use std::sync::Arc;
    use tower_http::trace::TraceLayer;

    use crate::api_error::ApiError;
    use hf_telemetry::middleware::request_id_middleware;

    async fn not_found(uri: Uri) -> ApiError {
        ApiError::NotFound(format!("no route for {}", uri.path()))
    }

    /// Build the dashboard router.
    pub fn api_router(state: Arc<ApiState>) -> Router {
        Router::new()
            .route("/", get(pages::index))
            .route("/screen/on", get(screen::screen_on))
            .route("/screen/off", get(screen::screen_off))
            .route("/screen/auto", get(screen::screen_auto))
            .route("/brightness/set/{level}", get(brightness::set_brightness))
            .route("/system-stats", get(stats::system_stats))
            .route("/reboot", get(system::reboot))
            .route("/api/status", get(system::status))
            .fallback(not_found)
            .layer(axum_middleware::from_fn(request_id_middleware))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}
