use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route(
            "/push/start-pipeline",
            post(handlers::trigger::start_pipeline),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
