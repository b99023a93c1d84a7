use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handler::{self, AppState};

/// Build the axum router with all binder endpoints.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handler::health_handler))
        .route("/healthz", get(handler::readiness_handler))
        .route("/v1/info", get(handler::info_handler))
        .route("/ssot/binder", get(handler::binder_handler))
        .route("/ssot/binder/validate", post(handler::validate_handler))
        .route("/ssot/binder/entries/:artifact_id", get(handler::entry_handler))
        .route("/ssot/binder/entries/:artifact_id/proof", get(handler::proof_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
