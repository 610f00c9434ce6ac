pub mod configure;
pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::analysis::handlers::handle_analyze;
use crate::knowledge::handlers::handle_upload;
use crate::reports::handlers::{handle_get_report, handle_history};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/configure", post(configure::handle_configure))
        // Knowledge base
        .route("/upload", post(handle_upload))
        // Analysis and reports
        .route("/analyze", post(handle_analyze))
        .route("/history", get(handle_history))
        .route("/report/:id", get(handle_get_report))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
