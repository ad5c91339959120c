//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Binds the realtime websocket endpoint and the JSON API under a single
//! Axum router. When a static directory is configured, the browser client
//! is served from it as the fallback.

pub mod api;
pub mod ws;

use std::path::Path;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Full application router.
pub fn app(state: AppState, static_dir: Option<&Path>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let router = Router::new()
        .route("/ws", get(ws::handle_ws))
        .route("/api/run", post(api::run_code))
        .route("/api/analyze", post(api::analyze_code))
        .route("/api/groups", get(api::list_groups).post(api::create_group))
        .route("/api/sessions/{id}", get(api::get_session))
        .route("/healthz", get(healthz))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true)),
        None => router,
    }
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
