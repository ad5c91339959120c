mod config;
mod error;
mod event;
mod routes;
mod services;
mod state;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::services::executor::{CodeExecutor, HttpExecutor};

#[tokio::main]
async fn main() {
    let dotenv = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    if let Ok(path) = dotenv {
        tracing::info!(path = %path.display(), "loaded .env");
    }

    let config = config::ServerConfig::from_env().expect("invalid configuration");

    // Code runner is optional: /api/run and /api/analyze answer 503 without it.
    let executor: Option<Arc<dyn CodeExecutor>> = if config.has_executor() {
        match HttpExecutor::new(config.run_url.clone(), config.analyze_url.clone(), config.exec_timeouts) {
            Ok(executor) => {
                tracing::info!(run = ?config.run_url, analyze = ?config.analyze_url, "code executor configured");
                Some(Arc::new(executor))
            }
            Err(e) => {
                tracing::warn!(error = %e, "code executor init failed; run/analyze disabled");
                None
            }
        }
    } else {
        tracing::warn!("RUN_URL/ANALYZE_URL not set; run/analyze disabled");
        None
    };

    let state = state::AppState::new(config.eviction, executor, config.queue_capacity);

    let _reaper = services::registry::spawn_reaper(state.rooms.clone(), config.reap_interval);

    let app = routes::app(state, config.static_dir.as_deref());
    let port = config.port;
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "collabcode listening");
    axum::serve(listener, app).await.expect("server failed");
}
