use anyhow::{Context, Result};
use axum::{Router, routing};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::config::ServerConfig;

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

pub fn init_env() {
    // Missing .env is fine; production sets real environment variables.
    dotenvy::dotenv().ok();
}

/// Finishes wiring the app (state, request tracing, readiness probe) and
/// serves it until the process is stopped.
pub async fn serve(
    service_name: &str,
    app: Router<AppState>,
    state: AppState,
    server: &ServerConfig,
) -> Result<()> {
    let app = app
        .route("/healthz", routing::get(healthz))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", server.host, server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    tracing::info!("{} listening on {}", service_name, addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}
