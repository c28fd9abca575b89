//! HTTP and WebSocket surface

pub mod error;
pub mod routes;
pub mod ws;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::core::AppState;

pub use error::ApiError;

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(routes::index))
        .route("/health", get(routes::health_check))
        .route("/ws", get(ws::websocket_handler))
        .route("/api/v1/status", get(routes::status))
        .route("/api/v1/prompt", post(routes::prompt))
        .route("/api/v1/execute", post(routes::execute))
        .route("/api/v1/chat/{agent}", post(routes::chat))
        .route("/api/v1/execute_generation", post(routes::execute_generation))
        .route("/api/v1/approve_asset", post(routes::approve_asset))
        .route(
            "/api/v1/integrate_and_playtest",
            post(routes::integrate_and_playtest),
        )
        .route("/api/v1/assets", get(routes::list_assets))
        .route("/api/v1/assets/{id}", get(routes::get_asset))
        .route("/api/v1/conversations", get(routes::list_conversations))
        .nest_service("/output", ServeDir::new(&state.paths.output_dir))
        .nest_service(
            "/project_assets",
            ServeDir::new(&state.paths.project_assets_dir),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub struct HubServer {
    host: String,
    port: u16,
    state: Arc<AppState>,
}

impl HubServer {
    pub fn new(host: impl Into<String>, port: u16, state: Arc<AppState>) -> Self {
        Self {
            host: host.into(),
            port,
            state,
        }
    }

    pub async fn run(&self) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid bind address {}:{}", self.host, self.port))?;

        let app = router(self.state.clone());

        info!("GB Studio Hub listening on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}
