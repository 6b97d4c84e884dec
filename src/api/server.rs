//! Estimate Forge API Server implementation
//!
//! HTTP REST API server using Axum. Populates estimation templates in-process
//! and streams the filled workbook back to the caller.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::handlers;

/// Default request body limit (10 MiB)
pub const DEFAULT_MAX_UPLOAD: usize = 10 * 1024 * 1024;

/// API Server configuration
#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    /// Template used when a request names none
    pub template_path: Option<PathBuf>,
    /// Maximum request body size in bytes
    pub max_upload: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            template_path: None,
            max_upload: DEFAULT_MAX_UPLOAD,
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub version: String,
    pub template_path: Option<PathBuf>,
}

/// Build the router with all endpoints and middleware
pub fn build_router(state: Arc<AppState>, max_upload: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health and info endpoints
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/version", get(handlers::version))
        // Core API endpoints
        .route("/api/v1/populate", post(handlers::populate))
        .route("/api/v1/inspect", post(handlers::inspect))
        .route("/api/v1/summary", post(handlers::summary))
        .route("/api/v1/export", post(handlers::export))
        // State and middleware
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Run the API server
pub async fn run_api_server(config: ApiConfig) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "estimate_forge=info,tower_http=info".into()),
        )
        .init();

    let state = Arc::new(AppState {
        version: env!("CARGO_PKG_VERSION").to_string(),
        template_path: config.template_path.clone(),
    });
    let app = build_router(state, config.max_upload);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("🔥 Estimate Forge API Server starting on http://{}", addr);
    info!("   Endpoints: /api/v1/populate, /api/v1/inspect, /api/v1/summary, /api/v1/export");
    match &config.template_path {
        Some(path) => info!("   Default template: {}", path.display()),
        None => info!("   Default template: built-in"),
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Estimate Forge API Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping server...");
}
