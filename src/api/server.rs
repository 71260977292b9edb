//! Mapas API Server implementation
//!
//! HTTP API using Axum: matrix import (multipart upload), Tutory export,
//! contest duplication and the matrix tree.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use super::handlers;
use crate::excel::MAX_UPLOAD_BYTES;
use crate::store::Store;

/// Multipart framing allowance on top of the file size ceiling
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// API Server configuration
#[derive(Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub database: PathBuf,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            database: PathBuf::from("mapas.db"),
        }
    }
}

/// Shared application state
pub struct AppState {
    pub version: String,
    pub store: Mutex<Store>,
}

impl AppState {
    pub fn new(store: Store) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            store: Mutex::new(store),
        }
    }
}

/// Build the router with all endpoints and middleware
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health and info endpoints
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/version", get(handlers::version))
        // Matrix
        .route(
            "/api/v1/matriz/importar",
            post(handlers::import_matrix)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + MULTIPART_OVERHEAD)),
        )
        .route("/api/v1/disciplinas", get(handlers::disciplines))
        // Contests
        .route("/api/v1/concursos/:id/exportar", get(handlers::export_tutory))
        .route("/api/v1/concursos/:id/duplicar", post(handlers::duplicate_contest))
        // State and middleware
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Run the API server
pub async fn run_api_server(config: ApiConfig) -> anyhow::Result<()> {
    // The CLI may already have installed a subscriber
    let init = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "mapas_server=info,concurso_mapas=info,tower_http=info".into()
            }),
        )
        .try_init();
    if init.is_err() {
        debug!("tracing subscriber already installed");
    }

    let store = Store::open(&config.database)?;
    let state = Arc::new(AppState::new(store));
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("📚 Mapas API Server starting on http://{}", addr);
    info!("   Database: {}", config.database.display());
    info!("   Endpoints: /api/v1/matriz/importar, /api/v1/disciplinas, /api/v1/concursos/:id/exportar, /api/v1/concursos/:id/duplicar");
    info!("   Health: /health, Version: /version");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Mapas API Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping server...");
}
