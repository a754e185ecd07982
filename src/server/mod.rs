//! Minimal web form for converting one document at a time.
//!
//! # Example
//!
//! ```rust,no_run
//! use edgequake_doc2md::server::{serve, AppState};
//! use edgequake_doc2md::ConversionConfig;
//!
//! # #[tokio::main]
//! # async fn main() -> std::io::Result<()> {
//! let state = AppState::new(ConversionConfig::default(), "converted_documents");
//! serve("127.0.0.1:7860".parse().unwrap(), state).await
//! # }
//! ```

mod render;
pub mod routes;

use crate::config::ConversionConfig;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Uploads larger than this are rejected before conversion starts.
pub const MAX_UPLOAD_BYTES: usize = 200 * 1024 * 1024;

/// Shared state for the web form.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ConversionConfig>,
    /// Used when the form's output directory is left blank.
    pub default_output_dir: PathBuf,
    /// Held for the duration of a conversion so requests run one at a time.
    conversion_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(config: ConversionConfig, default_output_dir: impl Into<PathBuf>) -> Self {
        Self {
            config: Arc::new(config),
            default_output_dir: default_output_dir.into(),
            conversion_lock: Arc::new(Mutex::new(())),
        }
    }
}

/// Build the router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route("/convert", post(routes::convert_document))
        .route("/health", get(routes::health))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve the form until Ctrl+C / SIGTERM.
pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Web form listening on http://{}", listener.local_addr()?);
    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
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
    info!("Shutting down web form");
}
