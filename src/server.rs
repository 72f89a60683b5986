use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    body::Body,
    extract::Request,
    http::{StatusCode, header},
    response::{Html, IntoResponse},
    routing::get,
};
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::api::{self, AppState, SharedState};
use crate::embedded::Assets;
use crate::hub::BoardHub;
use crate::persistence::{BoardPersistence, JsonFileStore};
use crate::ws;

pub const DEFAULT_PORT: u16 = 4000;
pub const DEFAULT_DATA_FILE: &str = "kanban-data.json";

/// Configuration for the board server.
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_file: PathBuf,
    /// Serve the client from this directory instead of the embedded bundle.
    pub static_dir: Option<PathBuf>,
    pub dev_mode: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            data_file: PathBuf::from(DEFAULT_DATA_FILE),
            static_dir: None,
            dev_mode: false,
        }
    }
}

/// Build the full application router with API, WebSocket, and SPA serving.
pub fn build_router(state: SharedState, static_dir: Option<&Path>) -> Router {
    let router = api::api_router().route("/ws", get(ws::ws_handler));

    let router = match static_dir {
        Some(dir) => router.fallback_service(
            ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html"))),
        ),
        None => router.fallback(static_handler),
    };

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Serve embedded static files or fall back to index.html for SPA routing.
async fn static_handler(req: Request<Body>) -> impl IntoResponse {
    let path = req.uri().path().trim_start_matches('/');

    if !path.is_empty() {
        if let Some(content) = Assets::get(path) {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            return (
                [(header::CONTENT_TYPE, mime.essence_str().to_string())],
                content.data,
            )
                .into_response();
        }
    }

    match Assets::get("index.html") {
        Some(content) => Html(String::from_utf8_lossy(&content.data).into_owned()).into_response(),
        None => (StatusCode::NOT_FOUND, "Client bundle not found.").into_response(),
    }
}

/// Load the board, spawn its hub and serve until Ctrl+C.
pub async fn start_server(config: ServerConfig) -> Result<()> {
    let store = Arc::new(JsonFileStore::new(&config.data_file));
    let board = store.load().await;
    let hub = BoardHub::spawn(board, store);
    let state = Arc::new(AppState { hub });

    let mut app = build_router(state, config.static_dir.as_deref());
    if config.dev_mode {
        app = app.layer(CorsLayer::permissive());
    }

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    tracing::info!(
        %local_addr,
        data_file = %config.data_file.display(),
        "kanban board listening"
    );
    if let Some(lan) = lan_address(local_addr).await {
        tracing::info!(url = %format!("http://{}", lan), "local network access");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("server shut down gracefully");
    Ok(())
}

/// Address other machines on the LAN can reach when bound to all interfaces.
///
/// Connecting a UDP socket only selects a route; nothing is sent.
async fn lan_address(local_addr: SocketAddr) -> Option<SocketAddr> {
    if !local_addr.ip().is_unspecified() {
        return None;
    }
    let probe = tokio::net::UdpSocket::bind(("0.0.0.0", 0)).await.ok()?;
    probe.connect(("8.8.8.8", 80)).await.ok()?;
    match probe.local_addr().ok()?.ip() {
        IpAddr::V4(ip) if !ip.is_loopback() && !ip.is_unspecified() => {
            Some(SocketAddr::new(IpAddr::V4(ip), local_addr.port()))
        }
        _ => None,
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl+C; running until killed");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
