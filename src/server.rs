//! HTTP front: the page, its assets, and the WebSocket endpoint.

use crate::channel::WebSocketChannel;
use crate::config::ServerConfig;
use crate::connection::handle_connection;
use crate::registry::Registry;
use axum::Router;
use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;
use axum::routing::get;
use std::future::Future;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

/// Shared state handed to request handlers.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    /// Holder of the live session.
    pub registry: Registry,
}

/// Builds the router for the given assets directory.
#[instrument(skip(state))]
pub fn router(state: AppState, assets_dir: &std::path::Path) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route_service("/", ServeFile::new(assets_dir.join("index.html")))
        .nest_service("/static", ServeDir::new(assets_dir.join("static")))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

/// WebSocket upgrade handler.
///
/// GET /ws
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_connection(WebSocketChannel::new(socket), state.registry))
}

/// Serves on an already bound listener until `shutdown` resolves.
#[instrument(skip_all)]
pub async fn serve_on(
    listener: TcpListener,
    config: &ServerConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let app = router(AppState::default(), config.assets_dir());
    info!(addr = %listener.local_addr()?, "Server ready");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

/// Binds the configured address and serves until ctrl-c.
#[instrument(skip_all, fields(addr = %config.bind_address()))]
pub async fn serve(config: &ServerConfig) -> std::io::Result<()> {
    let listener = TcpListener::bind(config.bind_address()).await?;
    serve_on(listener, config, async {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
        }
    })
    .await
}
