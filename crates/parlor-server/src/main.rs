//! Multi-room realtime server for the parlor party game.
//!
//! # Routes
//!
//! | Method | Path           | Description                              |
//! |--------|----------------|-------------------------------------------|
//! | `GET`  | `/ws`          | Message channel upgrade                    |
//! | `POST` | `/rooms`       | Create a room                              |
//! | `POST` | `/rooms/join`  | Join by code, or reconnect by session      |
//! | `GET`  | `/healthz`     | Liveness probe                             |
//!
//! Tunables are read from the environment by [`config::ServerConfig`].

mod config;
mod engine;
mod error;
mod http;
mod registry;
mod room;
mod timers;
mod ws_handler;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

use http::AppState;
use registry::RoomRegistry;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = config::ServerConfig::from_env();
    let state = AppState {
        registry: Arc::new(RoomRegistry::new()),
        config: cfg,
    };

    spawn_reap(state.registry.clone(), cfg);

    let app = Router::new()
        .route("/ws", get(ws_upgrade))
        .route("/rooms", post(http::create_room))
        .route("/rooms/join", post(http::join_room))
        .route("/healthz", get(http::healthz))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    tracing::info!(%addr, "parlor server listening");

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| ws_handler::handle_socket(socket, state.registry, state.config))
}

/// Periodic sweep that drops empty rooms and invalidates their tokens.
fn spawn_reap(registry: Arc<RoomRegistry>, cfg: config::ServerConfig) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(cfg.reap_interval_secs));
        loop {
            interval.tick().await;
            registry.reap_empty().await;
        }
    });
}
