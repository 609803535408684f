//! HTTP and Socket.IO surface: application wiring and the listening loop.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use socketioxide::extract::{Data, SocketRef};
use socketioxide::layer::SocketIoLayer;
use socketioxide::SocketIo;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::RelayConfig;
use crate::gateway;
use crate::relay::RelayState;

/// The assembled relay: shared state plus the Socket.IO layer waiting to be
/// mounted.
pub struct RelayServer {
    config: RelayConfig,
    state: Arc<RelayState>,
    layer: SocketIoLayer,
}

impl RelayServer {
    pub fn new(config: RelayConfig) -> Self {
        let (layer, io) = SocketIo::new_layer();
        let state = Arc::new(RelayState::new(io.clone()));

        // Every connection attempt runs through the gateway before the
        // relay dispatcher sees it.
        {
            let state = state.clone();
            io.ns(
                "/",
                move |socket: SocketRef, Data(auth): Data<serde_json::Value>| {
                    let state = state.clone();
                    async move { gateway::establish(socket, auth, state).await }
                },
            );
        }

        Self {
            config,
            state,
            layer,
        }
    }

    pub fn state(&self) -> Arc<RelayState> {
        self.state.clone()
    }

    /// Bind the configured address and serve until the task is cancelled.
    pub async fn run(self) -> Result<()> {
        let addr = self.config.bind_address()?;
        let app = Self::app(self.state, self.layer);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;
        info!("🚀 relay listening on {}", listener.local_addr()?);

        axum::serve(listener, app).await.context("Server error")?;
        Ok(())
    }

    fn app(state: Arc<RelayState>, layer: SocketIoLayer) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/stats", get(stats_handler))
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    // todo: pin allowed origins before exposing this publicly
                    .layer(CorsLayer::permissive())
                    .layer(layer),
            )
            .with_state(state)
    }
}

async fn health_handler() -> &'static str {
    "ok"
}

#[derive(Debug, Serialize)]
struct StatsResponse {
    connections: usize,
    open_rooms: usize,
}

async fn stats_handler(State(state): State<Arc<RelayState>>) -> Json<StatsResponse> {
    Json(StatsResponse {
        connections: state.connections.load(Ordering::Relaxed),
        open_rooms: state.rooms.room_count(),
    })
}
