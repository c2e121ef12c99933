use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::server::message_router::MessageRouter;
use crate::server::LobbyManager;

use super::handler::websocket_handler;

/// Shared state handed to every Axum handler.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<LobbyManager>,
    pub router: Arc<MessageRouter>,
}

/// Build the Axum router: WebSocket upgrade plus a liveness check.
pub fn create_router(cors_origins: &str) -> Router<AppState> {
    let cors = if cors_origins == "*" {
        CorsLayer::permissive()
    } else {
        let origins: Vec<_> = cors_origins
            .split(',')
            .filter_map(|s| s.trim().parse::<axum::http::HeaderValue>().ok())
            .collect();

        if origins.is_empty() {
            tracing::warn!("no valid CORS origins configured, using permissive CORS");
            CorsLayer::permissive()
        } else {
            CorsLayer::new().allow_origin(origins).allow_methods(Any).allow_headers(Any)
        }
    };

    Router::new()
        .route("/ws", get(websocket_handler))
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn health_check(State(state): State<AppState>) -> &'static str {
    let _ = state.manager.lobby_list().await;
    "OK"
}
