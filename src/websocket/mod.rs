// WebSocket module - organized into focused submodules
//
// This module provides the WebSocket handler and HTTP endpoints for the arena server.
//
// - handler: WebSocket upgrade handler (entry point)
// - connection: per-peer send/receive loop, registration and teardown
// - routes: HTTP route setup (health check, WebSocket upgrade)

mod connection;
mod handler;
mod routes;

pub use handler::websocket_handler;
pub use routes::{create_router, AppState};
