//! Shared scaffolding for the integration tests: a fast-tick `ServerConfig`
//! and a way to attach a fake peer to a `LobbyManager` without a real socket.

use std::sync::Arc;
use std::time::Duration;

use lightcycle_arena_server::config::ServerConfig;
use lightcycle_arena_server::protocol::messages::ServerMessage;
use lightcycle_arena_server::server::LobbyManager;
use tokio::sync::mpsc;

/// A `ServerConfig` tuned for tests: short countdown and tick period so
/// scenarios resolve in well under a second, everything else left default.
pub fn fast_config() -> ServerConfig {
    ServerConfig {
        tick_rate_ms: 20,
        countdown_ms: 50,
        ..ServerConfig::default()
    }
}

/// Register a fake peer directly against the manager's broadcaster/session
/// table, bypassing the websocket layer the way `connection.rs` would.
pub async fn attach_peer(manager: &Arc<LobbyManager>, player_id: &str) -> mpsc::Receiver<Arc<ServerMessage>> {
    let (tx, rx) = mpsc::channel(64);
    manager.broadcaster().register(player_id.to_string(), tx).await;
    manager.sessions().connect(player_id.to_string(), format!("tok-{player_id}")).await;
    rx
}

/// The message router binds a peer's session and broadcaster registration to
/// its lobby right after a successful join; tests that call the manager
/// directly (skipping the router) need to do the same thing by hand.
pub async fn bind_to_lobby(manager: &Arc<LobbyManager>, player_id: &str, lobby_id: &str, is_spectator: bool) {
    manager.sessions().set_lobby(player_id, Some(lobby_id.to_string()), is_spectator).await;
    manager.broadcaster().set_lobby(player_id, Some(lobby_id)).await;
}

/// Poll a peer's channel until `pred` matches a message or the timeout elapses.
pub async fn wait_for<F>(rx: &mut mpsc::Receiver<Arc<ServerMessage>>, mut pred: F) -> ServerMessage
where
    F: FnMut(&ServerMessage) -> bool,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let msg = rx.recv().await.expect("channel closed before a matching message arrived");
            if pred(&msg) {
                return (*msg).clone();
            }
        }
    })
    .await
    .expect("timed out waiting for expected message")
}
