//! Exercises `MessageRouter::dispatch` directly -- the same entry point the
//! websocket connection loop calls for every inbound frame -- covering the
//! reconnect/rebind path (S5) and a few of the browsing/in-lobby boundaries.

mod common;

use std::sync::Arc;

use common::{attach_peer, fast_config, wait_for};
use lightcycle_arena_server::protocol::messages::{ClientMessage, ServerMessage};
use lightcycle_arena_server::protocol::types::LobbySettingsPatch;
use lightcycle_arena_server::server::message_router::{MessageRouter, RouteEffect};
use lightcycle_arena_server::server::LobbyManager;

/// S5: a peer disconnects mid-lobby, then reconnects within the window using
/// its reconnect token. The router hands back a `Rebind` effect, and once the
/// caller applies it (as `connection.rs` does), the reclaimed id is back in
/// the lobby's broadcast membership with its prior `lobby_id` restored.
#[tokio::test]
async fn reconnect_within_window_restores_identity_and_lobby_membership() {
    let manager = Arc::new(LobbyManager::new(fast_config()));
    let router = MessageRouter::new(manager.clone());

    let original_rx = attach_peer(&manager, "p1").await;
    let (lobby_id, _) = manager.create_lobby("p1".into(), "P1".into(), LobbySettingsPatch::default()).await.unwrap();
    manager.sessions().set_lobby("p1", Some(lobby_id.clone()), false).await;
    manager.broadcaster().set_lobby("p1", Some(&lobby_id)).await;

    let token = manager.sessions().get("p1").await.unwrap().reconnect_token;

    // Simulate the socket dropping.
    manager.broadcaster().unregister("p1").await;
    manager.sessions().disconnect("p1", 0).await;
    drop(original_rx);

    // A new connection comes in under a fresh temporary id, then reconnects.
    let mut new_rx = attach_peer(&manager, "temp-id").await;
    let effect = router.dispatch(&"temp-id".to_string(), 1_000, ClientMessage::Reconnect { reconnect_token: token }).await;

    let RouteEffect::Rebind { new_player_id } = effect else { panic!("expected a rebind effect") };
    assert_eq!(new_player_id, "p1");

    manager.broadcaster().rebind("temp-id", new_player_id.clone()).await;
    manager.sessions().forget("temp-id").await;

    let reconnected = wait_for(&mut new_rx, |m| matches!(m, ServerMessage::Reconnected { .. })).await;
    let ServerMessage::Reconnected { player_id, lobby_id: restored_lobby, .. } = reconnected else { unreachable!() };
    assert_eq!(player_id, "p1");
    assert_eq!(restored_lobby.as_deref(), Some(lobby_id.as_str()));
    assert_eq!(manager.broadcaster().lobby_member_count(&lobby_id).await, 1);
}

/// An unknown/expired token produces an `error` frame, not a panic or a silent drop.
#[tokio::test]
async fn reconnect_with_unknown_token_reports_an_error() {
    let manager = Arc::new(LobbyManager::new(fast_config()));
    let router = MessageRouter::new(manager.clone());
    let mut rx = attach_peer(&manager, "p1").await;

    router.dispatch(&"p1".to_string(), 0, ClientMessage::Reconnect { reconnect_token: "not-a-real-token".into() }).await;

    let err = wait_for(&mut rx, |m| matches!(m, ServerMessage::Error { .. })).await;
    assert!(matches!(err, ServerMessage::Error { .. }));
}

/// Sending a lobby-scoped message while merely browsing comes back as `notInLobby`.
#[tokio::test]
async fn lobby_scoped_message_without_a_lobby_is_rejected() {
    let manager = Arc::new(LobbyManager::new(fast_config()));
    let router = MessageRouter::new(manager.clone());
    let mut rx = attach_peer(&manager, "p1").await;

    router.dispatch(&"p1".to_string(), 0, ClientMessage::Ready { ready: true }).await;

    let err = wait_for(&mut rx, |m| matches!(m, ServerMessage::Error { .. })).await;
    let ServerMessage::Error { message } = err else { unreachable!() };
    assert!(message.contains("not in a lobby"));
}
