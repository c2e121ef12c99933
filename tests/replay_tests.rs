//! Replay save/load/delete round-trip, driven through a real game to
//! completion rather than constructing a `ReplayData` by hand -- the same
//! path `MessageRouter::dispatch`'s `SaveReplay`/`GetUserReplays`/
//! `LoadReplay`/`DeleteReplay` arms drive.

mod common;

use std::sync::Arc;

use common::{attach_peer, bind_to_lobby, fast_config};
use lightcycle_arena_server::protocol::messages::ServerMessage;
use lightcycle_arena_server::protocol::types::LobbySettingsPatch;
use lightcycle_arena_server::server::LobbyManager;

/// Plays a single lone player into a wall so the round ends quickly, leaving
/// the lobby actor holding a finished recorder ready to be saved.
async fn play_to_game_over(manager: &Arc<LobbyManager>, lobby_id: &str, host_rx: &mut tokio::sync::mpsc::Receiver<Arc<ServerMessage>>) {
    manager.set_ready(lobby_id, "host".into(), true).await;
    loop {
        let msg = host_rx.recv().await.expect("lobby actor dropped its channel before game over");
        if matches!(*msg, ServerMessage::GameOver { .. }) {
            break;
        }
    }
}

#[tokio::test]
async fn save_load_delete_round_trip_after_a_finished_game() {
    let manager = Arc::new(LobbyManager::new(fast_config()));
    let mut host_rx = attach_peer(&manager, "host").await;

    let patch = LobbySettingsPatch { grid_size: Some(20), max_players: Some(1), ..Default::default() };
    let (lobby_id, _) = manager.create_lobby("host".into(), "Host".into(), patch).await.unwrap();
    bind_to_lobby(&manager, "host", &lobby_id, false).await;

    play_to_game_over(&manager, &lobby_id, &mut host_rx).await;

    let replay_id = manager
        .save_replay(&lobby_id, "host".into(), Some("user-1".into()))
        .await
        .expect("a finished game has a recorder ready to save");

    let listed = manager.list_user_replays("user-1").await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].replay_id, replay_id);

    let loaded = manager.load_replay(&replay_id).await.unwrap();
    assert_eq!(loaded.metadata.replay_id, replay_id);
    assert!(!loaded.events.is_empty(), "a saved replay must carry at least the gameStarted/gameOver events");

    manager.delete_replay("user-1", &replay_id).await.unwrap();
    assert!(manager.load_replay(&replay_id).await.is_err());
    assert!(manager.list_user_replays("user-1").await.is_empty());
}

/// Saving before any game has run (no recorder yet) is a clean error, not a panic.
#[tokio::test]
async fn save_replay_without_a_finished_game_is_rejected() {
    let manager = Arc::new(LobbyManager::new(fast_config()));
    let _host_rx = attach_peer(&manager, "host").await;

    let (lobby_id, _) = manager.create_lobby("host".into(), "Host".into(), LobbySettingsPatch::default()).await.unwrap();
    bind_to_lobby(&manager, "host", &lobby_id, false).await;

    assert!(manager.save_replay(&lobby_id, "host".into(), None).await.is_err());
}

/// Deleting a replay under the wrong user id fails rather than silently
/// succeeding or deleting someone else's replay.
#[tokio::test]
async fn delete_replay_with_wrong_user_id_is_rejected() {
    let manager = Arc::new(LobbyManager::new(fast_config()));
    let mut host_rx = attach_peer(&manager, "host").await;

    let patch = LobbySettingsPatch { grid_size: Some(20), max_players: Some(1), ..Default::default() };
    let (lobby_id, _) = manager.create_lobby("host".into(), "Host".into(), patch).await.unwrap();
    bind_to_lobby(&manager, "host", &lobby_id, false).await;

    play_to_game_over(&manager, &lobby_id, &mut host_rx).await;

    let replay_id = manager.save_replay(&lobby_id, "host".into(), Some("user-1".into())).await.unwrap();

    assert!(manager.delete_replay("someone-else", &replay_id).await.is_err());
    assert!(manager.load_replay(&replay_id).await.is_ok());
}
