//! Client message dispatch: checks the caller's session phase against what
//! each message requires, then forwards to the lobby manager or session table.
//!
//! Lobby-affecting messages don't reply directly — the lobby actor broadcasts
//! the updated `LobbyState`/`GameState` to every member once the mutation
//! lands. This router only sends direct, single-recipient acknowledgements
//! and errors.

use std::sync::Arc;

use crate::protocol::messages::{ClientMessage, ServerMessage};
use crate::protocol::types::PlayerId;
use crate::error::RouterError;

use super::LobbyManager;

/// Side effect of dispatching a message that the websocket layer must act on:
/// a `Reconnect` that succeeds hands the connection a different `PlayerId`
/// to key its broadcaster registration and session lookups under from then on.
pub enum RouteEffect {
    None,
    Rebind { new_player_id: PlayerId },
}

pub struct MessageRouter {
    manager: Arc<LobbyManager>,
}

impl MessageRouter {
    pub fn new(manager: Arc<LobbyManager>) -> Self {
        Self { manager }
    }

    pub async fn dispatch(&self, player_id: &PlayerId, now: i64, message: ClientMessage) -> RouteEffect {
        let broadcaster = self.manager.broadcaster();
        let sessions = self.manager.sessions();

        match message {
            ClientMessage::Reconnect { reconnect_token } => {
                match sessions.reconnect(&reconnect_token, now).await {
                    Some(session) => {
                        self.manager.metrics().reconnect_result(true);
                        // The caller's socket is still registered under `player_id` (its
                        // temporary id) at this point -- the rebind to `session.player_id`
                        // happens only after this call returns -- so the reply has to go
                        // to the connection's *current* registration, not the reclaimed one.
                        broadcaster
                            .send_to_peer(
                                player_id,
                                ServerMessage::Reconnected {
                                    player_id: session.player_id.clone(),
                                    lobby_id: session.lobby_id,
                                    is_spectator: session.is_spectator,
                                },
                            )
                            .await;
                        return RouteEffect::Rebind { new_player_id: session.player_id };
                    }
                    None => {
                        self.manager.metrics().reconnect_result(false);
                        self.send_error(&broadcaster, player_id, RouterError::ReconnectExpired).await;
                    }
                }
            }
            ClientMessage::SetUserId { user_id } => {
                sessions.set_user_id(player_id, user_id).await;
            }
            ClientMessage::GetLobbyList => {
                let lobbies = self.manager.lobby_list().await;
                broadcaster.send_to_peer(player_id, ServerMessage::LobbyList { lobbies }).await;
            }
            ClientMessage::CreateLobby { player_name, settings } => {
                match self.manager.create_lobby(player_id.clone(), player_name, settings).await {
                    Ok((lobby_id, outcome)) => {
                        sessions.set_lobby(player_id, Some(lobby_id.clone()), false).await;
                        broadcaster.set_lobby(player_id, Some(&lobby_id)).await;
                        broadcaster
                            .send_to_peer(
                                player_id,
                                ServerMessage::LobbyJoined {
                                    lobby_id,
                                    player: Some(outcome.player),
                                    spectator: None,
                                    grid_size: outcome.grid_size,
                                    is_spectator: false,
                                },
                            )
                            .await;
                    }
                    Err(err) => self.send_error(&broadcaster, player_id, err).await,
                }
            }
            ClientMessage::JoinLobby { lobby_id, player_name } => {
                match self.manager.join_lobby(&lobby_id, player_id.clone(), player_name).await {
                    Ok(outcome) => {
                        sessions.set_lobby(player_id, Some(lobby_id.clone()), false).await;
                        broadcaster.set_lobby(player_id, Some(&lobby_id)).await;
                        broadcaster
                            .send_to_peer(
                                player_id,
                                ServerMessage::LobbyJoined {
                                    lobby_id,
                                    player: Some(outcome.player),
                                    spectator: None,
                                    grid_size: outcome.grid_size,
                                    is_spectator: false,
                                },
                            )
                            .await;
                    }
                    Err(err) => self.send_error(&broadcaster, player_id, err).await,
                }
            }
            ClientMessage::JoinLobbyAsSpectator { lobby_id, spectator_name } => {
                match self.manager.join_as_spectator(&lobby_id, player_id.clone(), spectator_name).await {
                    Ok(outcome) => {
                        sessions.set_lobby(player_id, Some(lobby_id.clone()), true).await;
                        broadcaster.set_lobby(player_id, Some(&lobby_id)).await;
                        broadcaster
                            .send_to_peer(
                                player_id,
                                ServerMessage::LobbyJoined {
                                    lobby_id,
                                    player: None,
                                    spectator: Some(outcome.spectator),
                                    grid_size: outcome.grid_size,
                                    is_spectator: true,
                                },
                            )
                            .await;
                    }
                    Err(err) => self.send_error(&broadcaster, player_id, err).await,
                }
            }
            ClientMessage::LeaveLobby => {
                let Some(session) = sessions.get(player_id).await else { return RouteEffect::None };
                let Some(lobby_id) = session.lobby_id else {
                    self.send_error(&broadcaster, player_id, RouterError::NotInLobby).await;
                    return RouteEffect::None;
                };
                self.manager.leave_lobby(&lobby_id, player_id.clone(), session.is_spectator).await;
                sessions.set_lobby(player_id, None, false).await;
                broadcaster.set_lobby(player_id, None).await;
            }
            ClientMessage::SetName { name } => {
                if let Some(lobby_id) = self.current_lobby(&sessions, player_id).await {
                    self.manager.set_name(&lobby_id, player_id.clone(), name).await;
                } else {
                    self.send_error(&broadcaster, player_id, RouterError::NotInLobby).await;
                }
            }
            ClientMessage::Ready { ready } => {
                if let Some(lobby_id) = self.current_lobby(&sessions, player_id).await {
                    self.manager.set_ready(&lobby_id, player_id.clone(), ready).await;
                } else {
                    self.send_error(&broadcaster, player_id, RouterError::NotInLobby).await;
                }
            }
            ClientMessage::UpdateSettings { settings } => {
                if let Some(lobby_id) = self.current_lobby(&sessions, player_id).await {
                    if let Err(err) = self.manager.update_settings(&lobby_id, player_id.clone(), settings).await {
                        self.send_error(&broadcaster, player_id, err).await;
                    }
                } else {
                    self.send_error(&broadcaster, player_id, RouterError::NotInLobby).await;
                }
            }
            ClientMessage::KickPlayer { player_id: target } => {
                if let Some(lobby_id) = self.current_lobby(&sessions, player_id).await {
                    if let Err(err) = self.manager.kick_player(&lobby_id, player_id.clone(), target).await {
                        self.send_error(&broadcaster, player_id, err).await;
                    }
                } else {
                    self.send_error(&broadcaster, player_id, RouterError::NotInLobby).await;
                }
            }
            ClientMessage::BanPlayer { player_id: target } => {
                if let Some(lobby_id) = self.current_lobby(&sessions, player_id).await {
                    if let Err(err) = self.manager.ban_player(&lobby_id, player_id.clone(), target).await {
                        self.send_error(&broadcaster, player_id, err).await;
                    }
                } else {
                    self.send_error(&broadcaster, player_id, RouterError::NotInLobby).await;
                }
            }
            ClientMessage::AddAiBot => {
                if let Some(lobby_id) = self.current_lobby(&sessions, player_id).await {
                    if let Err(err) = self.manager.add_ai_bot(&lobby_id, player_id.clone()).await {
                        self.send_error(&broadcaster, player_id, err).await;
                    }
                } else {
                    self.send_error(&broadcaster, player_id, RouterError::NotInLobby).await;
                }
            }
            ClientMessage::RemoveAiBot { player_id: target } => {
                if let Some(lobby_id) = self.current_lobby(&sessions, player_id).await {
                    if let Err(err) = self.manager.remove_ai_bot(&lobby_id, player_id.clone(), target).await {
                        self.send_error(&broadcaster, player_id, err).await;
                    }
                } else {
                    self.send_error(&broadcaster, player_id, RouterError::NotInLobby).await;
                }
            }
            ClientMessage::ReturnToLobby => {
                if let Some(lobby_id) = self.current_lobby(&sessions, player_id).await {
                    self.manager.return_to_lobby(&lobby_id, player_id.clone()).await;
                }
            }
            ClientMessage::SaveReplay => {
                let Some(session) = sessions.get(player_id).await else { return RouteEffect::None };
                let Some(lobby_id) = session.lobby_id.clone() else {
                    self.send_error(&broadcaster, player_id, RouterError::NotInLobby).await;
                    return RouteEffect::None;
                };
                match self.manager.save_replay(&lobby_id, player_id.clone(), session.user_id).await {
                    Ok(replay_id) => {
                        broadcaster
                            .send_to_peer(
                                player_id,
                                ServerMessage::ReplaySaved { replay_id, message: "replay saved".into() },
                            )
                            .await;
                    }
                    Err(err) => self.send_error(&broadcaster, player_id, err).await,
                }
            }
            ClientMessage::GetUserReplays => {
                let Some(session) = sessions.get(player_id).await else { return RouteEffect::None };
                let Some(user_id) = session.user_id else {
                    broadcaster.send_to_peer(player_id, ServerMessage::UserReplays { replays: vec![] }).await;
                    return RouteEffect::None;
                };
                let replays = self.manager.list_user_replays(&user_id).await;
                broadcaster.send_to_peer(player_id, ServerMessage::UserReplays { replays }).await;
            }
            ClientMessage::LoadReplay { replay_id } => match self.manager.load_replay(&replay_id).await {
                Ok(replay) => {
                    broadcaster.send_to_peer(player_id, ServerMessage::ReplayData { replay: Box::new(replay) }).await;
                }
                Err(err) => self.send_error(&broadcaster, player_id, err).await,
            },
            ClientMessage::DeleteReplay { replay_id } => {
                let Some(session) = sessions.get(player_id).await else { return RouteEffect::None };
                let Some(user_id) = session.user_id else {
                    self.send_error(&broadcaster, player_id, RouterError::ReplayNotFound).await;
                    return RouteEffect::None;
                };
                match self.manager.delete_replay(&user_id, &replay_id).await {
                    Ok(()) => {
                        broadcaster
                            .send_to_peer(
                                player_id,
                                ServerMessage::ReplayDeleted { replay_id, message: "replay deleted".into() },
                            )
                            .await;
                    }
                    Err(err) => self.send_error(&broadcaster, player_id, err).await,
                }
            }
            ClientMessage::Move { direction } => {
                if let Some(lobby_id) = self.current_lobby(&sessions, player_id).await {
                    self.manager.player_move(&lobby_id, player_id.clone(), direction).await;
                }
            }
            ClientMessage::Brake { braking } => {
                if let Some(lobby_id) = self.current_lobby(&sessions, player_id).await {
                    self.manager.player_brake(&lobby_id, player_id.clone(), braking).await;
                }
            }
        }

        RouteEffect::None
    }

    async fn current_lobby(&self, sessions: &crate::session::SharedSessionManager, player_id: &str) -> Option<String> {
        sessions.get(player_id).await.and_then(|s| s.lobby_id)
    }

    async fn send_error(&self, broadcaster: &crate::broadcast::SharedBroadcaster, player_id: &str, err: RouterError) {
        broadcaster
            .send_to_peer(player_id, ServerMessage::Error { message: err.to_string() })
            .await;
    }
}
