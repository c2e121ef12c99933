//! The per-lobby worker: a mailbox loop that totally orders router commands
//! against the countdown and tick timers for a single lobby.
//!
//! Grounded on the concurrency model's "one logical worker per lobby" contract:
//! everything that mutates this lobby's `Lobby`/`GameContext`/`Recorder` goes
//! through this task, so no cross-task locking is needed for per-lobby state.

use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use serde_json::json;
use tokio::sync::{mpsc, oneshot, RwLock};

use crate::broadcast::SharedBroadcaster;
use crate::error::RouterError;
use crate::game::{resolve_tick, reset_players_for_next_round, GameContext, GameEvent, GamePhase};
use crate::grid;
use crate::identity;
use crate::lobby::{Lobby, LobbyPhase};
use crate::metrics::ServerMetrics;
use crate::protocol::messages::{
    GameStateView, LobbyListItem, LobbyStateView, PlayerSummary, ServerMessage, SpectatorSummary,
};
use crate::protocol::types::{Direction, GameSettings, LobbySettingsPatch, Player, Spectator};
use crate::replay::{Recorder, ReplayInitialState, ReplaySpawnPlayer, ReplayStore};
use crate::session::SharedSessionManager;

/// Shared with the manager's lobby-list directory; the actor keeps this
/// up to date so `getLobbyList` never needs to reach into a running worker.
pub type LobbySnapshot = Arc<RwLock<LobbyListItem>>;

/// Tunable constants a lobby worker needs, threaded in from `ServerConfig` at
/// spawn time rather than re-read from a shared config on every tick.
#[derive(Debug, Clone, Copy)]
pub struct LobbyRuntimeConfig {
    pub grid_margin: i32,
    pub obstacle_density: f64,
    pub min_obstacle_spacing: f64,
    pub obstacle_spawn_attempts: u32,
    pub safe_spawn_attempts: u32,
    pub countdown_ms: i64,
    pub tick_rate_ms: u64,
    pub speed_boost_duration_ms: i64,
    pub max_power_ups: usize,
    pub color_hue_threshold_deg: f64,
    pub max_player_name_len: usize,
    pub replays_per_user: usize,
}

pub struct JoinOutcome {
    pub player: Player,
    pub grid_size: u32,
}

pub struct SpectatorJoinOutcome {
    pub spectator: Spectator,
    pub grid_size: u32,
}

pub enum LobbyCommand {
    Join {
        player_id: String,
        player_name: String,
        respond: oneshot::Sender<Result<JoinOutcome, RouterError>>,
    },
    JoinSpectator {
        spectator_id: String,
        spectator_name: String,
        respond: oneshot::Sender<Result<SpectatorJoinOutcome, RouterError>>,
    },
    Leave {
        player_id: String,
    },
    LeaveSpectator {
        spectator_id: String,
    },
    SetName {
        player_id: String,
        name: String,
    },
    Ready {
        player_id: String,
        ready: bool,
    },
    UpdateSettings {
        player_id: String,
        patch: LobbySettingsPatch,
        respond: oneshot::Sender<Result<(), RouterError>>,
    },
    Kick {
        player_id: String,
        target: String,
        respond: oneshot::Sender<Result<(), RouterError>>,
    },
    Ban {
        player_id: String,
        target: String,
        respond: oneshot::Sender<Result<(), RouterError>>,
    },
    AddAiBot {
        player_id: String,
        respond: oneshot::Sender<Result<(), RouterError>>,
    },
    RemoveAiBot {
        player_id: String,
        target: String,
        respond: oneshot::Sender<Result<(), RouterError>>,
    },
    ReturnToLobby {
        player_id: String,
    },
    SaveReplay {
        player_id: String,
        user_id: Option<String>,
        respond: oneshot::Sender<Result<String, RouterError>>,
    },
    Move {
        player_id: String,
        direction: Direction,
    },
    Brake {
        player_id: String,
        braking: bool,
    },
}

pub struct LobbyActor {
    lobby: Lobby,
    game: Option<GameContext>,
    recorder: Option<Recorder>,
    /// The winner recorded in the most recent `gameOver` event, carried
    /// forward so `save_replay` reports the same winner rather than
    /// re-deriving one from post-reset player state.
    last_game_winner: Option<Option<String>>,
    config: LobbyRuntimeConfig,
    broadcaster: SharedBroadcaster,
    sessions: SharedSessionManager,
    replay_store: Arc<dyn ReplayStore>,
    metrics: Arc<ServerMetrics>,
    mailbox: mpsc::Receiver<LobbyCommand>,
    snapshot: LobbySnapshot,
    closed: bool,
}

impl LobbyActor {
    #[allow(clippy::too_many_arguments)]
    pub fn spawn(
        lobby: Lobby,
        config: LobbyRuntimeConfig,
        broadcaster: SharedBroadcaster,
        sessions: SharedSessionManager,
        replay_store: Arc<dyn ReplayStore>,
        metrics: Arc<ServerMetrics>,
        snapshot: LobbySnapshot,
    ) -> mpsc::Sender<LobbyCommand> {
        let (tx, rx) = mpsc::channel(128);
        let actor = LobbyActor {
            lobby,
            game: None,
            recorder: None,
            last_game_winner: None,
            config,
            broadcaster,
            sessions,
            replay_store,
            metrics,
            mailbox: rx,
            snapshot,
            closed: false,
        };
        tokio::spawn(actor.run());
        tx
    }

    async fn run(mut self) {
        let mut countdown_interval = tokio::time::interval(Duration::from_millis(1000));
        let mut tick_interval = tokio::time::interval(Duration::from_millis(self.config.tick_rate_ms));

        loop {
            tokio::select! {
                cmd = self.mailbox.recv() => {
                    match cmd {
                        Some(cmd) => self.handle_command(cmd).await,
                        None => break,
                    }
                }
                _ = countdown_interval.tick() => {
                    if AssertUnwindSafe(self.on_countdown_tick()).catch_unwind().await.is_err() {
                        self.recover_from_tick_panic("countdown").await;
                    }
                }
                _ = tick_interval.tick() => {
                    if AssertUnwindSafe(self.on_simulation_tick()).catch_unwind().await.is_err() {
                        self.recover_from_tick_panic("simulation").await;
                    }
                }
            }

            if self.closed {
                break;
            }
        }
    }

    /// Isolate a panicking tick: the lobby is torn down rather than left in
    /// an inconsistent state, but the panic never reaches other lobbies.
    async fn recover_from_tick_panic(&mut self, which: &str) {
        tracing::error!(lobby_id = %self.lobby.lobby_id, tick = which, "lobby tick loop panicked, closing lobby");
        self.broadcaster
            .broadcast_to_lobby(&self.lobby.lobby_id, ServerMessage::Error { message: "internal error, lobby closed".into() })
            .await;
        self.close_lobby().await;
    }

    fn now_ms() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    async fn handle_command(&mut self, cmd: LobbyCommand) {
        match cmd {
            LobbyCommand::Join { player_id, player_name, respond } => {
                let result = self.join(player_id, player_name);
                let _ = respond.send(result);
            }
            LobbyCommand::JoinSpectator { spectator_id, spectator_name, respond } => {
                let result = self.join_spectator(spectator_id, spectator_name);
                let _ = respond.send(result);
            }
            LobbyCommand::Leave { player_id } => {
                self.leave(&player_id).await;
            }
            LobbyCommand::LeaveSpectator { spectator_id } => {
                self.lobby.remove_spectator(&spectator_id);
            }
            LobbyCommand::SetName { player_id, name } => {
                let truncated = identity::truncate_name(&name, self.config.max_player_name_len);
                if let Some(player) = self.lobby.find_player_mut(&player_id) {
                    player.name = truncated;
                }
            }
            LobbyCommand::Ready { player_id, ready } => {
                let _ = self.lobby.set_ready(&player_id, ready, Self::now_ms());
            }
            LobbyCommand::UpdateSettings { player_id, patch, respond } => {
                let result = self.lobby.update_settings(&player_id, patch);
                let _ = respond.send(result);
            }
            LobbyCommand::Kick { player_id, target, respond } => {
                let result = self.lobby.kick_player(&player_id, &target);
                if result.is_ok() {
                    self.broadcaster.send_to_peer(&target, ServerMessage::Kicked { message: "you were kicked from the lobby".into() }).await;
                    self.sessions.set_lobby(&target, None, false).await;
                    self.broadcaster.set_lobby(&target, None).await;
                }
                let _ = respond.send(result);
            }
            LobbyCommand::Ban { player_id, target, respond } => {
                let result = self.lobby.ban_player(&player_id, &target);
                if result.is_ok() {
                    self.broadcaster.send_to_peer(&target, ServerMessage::Banned { message: "you were banned from the lobby".into() }).await;
                    self.sessions.set_lobby(&target, None, false).await;
                    self.broadcaster.set_lobby(&target, None).await;
                }
                let _ = respond.send(result);
            }
            LobbyCommand::AddAiBot { player_id, respond } => {
                let result = self.add_ai_bot(&player_id);
                let _ = respond.send(result);
            }
            LobbyCommand::RemoveAiBot { player_id, target, respond } => {
                if self.lobby.host_id.as_deref() != Some(player_id.as_str()) {
                    let _ = respond.send(Err(RouterError::HostOnly));
                    return;
                }
                self.lobby.remove_ai_bot(&target);
                let _ = respond.send(Ok(()));
            }
            LobbyCommand::ReturnToLobby { player_id: _ } => {
                self.lobby.return_to_lobby();
                self.game = None;
                self.recorder = None;
                self.last_game_winner = None;
            }
            LobbyCommand::SaveReplay { player_id: _, user_id, respond } => {
                let result = self.save_replay(user_id).await;
                let _ = respond.send(result);
            }
            LobbyCommand::Move { player_id, direction } => {
                if let Some(game) = self.game.as_mut() {
                    let mut events = Vec::new();
                    game.apply_player_move(&player_id, direction, &mut events);
                    self.emit_events(events).await;
                    if let Some(recorder) = self.recorder.as_mut() {
                        recorder.record_action(&player_id, "move", json!({"direction": direction}), Self::now_ms());
                    }
                }
                return;
            }
            LobbyCommand::Brake { player_id, braking } => {
                if let Some(game) = self.game.as_mut() {
                    game.apply_player_brake(&player_id, braking, Self::now_ms());
                    if let Some(recorder) = self.recorder.as_mut() {
                        recorder.record_action(&player_id, "brake", json!({"braking": braking}), Self::now_ms());
                    }
                }
                return;
            }
        }

        self.broadcast_lobby_state().await;
    }

    fn join(&mut self, player_id: String, player_name: String) -> Result<JoinOutcome, RouterError> {
        let name = identity::truncate_name(&player_name, self.config.max_player_name_len);
        let color = identity::non_colliding_color(&self.lobby.players, self.config.color_hue_threshold_deg);
        let player = Player {
            id: player_id,
            name,
            color,
            avatar: None,
            x: 0,
            y: 0,
            direction: Direction::Right,
            last_direction: Direction::Right,
            trail: vec![],
            is_ready: false,
            speed: 1,
            speed_boost_until: None,
            is_braking: false,
            brake_start_time: None,
            has_shield: false,
            has_trail_eraser: false,
            game_id: None,
        };
        self.lobby.add_player(player.clone())?;
        Ok(JoinOutcome { player, grid_size: self.lobby.settings.grid_size })
    }

    fn join_spectator(&mut self, spectator_id: String, spectator_name: String) -> Result<SpectatorJoinOutcome, RouterError> {
        let name = identity::truncate_name(&spectator_name, self.config.max_player_name_len);
        let spectator = Spectator {
            id: spectator_id,
            name,
            color: "hsl(0, 0%, 70%)".to_string(),
            joined_at: Self::now_ms(),
        };
        self.lobby.add_spectator(spectator.clone())?;
        Ok(SpectatorJoinOutcome { spectator, grid_size: self.lobby.settings.grid_size })
    }

    fn add_ai_bot(&mut self, player_id: &str) -> Result<(), RouterError> {
        if self.lobby.host_id.as_deref() != Some(player_id) {
            return Err(RouterError::HostOnly);
        }
        let bot_id = format!("ai-{}", uuid::Uuid::new_v4());
        let color = identity::non_colliding_color(&self.lobby.players, self.config.color_hue_threshold_deg);
        let bot = Player {
            id: bot_id,
            name: "Bot".to_string(),
            color,
            avatar: None,
            x: 0,
            y: 0,
            direction: Direction::Right,
            last_direction: Direction::Right,
            trail: vec![],
            is_ready: true,
            speed: 1,
            speed_boost_until: None,
            is_braking: false,
            brake_start_time: None,
            has_shield: false,
            has_trail_eraser: false,
            game_id: None,
        };
        self.lobby.add_ai_bot(bot)
    }

    /// `PlayerLeave` plus the last-lobby-leaver rule.
    async fn leave(&mut self, player_id: &str) {
        self.lobby.remove_player(player_id);
        self.sessions.set_lobby(player_id, None, false).await;
        self.broadcaster.set_lobby(player_id, None).await;

        if self.lobby.human_count() == 0 {
            self.close_lobby().await;
        }
    }

    async fn close_lobby(&mut self) {
        for spectator in self.lobby.spectators.clone() {
            self.broadcaster
                .send_to_peer(&spectator.id, ServerMessage::LobbyClosed { message: "the lobby was closed".into() })
                .await;
            self.sessions.set_lobby(&spectator.id, None, false).await;
            self.broadcaster.set_lobby(&spectator.id, None).await;

            let fresh_token = uuid::Uuid::new_v4().to_string();
            self.sessions.connect(spectator.id.clone(), fresh_token.clone()).await;
            self.broadcaster
                .send_to_peer(
                    &spectator.id,
                    ServerMessage::Connected { player_id: spectator.id.clone(), reconnect_token: fresh_token, lobbies: vec![] },
                )
                .await;
        }
        self.lobby.close();
        self.game = None;
        self.recorder = None;
        self.metrics.lobby_closed();
        self.closed = true;
    }

    async fn on_countdown_tick(&mut self) {
        if self.lobby.phase != LobbyPhase::Starting {
            return;
        }
        let started = self.lobby.countdown_started_at.unwrap_or(Self::now_ms());
        let elapsed = Self::now_ms() - started;
        if elapsed >= self.config.countdown_ms {
            self.begin_game().await;
        } else {
            self.broadcast_lobby_state().await;
        }
    }

    async fn begin_game(&mut self) {
        self.lobby.begin_game();

        let obstacles = grid::generate_obstacles(
            self.lobby.settings.grid_size,
            self.config.grid_margin,
            self.config.obstacle_density,
            self.config.min_obstacle_spacing,
            self.config.obstacle_spawn_attempts,
        );

        let mut occupied: HashSet<String> = HashSet::new();
        let mut players = self.lobby.players.clone();
        for player in players.iter_mut() {
            let (cell, dir) = grid::safe_spawn(
                self.lobby.settings.grid_size,
                self.config.grid_margin,
                &obstacles,
                &occupied,
                self.config.safe_spawn_attempts,
            );
            occupied.insert(cell.key());
            player.x = cell.x;
            player.y = cell.y;
            player.direction = dir;
            player.last_direction = dir;
        }
        self.lobby.players = players.clone();

        let settings = GameSettings {
            tick_rate_ms: self.config.tick_rate_ms,
            speed_boost_duration_ms: self.config.speed_boost_duration_ms,
            max_power_ups: self.config.max_power_ups,
        };

        let mut recorder = Recorder::new(Self::now_ms(), self.lobby.settings.grid_size, self.lobby.lobby_name.clone());
        let initial_state = ReplayInitialState {
            grid_size: self.lobby.settings.grid_size,
            players: players
                .iter()
                .map(|p| ReplaySpawnPlayer {
                    id: p.id.clone(),
                    name: p.name.clone(),
                    color: p.color.clone(),
                    x: p.x,
                    y: p.y,
                    is_ai: p.is_ai(),
                })
                .collect(),
            obstacles: obstacles.iter().cloned().collect(),
            settings,
        };
        recorder.capture_initial_state(initial_state, Self::now_ms());
        self.recorder = Some(recorder);
        self.last_game_winner = None;

        self.game = Some(GameContext::new(
            uuid::Uuid::new_v4().to_string(),
            players,
            obstacles,
            self.lobby.settings.grid_size,
            settings,
        ));
        self.metrics.game_started();
        self.broadcast_game_state().await;
        self.broadcast_lobby_state().await;
    }

    async fn on_simulation_tick(&mut self) {
        if self.lobby.phase != LobbyPhase::InGame {
            return;
        }
        let Some(game) = self.game.as_mut() else { return };

        if let Some(recorder) = self.recorder.as_mut() {
            recorder.bump_tick();
        }

        let events = resolve_tick(game, Self::now_ms());
        self.emit_events(events.clone()).await;
        self.broadcast_game_state().await;

        if let Some(recorder) = self.recorder.as_mut() {
            let snapshot = json!(game
                .players
                .iter()
                .map(|p| (p.id.clone(), json!({"x": p.x, "y": p.y, "direction": p.direction, "trail": p.trail})))
                .collect::<std::collections::HashMap<_, _>>());
            recorder.record_event("positionSnapshot", snapshot, Self::now_ms());
        }

        if events.iter().any(|e| matches!(e, GameEvent::GameOver { .. })) {
            self.finish_game(events).await;
        }
    }

    async fn emit_events(&mut self, events: Vec<GameEvent>) {
        for event in events {
            match event {
                GameEvent::PlayerCrashed { player_id } => {
                    self.broadcaster
                        .broadcast_to_lobby(&self.lobby.lobby_id, ServerMessage::PlayerCrashed { player_id })
                        .await;
                }
                GameEvent::ShieldAbsorbed { player_id } => {
                    self.broadcaster
                        .broadcast_to_lobby(&self.lobby.lobby_id, ServerMessage::ShieldAbsorbed { player_id })
                        .await;
                }
                GameEvent::TrailEraserUsed { player_id } => {
                    self.broadcaster
                        .broadcast_to_lobby(&self.lobby.lobby_id, ServerMessage::TrailEraserUsed { player_id })
                        .await;
                }
                GameEvent::PowerUpCollected { player_id, kind } => {
                    if let Some(recorder) = self.recorder.as_mut() {
                        recorder.record_event(
                            "powerUpCollected",
                            json!({"playerId": player_id, "type": kind}),
                            Self::now_ms(),
                        );
                    }
                }
                GameEvent::GameOver { .. } => {}
            }
        }
    }

    async fn finish_game(&mut self, events: Vec<GameEvent>) {
        let Some((winner, draw)) = events.iter().find_map(|e| match e {
            GameEvent::GameOver { winner, draw } => Some((winner.clone(), *draw)),
            _ => None,
        }) else {
            return;
        };

        if let Some(recorder) = self.recorder.as_mut() {
            recorder.record_event("gameOver", json!({"winner": winner, "draw": draw}), Self::now_ms());
        }
        self.last_game_winner = Some(winner.clone());

        self.lobby.end_game();
        self.metrics.game_completed();

        let winner_color = winner
            .as_ref()
            .and_then(|w| self.game.as_ref().and_then(|g| g.players.iter().find(|p| &p.id == w)))
            .map(|p| p.color.clone());

        self.broadcaster
            .broadcast_to_lobby(
                &self.lobby.lobby_id,
                ServerMessage::GameOver {
                    winner,
                    winner_color,
                    draw,
                    replay_available: self.recorder.is_some(),
                },
            )
            .await;

        if let Some(game) = self.game.as_mut() {
            reset_players_for_next_round(
                &mut game.players,
                game.grid_size,
                &game.obstacles,
                self.config.grid_margin,
                self.config.safe_spawn_attempts,
            );
            self.lobby.players = game.players.clone();
        }
        self.game = None;
    }

    async fn save_replay(&mut self, user_id: Option<String>) -> Result<String, RouterError> {
        let Some(recorder) = self.recorder.take() else {
            return Err(RouterError::NoReplayAvailable);
        };
        let user_id = user_id.unwrap_or_else(|| "anonymous".to_string());
        let player_count = self.lobby.players.len();
        let winner = self.last_game_winner.clone().flatten();

        let data = recorder
            .finish(user_id, winner, player_count, Self::now_ms())
            .map_err(|_| RouterError::NoReplayAvailable)?;

        match self.replay_store.save(data, self.config.replays_per_user).await {
            Ok(id) => {
                self.metrics.replay_saved();
                Ok(id)
            }
            Err(_) => Err(RouterError::NoReplayAvailable),
        }
    }

    async fn broadcast_lobby_state(&self) {
        let countdown_remaining = if self.lobby.phase == LobbyPhase::Starting {
            self.lobby.seconds_remaining(self.config.countdown_ms as u64, Self::now_ms())
        } else {
            None
        };

        let view = LobbyStateView {
            lobby_id: self.lobby.lobby_id.clone(),
            state: self.lobby.phase,
            players: self
                .lobby
                .players
                .iter()
                .map(|p| PlayerSummary { id: p.id.clone(), name: p.name.clone(), color: p.color.clone(), ready: p.is_ready })
                .collect(),
            spectators: self
                .lobby
                .spectators
                .iter()
                .map(|s| SpectatorSummary { id: s.id.clone(), name: s.name.clone(), color: s.color.clone() })
                .collect(),
            settings: self.lobby.settings,
            host_id: self.lobby.host_id.clone(),
            countdown_remaining,
            round_number: self.lobby.round_number,
        };
        self.update_snapshot().await;
        self.broadcaster
            .broadcast_to_lobby(&self.lobby.lobby_id, ServerMessage::LobbyState(Box::new(view)))
            .await;
    }

    async fn update_snapshot(&self) {
        let host_name = self
            .lobby
            .host_id
            .as_ref()
            .and_then(|id| self.lobby.find_player(id))
            .map(|p| p.name.clone());
        let item = LobbyListItem {
            lobby_id: self.lobby.lobby_id.clone(),
            player_count: self.lobby.players.len(),
            max_players: self.lobby.settings.max_players,
            grid_size: self.lobby.settings.grid_size,
            is_private: self.lobby.settings.is_private,
            host_name,
            state: self.lobby.phase,
        };
        *self.snapshot.write().await = item;
    }

    async fn broadcast_game_state(&self) {
        let Some(game) = &self.game else { return };
        let view = GameStateView {
            players: game.players.clone(),
            power_ups: game.power_ups.clone(),
            obstacles: game.obstacles.iter().cloned().collect(),
            grid_size: game.grid_size,
            game_state: game_phase_label(game.phase),
            is_delta: None,
        };
        self.broadcaster
            .broadcast_to_lobby(&self.lobby.lobby_id, ServerMessage::GameState(Box::new(view)))
            .await;
    }
}

fn game_phase_label(phase: GamePhase) -> String {
    match phase {
        GamePhase::Idle => "idle",
        GamePhase::Playing => "playing",
        GamePhase::Paused => "paused",
        GamePhase::GameOver => "gameOver",
    }
    .to_string()
}
