//! The lobby registry: creates, looks up, and lists lobbies; owns the shared
//! broadcaster, session table, and replay store that every lobby worker shares.

pub mod lobby_actor;
pub mod message_router;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, RwLock};

use crate::broadcast::{Broadcaster, SharedBroadcaster};
use crate::config::ServerConfig;
use crate::error::RouterError;
use crate::lobby::Lobby;
use crate::metrics::ServerMetrics;
use crate::protocol::messages::LobbyListItem;
use crate::protocol::types::{LobbyId, LobbySettings, LobbySettingsPatch, PlayerId};
use crate::replay::{InMemoryReplayStore, ReplayData, ReplayMetadata, ReplayStore};
use crate::session::{SessionManager, SharedSessionManager};

use lobby_actor::{JoinOutcome, LobbyActor, LobbyCommand, LobbyRuntimeConfig, LobbySnapshot, SpectatorJoinOutcome};

struct LobbyHandle {
    sender: mpsc::Sender<LobbyCommand>,
    snapshot: LobbySnapshot,
}

pub struct LobbyManager {
    handles: RwLock<HashMap<LobbyId, LobbyHandle>>,
    broadcaster: SharedBroadcaster,
    sessions: SharedSessionManager,
    replay_store: Arc<dyn ReplayStore>,
    metrics: Arc<ServerMetrics>,
    config: ServerConfig,
}

impl LobbyManager {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            handles: RwLock::new(HashMap::new()),
            broadcaster: Arc::new(Broadcaster::new()),
            sessions: Arc::new(SessionManager::new(
                config.reconnect_window_ms,
                config.session_sweep_threshold_ms,
            )),
            replay_store: Arc::new(InMemoryReplayStore::new()),
            metrics: Arc::new(ServerMetrics::new()),
            config,
        }
    }

    pub fn broadcaster(&self) -> SharedBroadcaster {
        self.broadcaster.clone()
    }

    pub fn sessions(&self) -> SharedSessionManager {
        self.sessions.clone()
    }

    pub fn metrics(&self) -> Arc<ServerMetrics> {
        self.metrics.clone()
    }

    fn runtime_config(&self) -> LobbyRuntimeConfig {
        LobbyRuntimeConfig {
            grid_margin: self.config.grid_margin,
            obstacle_density: self.config.obstacle_density,
            min_obstacle_spacing: self.config.min_obstacle_spacing,
            obstacle_spawn_attempts: self.config.obstacle_spawn_attempts,
            safe_spawn_attempts: self.config.safe_spawn_attempts,
            countdown_ms: self.config.countdown_ms as i64,
            tick_rate_ms: self.config.tick_rate_ms,
            speed_boost_duration_ms: self.config.speed_boost_duration_ms,
            max_power_ups: self.config.max_power_ups,
            color_hue_threshold_deg: self.config.color_hue_threshold_deg,
            max_player_name_len: self.config.max_player_name_len,
            replays_per_user: self.config.replays_per_user,
        }
    }

    pub async fn lobby_list(&self) -> Vec<LobbyListItem> {
        let handles = self.handles.read().await;
        let mut items = Vec::with_capacity(handles.len());
        for handle in handles.values() {
            items.push(handle.snapshot.read().await.clone());
        }
        items
    }

    /// `createLobby`: the creator immediately joins as host.
    pub async fn create_lobby(
        &self,
        player_id: PlayerId,
        player_name: String,
        patch: LobbySettingsPatch,
    ) -> Result<(LobbyId, JoinOutcome), RouterError> {
        if self.handles.read().await.len() >= self.config.max_lobbies {
            return Err(RouterError::LobbyFull);
        }

        let lobby_id = uuid::Uuid::new_v4().to_string();
        let mut settings = LobbySettings {
            is_private: false,
            grid_size: self.config.default_grid_size,
            max_players: self.config.default_max_players,
            allow_spectators: true,
        };
        if let Some(v) = patch.is_private {
            settings.is_private = v;
        }
        if let Some(v) = patch.grid_size {
            settings.grid_size = v;
        }
        if let Some(v) = patch.max_players {
            settings.max_players = v;
        }
        if let Some(v) = patch.allow_spectators {
            settings.allow_spectators = v;
        }

        let mut lobby = Lobby::new(lobby_id.clone(), settings, now_ms());
        lobby.lobby_name = patch.lobby_name;

        let snapshot: LobbySnapshot = Arc::new(RwLock::new(LobbyListItem {
            lobby_id: lobby_id.clone(),
            player_count: 0,
            max_players: settings.max_players,
            grid_size: settings.grid_size,
            is_private: settings.is_private,
            host_name: None,
            state: lobby.phase,
        }));

        let sender = LobbyActor::spawn(
            lobby,
            self.runtime_config(),
            self.broadcaster.clone(),
            self.sessions.clone(),
            self.replay_store.clone(),
            self.metrics.clone(),
            snapshot.clone(),
        );

        self.handles
            .write()
            .await
            .insert(lobby_id.clone(), LobbyHandle { sender: sender.clone(), snapshot });
        self.metrics.lobby_created();

        let (tx, rx) = oneshot::channel();
        let _ = sender
            .send(LobbyCommand::Join { player_id, player_name, respond: tx })
            .await;
        let outcome = rx.await.map_err(|_| RouterError::LobbyNotFound)??;
        Ok((lobby_id, outcome))
    }

    async fn handle_of(&self, lobby_id: &str) -> Result<mpsc::Sender<LobbyCommand>, RouterError> {
        self.handles
            .read()
            .await
            .get(lobby_id)
            .map(|h| h.sender.clone())
            .ok_or(RouterError::LobbyNotFound)
    }

    async fn forget_if_closed(&self, lobby_id: &str) {
        let sender = self.handles.read().await.get(lobby_id).map(|h| h.sender.clone());
        if let Some(sender) = sender {
            if sender.is_closed() {
                self.handles.write().await.remove(lobby_id);
            }
        }
    }

    pub async fn join_lobby(&self, lobby_id: &str, player_id: PlayerId, player_name: String) -> Result<JoinOutcome, RouterError> {
        let sender = self.handle_of(lobby_id).await?;
        let (tx, rx) = oneshot::channel();
        sender
            .send(LobbyCommand::Join { player_id, player_name, respond: tx })
            .await
            .map_err(|_| RouterError::LobbyNotFound)?;
        rx.await.map_err(|_| RouterError::LobbyNotFound)?
    }

    pub async fn join_as_spectator(
        &self,
        lobby_id: &str,
        spectator_id: String,
        spectator_name: String,
    ) -> Result<SpectatorJoinOutcome, RouterError> {
        let sender = self.handle_of(lobby_id).await?;
        let (tx, rx) = oneshot::channel();
        sender
            .send(LobbyCommand::JoinSpectator { spectator_id, spectator_name, respond: tx })
            .await
            .map_err(|_| RouterError::LobbyNotFound)?;
        rx.await.map_err(|_| RouterError::LobbyNotFound)?
    }

    pub async fn leave_lobby(&self, lobby_id: &str, player_id: PlayerId, is_spectator: bool) {
        if let Ok(sender) = self.handle_of(lobby_id).await {
            let cmd = if is_spectator {
                LobbyCommand::LeaveSpectator { spectator_id: player_id }
            } else {
                LobbyCommand::Leave { player_id }
            };
            let _ = sender.send(cmd).await;
            self.forget_if_closed(lobby_id).await;
        }
    }

    pub async fn set_name(&self, lobby_id: &str, player_id: PlayerId, name: String) {
        if let Ok(sender) = self.handle_of(lobby_id).await {
            let _ = sender.send(LobbyCommand::SetName { player_id, name }).await;
        }
    }

    pub async fn set_ready(&self, lobby_id: &str, player_id: PlayerId, ready: bool) {
        if let Ok(sender) = self.handle_of(lobby_id).await {
            let _ = sender.send(LobbyCommand::Ready { player_id, ready }).await;
        }
    }

    pub async fn update_settings(&self, lobby_id: &str, player_id: PlayerId, patch: LobbySettingsPatch) -> Result<(), RouterError> {
        let sender = self.handle_of(lobby_id).await?;
        let (tx, rx) = oneshot::channel();
        sender
            .send(LobbyCommand::UpdateSettings { player_id, patch, respond: tx })
            .await
            .map_err(|_| RouterError::LobbyNotFound)?;
        rx.await.map_err(|_| RouterError::LobbyNotFound)?
    }

    pub async fn kick_player(&self, lobby_id: &str, player_id: PlayerId, target: PlayerId) -> Result<(), RouterError> {
        let sender = self.handle_of(lobby_id).await?;
        let (tx, rx) = oneshot::channel();
        sender
            .send(LobbyCommand::Kick { player_id, target, respond: tx })
            .await
            .map_err(|_| RouterError::LobbyNotFound)?;
        rx.await.map_err(|_| RouterError::LobbyNotFound)?
    }

    pub async fn ban_player(&self, lobby_id: &str, player_id: PlayerId, target: PlayerId) -> Result<(), RouterError> {
        let sender = self.handle_of(lobby_id).await?;
        let (tx, rx) = oneshot::channel();
        sender
            .send(LobbyCommand::Ban { player_id, target, respond: tx })
            .await
            .map_err(|_| RouterError::LobbyNotFound)?;
        rx.await.map_err(|_| RouterError::LobbyNotFound)?
    }

    pub async fn add_ai_bot(&self, lobby_id: &str, player_id: PlayerId) -> Result<(), RouterError> {
        let sender = self.handle_of(lobby_id).await?;
        let (tx, rx) = oneshot::channel();
        sender
            .send(LobbyCommand::AddAiBot { player_id, respond: tx })
            .await
            .map_err(|_| RouterError::LobbyNotFound)?;
        rx.await.map_err(|_| RouterError::LobbyNotFound)?
    }

    pub async fn remove_ai_bot(&self, lobby_id: &str, player_id: PlayerId, target: PlayerId) -> Result<(), RouterError> {
        let sender = self.handle_of(lobby_id).await?;
        let (tx, rx) = oneshot::channel();
        sender
            .send(LobbyCommand::RemoveAiBot { player_id, target, respond: tx })
            .await
            .map_err(|_| RouterError::LobbyNotFound)?;
        rx.await.map_err(|_| RouterError::LobbyNotFound)?
    }

    pub async fn return_to_lobby(&self, lobby_id: &str, player_id: PlayerId) {
        if let Ok(sender) = self.handle_of(lobby_id).await {
            let _ = sender.send(LobbyCommand::ReturnToLobby { player_id }).await;
        }
    }

    pub async fn save_replay(&self, lobby_id: &str, player_id: PlayerId, user_id: Option<String>) -> Result<String, RouterError> {
        let sender = self.handle_of(lobby_id).await?;
        let (tx, rx) = oneshot::channel();
        sender
            .send(LobbyCommand::SaveReplay { player_id, user_id, respond: tx })
            .await
            .map_err(|_| RouterError::LobbyNotFound)?;
        rx.await.map_err(|_| RouterError::LobbyNotFound)?
    }

    pub async fn player_move(&self, lobby_id: &str, player_id: PlayerId, direction: crate::protocol::types::Direction) {
        if let Ok(sender) = self.handle_of(lobby_id).await {
            let _ = sender.send(LobbyCommand::Move { player_id, direction }).await;
        }
    }

    pub async fn player_brake(&self, lobby_id: &str, player_id: PlayerId, braking: bool) {
        if let Ok(sender) = self.handle_of(lobby_id).await {
            let _ = sender.send(LobbyCommand::Brake { player_id, braking }).await;
        }
    }

    pub async fn load_replay(&self, replay_id: &str) -> Result<ReplayData, RouterError> {
        self.replay_store.load(replay_id).await.map_err(|_| RouterError::ReplayNotFound)
    }

    pub async fn delete_replay(&self, user_id: &str, replay_id: &str) -> Result<(), RouterError> {
        self.replay_store
            .delete(user_id, replay_id)
            .await
            .map_err(|_| RouterError::ReplayNotFound)
    }

    pub async fn list_user_replays(&self, user_id: &str) -> Vec<ReplayMetadata> {
        self.replay_store.list_for_user(user_id).await
    }

    /// Periodic background sweep: evict stale session archives and drop any
    /// lobby handle whose worker has already exited.
    pub async fn sweep(&self, now: i64) {
        let removed = self.sessions.sweep_expired(now).await;
        if removed > 0 {
            tracing::debug!(removed, "swept expired session archives");
        }
        let stale: Vec<LobbyId> = {
            let handles = self.handles.read().await;
            handles
                .iter()
                .filter(|(_, h)| h.sender.is_closed())
                .map(|(id, _)| id.clone())
                .collect()
        };
        if !stale.is_empty() {
            let mut handles = self.handles.write().await;
            for id in &stale {
                handles.remove(id);
            }
        }
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub type SharedLobbyManager = Arc<LobbyManager>;
