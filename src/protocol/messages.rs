//! The wire protocol: `{type, payload}` JSON frames exchanged with connected peers.

use serde::{Deserialize, Serialize};

use super::types::{
    Direction, LobbyId, LobbySettingsPatch, Player, PlayerId, PowerUp, Spectator,
};
use crate::lobby::LobbyPhase;
use crate::replay::{ReplayData, ReplayMetadata};

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    Reconnect {
        reconnect_token: String,
    },
    SetUserId {
        user_id: String,
    },
    GetLobbyList,
    CreateLobby {
        player_name: String,
        #[serde(default)]
        settings: LobbySettingsPatch,
    },
    JoinLobby {
        lobby_id: LobbyId,
        player_name: String,
    },
    JoinLobbyAsSpectator {
        lobby_id: LobbyId,
        spectator_name: String,
    },
    LeaveLobby,
    SetName {
        name: String,
    },
    Ready {
        ready: bool,
    },
    UpdateSettings {
        settings: LobbySettingsPatch,
    },
    KickPlayer {
        player_id: PlayerId,
    },
    BanPlayer {
        player_id: PlayerId,
    },
    AddAiBot,
    RemoveAiBot {
        player_id: PlayerId,
    },
    ReturnToLobby,
    SaveReplay,
    GetUserReplays,
    LoadReplay {
        replay_id: String,
    },
    DeleteReplay {
        replay_id: String,
    },
    Move {
        direction: Direction,
    },
    Brake {
        braking: bool,
    },
}

/// Compact lobby-list entry, as advertised to browsing peers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyListItem {
    pub lobby_id: LobbyId,
    pub player_count: usize,
    pub max_players: u8,
    pub grid_size: u32,
    pub is_private: bool,
    pub host_name: Option<String>,
    pub state: LobbyPhase,
}

/// The compact lobby view broadcast on every lobby-affecting event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyStateView {
    pub lobby_id: LobbyId,
    pub state: LobbyPhase,
    pub players: Vec<PlayerSummary>,
    pub spectators: Vec<SpectatorSummary>,
    pub settings: crate::protocol::types::LobbySettings,
    pub host_id: Option<PlayerId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub countdown_remaining: Option<u64>,
    pub round_number: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSummary {
    pub id: PlayerId,
    pub name: String,
    pub color: String,
    pub ready: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpectatorSummary {
    pub id: String,
    pub name: String,
    pub color: String,
}

/// The per-tick simulation snapshot broadcast to a lobby's peers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateView {
    pub players: Vec<Player>,
    pub power_ups: Vec<PowerUp>,
    pub obstacles: Vec<String>,
    pub grid_size: u32,
    pub game_state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_delta: Option<bool>,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerMessage {
    Connected {
        player_id: PlayerId,
        reconnect_token: String,
        lobbies: Vec<LobbyListItem>,
    },
    Reconnected {
        player_id: PlayerId,
        #[serde(skip_serializing_if = "Option::is_none")]
        lobby_id: Option<LobbyId>,
        is_spectator: bool,
    },
    LobbyList {
        lobbies: Vec<LobbyListItem>,
    },
    LobbyJoined {
        lobby_id: LobbyId,
        #[serde(skip_serializing_if = "Option::is_none")]
        player: Option<Player>,
        #[serde(skip_serializing_if = "Option::is_none")]
        spectator: Option<Spectator>,
        grid_size: u32,
        is_spectator: bool,
    },
    LobbyState(Box<LobbyStateView>),
    LobbyClosed {
        message: String,
    },
    Kicked {
        message: String,
    },
    Banned {
        message: String,
    },
    GameState(Box<GameStateView>),
    PlayerCrashed {
        player_id: PlayerId,
    },
    ShieldAbsorbed {
        player_id: PlayerId,
    },
    TrailEraserUsed {
        player_id: PlayerId,
    },
    GameOver {
        #[serde(skip_serializing_if = "Option::is_none")]
        winner: Option<PlayerId>,
        #[serde(skip_serializing_if = "Option::is_none")]
        winner_color: Option<String>,
        draw: bool,
        replay_available: bool,
    },
    UserReplays {
        replays: Vec<ReplayMetadata>,
    },
    ReplayData {
        replay: Box<ReplayData>,
    },
    ReplaySaved {
        replay_id: String,
        message: String,
    },
    ReplayDeleted {
        replay_id: String,
        message: String,
    },
    Error {
        message: String,
    },
}
