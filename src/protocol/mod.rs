//! Protocol module: wire message types and core domain value types.

pub mod messages;
pub mod types;

pub use messages::{
    ClientMessage, GameStateView, LobbyListItem, LobbyStateView, PlayerSummary, ServerMessage,
    SpectatorSummary,
};
pub use types::{
    is_ai_id, Cell, Direction, GameSettings, LobbyId, LobbySettings, LobbySettingsPatch, Player,
    PlayerId, PowerUp, PowerUpType, ReconnectToken, Spectator, SpectatorId,
};
