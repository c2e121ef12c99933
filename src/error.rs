//! Typed error taxonomy for router-level validation failures and replay storage.
//!
//! Everything here maps onto a single `error {message}` frame sent back to the
//! offending peer (see the Error Handling Design). Unexpected failures below this
//! layer are handled with `anyhow` at the process boundaries instead.

use thiserror::Error;

/// Validation and authorization failures surfaced to a connected peer as
/// `ServerMessage::Error`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouterError {
    #[error("lobby not found")]
    LobbyNotFound,
    #[error("spectators are disabled for this lobby")]
    SpectatorsDisabled,
    #[error("lobby is full")]
    LobbyFull,
    #[error("you are banned from this lobby")]
    Banned,
    #[error("you are not in a lobby")]
    NotInLobby,
    #[error("you cannot target yourself")]
    CannotTargetSelf,
    #[error("you cannot kick or ban an AI player")]
    CannotTargetAi,
    #[error("only the host may do that")]
    HostOnly,
    #[error("no replay available")]
    NoReplayAvailable,
    #[error("replay not found")]
    ReplayNotFound,
    #[error("reconnect token expired or unknown")]
    ReconnectExpired,
    #[error("lobby is not accepting that action right now")]
    InvalidLobbyState,
    #[error("not currently in a game")]
    NotInGame,
}

/// Failures from the opaque replay key-value store.
#[derive(Debug, Error)]
pub enum ReplayStoreError {
    #[error("replay {0} not found")]
    NotFound(String),
    #[error("backing store error: {0}")]
    Backend(String),
}
