//! The lobby state machine: membership, readiness, host authority, bans, AI slots.
//!
//! ```text
//! [*] --> waiting: CreateLobby
//!
//! waiting --> starting: every player ready (>=1 human)
//! starting --> waiting: PlayerLeave (countdown cancelled)
//! starting --> inGame: countdown elapsed
//! inGame --> finished: GameEnded
//! finished --> waiting: ReturnToLobby
//! any --> closed: CloseLobby
//! ```
//!
//! This module models the machine as an explicit state enum plus guarded, pure
//! transition methods on [`Lobby`]; no I/O or broadcasting happens here. Callers
//! (the per-lobby actor) inspect the returned outcome and schedule whatever
//! broadcasts or timers the transition implies.

use serde::{Deserialize, Serialize};

use crate::error::RouterError;
use crate::protocol::types::{is_ai_id, LobbySettings, LobbySettingsPatch, Player, PlayerId, Spectator, SpectatorId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LobbyPhase {
    Waiting,
    Starting,
    InGame,
    Finished,
    Closed,
}

#[derive(Debug, Clone)]
pub struct Lobby {
    pub lobby_id: String,
    pub lobby_name: Option<String>,
    pub host_id: Option<PlayerId>,
    pub players: Vec<Player>,
    pub spectators: Vec<Spectator>,
    pub banned_ids: Vec<PlayerId>,
    pub settings: LobbySettings,
    pub created_at: i64,
    pub countdown_started_at: Option<i64>,
    pub round_number: u32,
    pub phase: LobbyPhase,
}

impl Lobby {
    pub fn new(lobby_id: String, settings: LobbySettings, now: i64) -> Self {
        Self {
            lobby_id,
            lobby_name: None,
            host_id: None,
            players: Vec::new(),
            spectators: Vec::new(),
            banned_ids: Vec::new(),
            settings,
            created_at: now,
            countdown_started_at: None,
            round_number: 0,
            phase: LobbyPhase::Waiting,
        }
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.settings.max_players as usize
    }

    pub fn is_banned(&self, player_id: &str) -> bool {
        self.banned_ids.iter().any(|b| b == player_id)
    }

    /// Humans (non-AI players); the host must always be one of these.
    pub fn human_count(&self) -> usize {
        self.players.iter().filter(|p| !p.is_ai()).count()
    }

    pub fn find_player(&self, player_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    pub fn find_player_mut(&mut self, player_id: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == player_id)
    }

    /// `waiting --PlayerJoin--> waiting`. Rejects a full or banned lobby; assigns the
    /// first non-AI joiner as host if the lobby is currently host-less.
    pub fn add_player(&mut self, player: Player) -> Result<(), RouterError> {
        if self.phase != LobbyPhase::Waiting {
            return Err(RouterError::InvalidLobbyState);
        }
        if self.is_banned(&player.id) {
            return Err(RouterError::Banned);
        }
        if self.is_full() {
            return Err(RouterError::LobbyFull);
        }
        if self.host_id.is_none() && !player.is_ai() {
            self.host_id = Some(player.id.clone());
        }
        self.players.push(player);
        Ok(())
    }

    /// `PlayerLeave`. Promotes the first remaining human to host if the host left; AI
    /// never becomes host. Returns true if the lobby is now empty of humans.
    pub fn remove_player(&mut self, player_id: &str) -> bool {
        self.players.retain(|p| p.id != player_id);
        if self.host_id.as_deref() == Some(player_id) {
            self.host_id = self
                .players
                .iter()
                .find(|p| !p.is_ai())
                .map(|p| p.id.clone());
        }
        if self.phase == LobbyPhase::Starting {
            self.cancel_countdown();
        }
        self.human_count() == 0
    }

    pub fn add_spectator(&mut self, spectator: Spectator) -> Result<(), RouterError> {
        if !self.settings.allow_spectators {
            return Err(RouterError::SpectatorsDisabled);
        }
        self.spectators.push(spectator);
        Ok(())
    }

    pub fn remove_spectator(&mut self, spectator_id: &str) {
        self.spectators.retain(|s| s.id != spectator_id);
    }

    /// `PlayerReady`. Auto-advances to `starting` once at least one human and every
    /// player (human + bot) is ready.
    pub fn set_ready(&mut self, player_id: &str, ready: bool, now: i64) -> Result<(), RouterError> {
        if self.phase != LobbyPhase::Waiting {
            return Err(RouterError::InvalidLobbyState);
        }
        let Some(player) = self.find_player_mut(player_id) else {
            return Err(RouterError::NotInLobby);
        };
        player.is_ready = ready;

        if self.human_count() > 0 && !self.players.is_empty() && self.players.iter().all(|p| p.is_ready) {
            self.enter_starting(now);
        }
        Ok(())
    }

    fn enter_starting(&mut self, now: i64) {
        self.phase = LobbyPhase::Starting;
        self.countdown_started_at = Some(now);
    }

    /// Cancel an in-progress countdown and return to `waiting`.
    pub fn cancel_countdown(&mut self) {
        if self.phase == LobbyPhase::Starting {
            self.phase = LobbyPhase::Waiting;
            self.countdown_started_at = None;
            for p in &mut self.players {
                p.is_ready = false;
            }
        }
    }

    /// The `starting` timer fired. Clears readiness and moves to `inGame`.
    pub fn begin_game(&mut self) {
        self.phase = LobbyPhase::InGame;
        self.countdown_started_at = None;
        for p in &mut self.players {
            p.is_ready = false;
        }
    }

    pub fn seconds_remaining(&self, countdown_ms: u64, now: i64) -> Option<u64> {
        let started = self.countdown_started_at?;
        let elapsed = (now - started).max(0) as u64;
        let remaining_ms = countdown_ms.saturating_sub(elapsed);
        Some(remaining_ms.div_ceil(1000))
    }

    pub fn add_ai_bot(&mut self, player: Player) -> Result<(), RouterError> {
        if self.phase != LobbyPhase::Waiting {
            return Err(RouterError::InvalidLobbyState);
        }
        if self.is_full() {
            return Err(RouterError::LobbyFull);
        }
        self.players.push(player);
        Ok(())
    }

    pub fn remove_ai_bot(&mut self, player_id: &str) {
        self.players.retain(|p| p.id != player_id || !p.is_ai());
    }

    pub fn kick_player(&mut self, sender: &str, target: &str) -> Result<(), RouterError> {
        self.require_host(sender)?;
        self.require_not_self(sender, target)?;
        self.require_not_ai(target)?;
        self.players.retain(|p| p.id != target);
        if self.host_id.as_deref() == Some(target) {
            self.host_id = self.players.iter().find(|p| !p.is_ai()).map(|p| p.id.clone());
        }
        Ok(())
    }

    pub fn ban_player(&mut self, sender: &str, target: &str) -> Result<(), RouterError> {
        self.kick_player(sender, target)?;
        if !self.banned_ids.iter().any(|b| b == target) {
            self.banned_ids.push(target.to_string());
        }
        Ok(())
    }

    pub fn update_settings(&mut self, sender: &str, patch: LobbySettingsPatch) -> Result<(), RouterError> {
        self.require_host(sender)?;
        if let Some(v) = patch.is_private {
            self.settings.is_private = v;
        }
        if let Some(v) = patch.grid_size {
            self.settings.grid_size = v;
        }
        if let Some(v) = patch.max_players {
            self.settings.max_players = v;
        }
        if let Some(v) = patch.allow_spectators {
            self.settings.allow_spectators = v;
        }
        if let Some(name) = patch.lobby_name {
            self.lobby_name = Some(name);
        }
        Ok(())
    }

    fn require_host(&self, sender: &str) -> Result<(), RouterError> {
        if self.host_id.as_deref() == Some(sender) {
            Ok(())
        } else {
            Err(RouterError::HostOnly)
        }
    }

    fn require_not_self(&self, sender: &str, target: &str) -> Result<(), RouterError> {
        if sender == target {
            Err(RouterError::CannotTargetSelf)
        } else {
            Ok(())
        }
    }

    fn require_not_ai(&self, target: &str) -> Result<(), RouterError> {
        if is_ai_id(target) {
            Err(RouterError::CannotTargetAi)
        } else {
            Ok(())
        }
    }

    /// `GameEnded`. The winner (if any) has already been decided by the game machine.
    pub fn end_game(&mut self) {
        self.phase = LobbyPhase::Finished;
    }

    /// `ReturnToLobby`. Bots auto-re-ready; humans must ready up again.
    pub fn return_to_lobby(&mut self) {
        self.phase = LobbyPhase::Waiting;
        self.round_number += 1;
        for p in &mut self.players {
            p.is_ready = p.is_ai();
        }
    }

    pub fn close(&mut self) {
        self.phase = LobbyPhase::Closed;
    }

    /// Invariant check: `hostId` is null or refers to a current non-AI player.
    pub fn host_invariant_holds(&self) -> bool {
        match &self.host_id {
            None => true,
            Some(id) => self
                .players
                .iter()
                .any(|p| &p.id == id && !p.is_ai()),
        }
    }
}
