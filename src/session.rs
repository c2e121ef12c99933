//! Session tracking: the live peer table and the disconnect/reconnect archive.
//!
//! Grounded on the teacher's `ReconnectionManager`: a `RwLock`-guarded table keyed
//! by a token, swept on a timer rather than on every lookup.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::protocol::types::{LobbyId, PlayerId, ReconnectToken};

/// A connected peer's session state. `lobby_id = None` means the peer is
/// browsing the lobby list rather than joined to one.
#[derive(Debug, Clone)]
pub struct Session {
    pub player_id: PlayerId,
    pub lobby_id: Option<LobbyId>,
    pub is_spectator: bool,
    pub reconnect_token: ReconnectToken,
    pub user_id: Option<String>,
}

/// An archived session, kept around so a dropped peer can reclaim its identity.
#[derive(Debug, Clone)]
pub struct ArchivedSession {
    pub player_id: PlayerId,
    pub lobby_id: Option<LobbyId>,
    pub is_spectator: bool,
    pub user_id: Option<String>,
    pub last_seen: i64,
}

impl ArchivedSession {
    fn is_swept(&self, now: i64, sweep_threshold_ms: i64) -> bool {
        now - self.last_seen >= sweep_threshold_ms
    }

    fn is_within_reconnect_window(&self, now: i64, reconnect_window_ms: i64) -> bool {
        now - self.last_seen < reconnect_window_ms
    }
}

pub struct SessionManager {
    live: RwLock<HashMap<PlayerId, Session>>,
    archived: RwLock<HashMap<ReconnectToken, ArchivedSession>>,
    reconnect_window_ms: i64,
    sweep_threshold_ms: i64,
}

impl SessionManager {
    pub fn new(reconnect_window_ms: i64, sweep_threshold_ms: i64) -> Self {
        Self {
            live: RwLock::new(HashMap::new()),
            archived: RwLock::new(HashMap::new()),
            reconnect_window_ms,
            sweep_threshold_ms,
        }
    }

    /// Register a freshly connected peer in the browsing state.
    pub async fn connect(&self, player_id: PlayerId, reconnect_token: ReconnectToken) -> Session {
        let session = Session {
            player_id: player_id.clone(),
            lobby_id: None,
            is_spectator: false,
            reconnect_token,
            user_id: None,
        };
        self.live.write().await.insert(player_id, session.clone());
        session
    }

    pub async fn set_lobby(&self, player_id: &str, lobby_id: Option<LobbyId>, is_spectator: bool) {
        if let Some(session) = self.live.write().await.get_mut(player_id) {
            session.lobby_id = lobby_id;
            session.is_spectator = is_spectator;
        }
    }

    pub async fn set_user_id(&self, player_id: &str, user_id: String) {
        if let Some(session) = self.live.write().await.get_mut(player_id) {
            session.user_id = Some(user_id);
        }
    }

    pub async fn get(&self, player_id: &str) -> Option<Session> {
        self.live.read().await.get(player_id).cloned()
    }

    pub async fn players_in_lobby(&self, lobby_id: &str) -> Vec<PlayerId> {
        self.live
            .read()
            .await
            .values()
            .filter(|s| s.lobby_id.as_deref() == Some(lobby_id))
            .map(|s| s.player_id.clone())
            .collect()
    }

    pub async fn browsing_players(&self) -> Vec<PlayerId> {
        self.live
            .read()
            .await
            .values()
            .filter(|s| s.lobby_id.is_none())
            .map(|s| s.player_id.clone())
            .collect()
    }

    /// Drop a live session without archiving it, used to discard the
    /// temporary id a connection held before a successful reconnect.
    pub async fn forget(&self, player_id: &str) {
        self.live.write().await.remove(player_id);
    }

    /// Disconnect: move the session out of the live table and into the archive,
    /// keyed by its reconnect token.
    pub async fn disconnect(&self, player_id: &str, now: i64) {
        let Some(session) = self.live.write().await.remove(player_id) else {
            return;
        };
        let archived = ArchivedSession {
            player_id: session.player_id,
            lobby_id: session.lobby_id,
            is_spectator: session.is_spectator,
            user_id: session.user_id,
            last_seen: now,
        };
        self.archived.write().await.insert(session.reconnect_token, archived);
    }

    /// Adopt an archived session if the token is known and still within the
    /// reconnect window; rebinds it as live under the same token.
    pub async fn reconnect(&self, token: &str, now: i64) -> Option<Session> {
        let archived = {
            let mut archive = self.archived.write().await;
            let entry = archive.get(token)?;
            if !entry.is_within_reconnect_window(now, self.reconnect_window_ms) {
                archive.remove(token);
                return None;
            }
            archive.remove(token)?
        };

        let session = Session {
            player_id: archived.player_id,
            lobby_id: archived.lobby_id,
            is_spectator: archived.is_spectator,
            reconnect_token: token.to_string(),
            user_id: archived.user_id,
        };
        self.live.write().await.insert(session.player_id.clone(), session.clone());
        Some(session)
    }

    /// Evict archives older than the sweep threshold. Returns how many were
    /// removed, for logging.
    pub async fn sweep_expired(&self, now: i64) -> usize {
        let mut archive = self.archived.write().await;
        let before = archive.len();
        archive.retain(|_, entry| !entry.is_swept(now, self.sweep_threshold_ms));
        before - archive.len()
    }
}

pub type SharedSessionManager = Arc<SessionManager>;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reconnect_within_window_restores_identity() {
        let manager = SessionManager::new(60_000, 120_000);
        let session = manager.connect("p1".into(), "tok-1".into()).await;
        manager.set_lobby(&session.player_id, Some("L1".into()), false).await;
        manager.disconnect("p1", 1_000).await;

        let restored = manager.reconnect("tok-1", 30_000).await.unwrap();
        assert_eq!(restored.player_id, "p1");
        assert_eq!(restored.lobby_id.as_deref(), Some("L1"));
    }

    #[tokio::test]
    async fn reconnect_past_the_window_fails() {
        let manager = SessionManager::new(60_000, 120_000);
        manager.connect("p1".into(), "tok-1".into()).await;
        manager.disconnect("p1", 0).await;

        assert!(manager.reconnect("tok-1", 70_000).await.is_none());
    }

    #[tokio::test]
    async fn sweep_removes_only_stale_archives() {
        let manager = SessionManager::new(60_000, 120_000);
        manager.connect("p1".into(), "tok-1".into()).await;
        manager.disconnect("p1", 0).await;

        let removed = manager.sweep_expired(60_000).await;
        assert_eq!(removed, 0);
        let removed = manager.sweep_expired(130_000).await;
        assert_eq!(removed, 1);
    }
}
