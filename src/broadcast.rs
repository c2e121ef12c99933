//! The broadcast fabric: per-peer outgoing channels plus room/browsing fan-out.
//!
//! Grounded on the teacher's `InMemoryMessageCoordinator`: an `mpsc::Sender` per
//! connected peer registered in a shared map, with `try_send` so a slow or dead
//! peer never stalls the sender — a full queue just drops the message.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};

use crate::protocol::messages::ServerMessage;
use crate::protocol::types::{LobbyId, PlayerId};

pub struct Broadcaster {
    peers: RwLock<HashMap<PlayerId, mpsc::Sender<Arc<ServerMessage>>>>,
    lobby_members: RwLock<HashMap<LobbyId, HashSet<PlayerId>>>,
    browsing: RwLock<HashSet<PlayerId>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self {
            peers: RwLock::new(HashMap::new()),
            lobby_members: RwLock::new(HashMap::new()),
            browsing: RwLock::new(HashSet::new()),
        }
    }

    pub async fn register(&self, player_id: PlayerId, sender: mpsc::Sender<Arc<ServerMessage>>) {
        self.peers.write().await.insert(player_id.clone(), sender);
        self.browsing.write().await.insert(player_id);
    }

    /// Move a peer's registration to a different id in place, used when a
    /// reconnect swaps a connection's temporary id for its reclaimed identity.
    pub async fn rebind(&self, old_id: &str, new_id: String) {
        let sender = self.peers.write().await.remove(old_id);
        if let Some(sender) = sender {
            self.peers.write().await.insert(new_id.clone(), sender);
        }
        if self.browsing.write().await.remove(old_id) {
            self.browsing.write().await.insert(new_id.clone());
        }
        let mut lobby_members = self.lobby_members.write().await;
        for members in lobby_members.values_mut() {
            if members.remove(old_id) {
                members.insert(new_id.clone());
            }
        }
    }

    pub async fn unregister(&self, player_id: &str) {
        self.peers.write().await.remove(player_id);
        self.browsing.write().await.remove(player_id);
        let mut lobby_members = self.lobby_members.write().await;
        lobby_members.retain(|_, members| {
            members.remove(player_id);
            !members.is_empty()
        });
    }

    /// Move a peer between the browsing set and a lobby's member set.
    pub async fn set_lobby(&self, player_id: &str, lobby_id: Option<&str>) {
        self.browsing.write().await.remove(player_id);
        let mut lobby_members = self.lobby_members.write().await;
        lobby_members.retain(|_, members| {
            members.remove(player_id);
            !members.is_empty()
        });
        match lobby_id {
            Some(lobby_id) => {
                lobby_members.entry(lobby_id.to_string()).or_default().insert(player_id.to_string());
            }
            None => {
                drop(lobby_members);
                self.browsing.write().await.insert(player_id.to_string());
            }
        }
    }

    pub async fn send_to_peer(&self, player_id: &str, message: ServerMessage) {
        let msg = Arc::new(message);
        let peers = self.peers.read().await;
        if let Some(sender) = peers.get(player_id) {
            if sender.try_send(Arc::clone(&msg)).is_err() {
                tracing::warn!(player_id, "dropped message, peer queue full or closed");
            }
        }
    }

    pub async fn broadcast_to_lobby(&self, lobby_id: &str, message: ServerMessage) {
        let msg = Arc::new(message);
        let members = self.lobby_members.read().await;
        let Some(player_ids) = members.get(lobby_id) else {
            return;
        };
        let peers = self.peers.read().await;
        for player_id in player_ids {
            if let Some(sender) = peers.get(player_id) {
                if sender.try_send(Arc::clone(&msg)).is_err() {
                    tracing::warn!(player_id, lobby_id, "dropped broadcast, peer queue full or closed");
                }
            }
        }
    }

    pub async fn broadcast_to_browsing(&self, message: ServerMessage) {
        let msg = Arc::new(message);
        let browsing = self.browsing.read().await;
        let peers = self.peers.read().await;
        for player_id in browsing.iter() {
            if let Some(sender) = peers.get(player_id) {
                let _ = sender.try_send(Arc::clone(&msg));
            }
        }
    }

    pub async fn lobby_member_count(&self, lobby_id: &str) -> usize {
        self.lobby_members
            .read()
            .await
            .get(lobby_id)
            .map(HashSet::len)
            .unwrap_or(0)
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

pub type SharedBroadcaster = Arc<Broadcaster>;
