//! Replay recording and the opaque key-value replay store.
//!
//! [`Recorder`] accumulates the actions and events of a single game from
//! `gameStarted` to `gameOver`. Saving hands the assembled [`ReplayData`] to a
//! [`ReplayStore`], grounded on the key-value shape `replays:data:{id}` /
//! `replays:users:{userId}` — modeled here as two `RwLock`-guarded maps, the way
//! the teacher's `InMemoryDatabase` keeps rooms and room-code indices.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::ReplayStoreError;
use crate::protocol::types::GameSettings;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayMetadata {
    pub replay_id: String,
    pub lobby_name: Option<String>,
    pub created_at: i64,
    pub duration_secs: i64,
    pub total_ticks: u64,
    pub winner: Option<String>,
    pub player_count: usize,
    pub grid_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaySpawnPlayer {
    pub id: String,
    pub name: String,
    pub color: String,
    pub x: i32,
    pub y: i32,
    pub is_ai: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayInitialState {
    pub grid_size: u32,
    pub players: Vec<ReplaySpawnPlayer>,
    pub obstacles: Vec<String>,
    pub settings: GameSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayEntry {
    pub tick: u64,
    pub kind: String,
    pub payload: Value,
    /// Milliseconds since game start.
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayData {
    pub metadata: ReplayMetadata,
    #[serde(skip_serializing)]
    pub user_id: String,
    pub initial_state: ReplayInitialState,
    pub actions: Vec<ReplayEntry>,
    pub events: Vec<ReplayEntry>,
}

/// Accumulates one game's worth of actions and events. Discarded without saving
/// if the lobby returns to `waiting` before `saveReplay` is issued.
#[derive(Debug, Clone)]
pub struct Recorder {
    start_time: i64,
    lobby_name: Option<String>,
    grid_size: u32,
    initial_state: Option<ReplayInitialState>,
    actions: Vec<ReplayEntry>,
    events: Vec<ReplayEntry>,
    ticks: u64,
}

impl Recorder {
    pub fn new(start_time: i64, grid_size: u32, lobby_name: Option<String>) -> Self {
        Self {
            start_time,
            lobby_name,
            grid_size,
            initial_state: None,
            actions: Vec::new(),
            events: Vec::new(),
            ticks: 0,
        }
    }

    pub fn capture_initial_state(&mut self, initial_state: ReplayInitialState, now: i64) {
        self.initial_state = Some(initial_state);
        self.record_event("gameStarted", Value::Null, now);
    }

    pub fn bump_tick(&mut self) {
        self.ticks += 1;
    }

    pub fn record_action(&mut self, player_id: &str, kind: &str, payload: Value, now: i64) {
        self.actions.push(ReplayEntry {
            tick: self.ticks,
            kind: format!("{kind}:{player_id}"),
            payload,
            timestamp: now - self.start_time,
        });
    }

    pub fn record_event(&mut self, kind: &str, payload: Value, now: i64) {
        self.events.push(ReplayEntry {
            tick: self.ticks,
            kind: kind.to_string(),
            payload,
            timestamp: now - self.start_time,
        });
    }

    /// Assemble the final blob. Fails if the game never started or produced no
    /// events — there is nothing meaningful to replay.
    pub fn finish(
        self,
        user_id: String,
        winner: Option<String>,
        player_count: usize,
        now: i64,
    ) -> Result<ReplayData, ReplayStoreError> {
        let initial_state = self
            .initial_state
            .ok_or_else(|| ReplayStoreError::Backend("replay never captured an initial state".into()))?;
        if self.events.is_empty() {
            return Err(ReplayStoreError::Backend("replay has no recorded events".into()));
        }

        Ok(ReplayData {
            metadata: ReplayMetadata {
                replay_id: String::new(),
                lobby_name: self.lobby_name,
                created_at: self.start_time,
                duration_secs: (now - self.start_time) / 1000,
                total_ticks: self.ticks,
                winner,
                player_count,
                grid_size: self.grid_size,
            },
            user_id,
            initial_state,
            actions: self.actions,
            events: self.events,
        })
    }
}

/// Opaque key-value replay persistence. Errors surface as `error {message}` to
/// the requesting peer; the recorder itself is unaffected by store failures.
#[async_trait]
pub trait ReplayStore: Send + Sync {
    async fn save(&self, data: ReplayData, max_per_user: usize) -> Result<String, ReplayStoreError>;
    async fn load(&self, replay_id: &str) -> Result<ReplayData, ReplayStoreError>;
    async fn delete(&self, user_id: &str, replay_id: &str) -> Result<(), ReplayStoreError>;
    async fn list_for_user(&self, user_id: &str) -> Vec<ReplayMetadata>;
}

pub struct InMemoryReplayStore {
    blobs: Arc<RwLock<HashMap<String, ReplayData>>>,
    user_index: Arc<RwLock<HashMap<String, Vec<ReplayMetadata>>>>,
}

impl InMemoryReplayStore {
    pub fn new() -> Self {
        Self {
            blobs: Arc::new(RwLock::new(HashMap::new())),
            user_index: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryReplayStore {
    fn default() -> Self {
        Self::new()
    }
}

fn generate_replay_id() -> String {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    (0..12)
        .map(|_| ALPHABET[fastrand::usize(0..ALPHABET.len())] as char)
        .collect()
}

#[async_trait]
impl ReplayStore for InMemoryReplayStore {
    async fn save(&self, mut data: ReplayData, max_per_user: usize) -> Result<String, ReplayStoreError> {
        let id = generate_replay_id();
        data.metadata.replay_id = id.clone();
        let user_id = data.user_id.clone();
        let metadata = data.metadata.clone();

        self.blobs.write().await.insert(id.clone(), data);

        let evicted: Vec<String> = {
            let mut index = self.user_index.write().await;
            let entries = index.entry(user_id).or_default();
            entries.insert(0, metadata);
            if entries.len() > max_per_user {
                entries.split_off(max_per_user).into_iter().map(|m| m.replay_id).collect()
            } else {
                Vec::new()
            }
        };

        if !evicted.is_empty() {
            let mut blobs = self.blobs.write().await;
            for evicted_id in evicted {
                blobs.remove(&evicted_id);
            }
        }

        Ok(id)
    }

    async fn load(&self, replay_id: &str) -> Result<ReplayData, ReplayStoreError> {
        self.blobs
            .read()
            .await
            .get(replay_id)
            .cloned()
            .ok_or_else(|| ReplayStoreError::NotFound(replay_id.to_string()))
    }

    async fn delete(&self, user_id: &str, replay_id: &str) -> Result<(), ReplayStoreError> {
        let removed = {
            let mut index = self.user_index.write().await;
            match index.get_mut(user_id) {
                Some(entries) => {
                    let before = entries.len();
                    entries.retain(|m| m.replay_id != replay_id);
                    before != entries.len()
                }
                None => false,
            }
        };
        if !removed {
            return Err(ReplayStoreError::NotFound(replay_id.to_string()));
        }
        self.blobs.write().await.remove(replay_id);
        Ok(())
    }

    async fn list_for_user(&self, user_id: &str) -> Vec<ReplayMetadata> {
        self.user_index
            .read()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_initial_state() -> ReplayInitialState {
        ReplayInitialState {
            grid_size: 40,
            players: vec![ReplaySpawnPlayer {
                id: "p1".into(),
                name: "p1".into(),
                color: "hsl(0, 70%, 55%)".into(),
                x: 5,
                y: 5,
                is_ai: false,
            }],
            obstacles: vec![],
            settings: GameSettings {
                tick_rate_ms: 200,
                speed_boost_duration_ms: 2000,
                max_power_ups: 5,
            },
        }
    }

    #[test]
    fn finish_requires_initial_state_and_events() {
        let recorder = Recorder::new(0, 40, None);
        assert!(recorder.finish("u1".into(), None, 1, 1000).is_err());
    }

    #[test]
    fn finish_succeeds_once_started_and_recorded() {
        let mut recorder = Recorder::new(0, 40, Some("Arena".into()));
        recorder.capture_initial_state(sample_initial_state(), 0);
        recorder.bump_tick();
        recorder.record_event("gameOver", Value::Null, 5000);
        let data = recorder.finish("u1".into(), Some("p1".into()), 1, 5000).unwrap();
        assert_eq!(data.metadata.duration_secs, 5);
        assert_eq!(data.metadata.winner.as_deref(), Some("p1"));
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let store = InMemoryReplayStore::new();
        let mut recorder = Recorder::new(0, 40, None);
        recorder.capture_initial_state(sample_initial_state(), 0);
        recorder.record_event("gameOver", Value::Null, 1000);
        let data = recorder.finish("u1".into(), None, 1, 1000).unwrap();

        let id = store.save(data, 50).await.unwrap();
        let loaded = store.load(&id).await.unwrap();
        assert_eq!(loaded.metadata.replay_id, id);

        let listed = store.list_for_user("u1").await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].replay_id, id);
    }

    #[tokio::test]
    async fn eviction_drops_oldest_blob_past_the_cap() {
        let store = InMemoryReplayStore::new();
        let mut first_id = String::new();
        for i in 0..3 {
            let mut recorder = Recorder::new(0, 40, None);
            recorder.capture_initial_state(sample_initial_state(), 0);
            recorder.record_event("gameOver", Value::Null, 1000);
            let data = recorder.finish("u1".into(), None, 1, 1000).unwrap();
            let id = store.save(data, 2).await.unwrap();
            if i == 0 {
                first_id = id;
            }
        }
        assert!(store.load(&first_id).await.is_err());
        assert_eq!(store.list_for_user("u1").await.len(), 2);
    }

    #[tokio::test]
    async fn delete_removes_blob_and_index_entry() {
        let store = InMemoryReplayStore::new();
        let mut recorder = Recorder::new(0, 40, None);
        recorder.capture_initial_state(sample_initial_state(), 0);
        recorder.record_event("gameOver", Value::Null, 1000);
        let data = recorder.finish("u1".into(), None, 1, 1000).unwrap();
        let id = store.save(data, 50).await.unwrap();

        store.delete("u1", &id).await.unwrap();
        assert!(store.load(&id).await.is_err());
        assert!(store.list_for_user("u1").await.is_empty());
    }
}
