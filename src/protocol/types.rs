//! Core domain types shared by the lobby/game state machines and the wire protocol.

use serde::{Deserialize, Serialize};

/// Stable identifier for a connected peer / in-lobby player.
///
/// The `"ai-"` prefix is the sole, authoritative signal that an id names a bot — it is
/// load-bearing for replays and AI-targeted commands, not just cosmetic.
pub type PlayerId = String;
pub type LobbyId = String;
pub type SpectatorId = String;
pub type ReconnectToken = String;

/// Returns true if `id` names a bot player.
pub fn is_ai_id(id: &str) -> bool {
    id.starts_with("ai-")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    Crashed,
}

impl Direction {
    pub const CARDINALS: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// The exact reverse of a cardinal direction. `Crashed` has no opposite.
    pub fn opposite(self) -> Option<Direction> {
        match self {
            Direction::Up => Some(Direction::Down),
            Direction::Down => Some(Direction::Up),
            Direction::Left => Some(Direction::Right),
            Direction::Right => Some(Direction::Left),
            Direction::Crashed => None,
        }
    }

    /// Unit delta for one step in this direction. `Crashed` does not move.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
            Direction::Crashed => (0, 0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PowerUpType {
    Speed,
    Shield,
    TrailEraser,
}

impl PowerUpType {
    pub const ALL: [PowerUpType; 3] = [
        PowerUpType::Speed,
        PowerUpType::Shield,
        PowerUpType::TrailEraser,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn key(&self) -> String {
        format!("{},{}", self.x, self.y)
    }

    pub fn manhattan(&self, other: &Cell) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    pub fn euclidean(&self, other: &Cell) -> f64 {
        let dx = f64::from(self.x - other.x);
        let dy = f64::from(self.y - other.y);
        (dx * dx + dy * dy).sqrt()
    }

    pub fn stepped(&self, dir: Direction) -> Cell {
        let (dx, dy) = dir.delta();
        Cell::new(self.x + dx, self.y + dy)
    }

    pub fn in_bounds(&self, grid_size: u32) -> bool {
        self.x >= 0 && self.y >= 0 && self.x < grid_size as i32 && self.y < grid_size as i32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerUp {
    pub x: i32,
    pub y: i32,
    #[serde(rename = "type")]
    pub kind: PowerUpType,
}

impl PowerUp {
    pub fn cell(&self) -> Cell {
        Cell::new(self.x, self.y)
    }
}

/// A lobby/in-game player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub color: String,
    pub avatar: Option<String>,
    pub x: i32,
    pub y: i32,
    pub direction: Direction,
    pub last_direction: Direction,
    pub trail: Vec<String>,
    pub is_ready: bool,
    pub speed: u8,
    pub speed_boost_until: Option<i64>,
    pub is_braking: bool,
    pub brake_start_time: Option<i64>,
    pub has_shield: bool,
    pub has_trail_eraser: bool,
    pub game_id: Option<String>,
}

impl Player {
    pub fn is_ai(&self) -> bool {
        is_ai_id(&self.id)
    }

    pub fn head(&self) -> Cell {
        Cell::new(self.x, self.y)
    }

    /// Every cell currently occupied by this player: head plus trail.
    pub fn occupied_cells(&self) -> Vec<String> {
        let mut cells = self.trail.clone();
        cells.push(self.head().key());
        cells
    }

    pub fn is_crashed(&self) -> bool {
        self.direction == Direction::Crashed
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spectator {
    pub id: SpectatorId,
    pub name: String,
    pub color: String,
    pub joined_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbySettings {
    pub is_private: bool,
    pub grid_size: u32,
    pub max_players: u8,
    pub allow_spectators: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LobbySettingsPatch {
    pub is_private: Option<bool>,
    pub grid_size: Option<u32>,
    pub max_players: Option<u8>,
    pub allow_spectators: Option<bool>,
    pub lobby_name: Option<String>,
}

/// Compact per-lobby game tuning, threaded into the `GameContext`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GameSettings {
    pub tick_rate_ms: u64,
    pub speed_boost_duration_ms: i64,
    pub max_power_ups: usize,
}
