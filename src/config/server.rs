//! Server/simulation behavior configuration types.

use super::defaults::{
    default_allowed_grid_sizes, default_allowed_max_players, default_color_hue_threshold_deg,
    default_countdown_ms, default_grid_margin, default_grid_size, default_max_lobbies,
    default_max_player_name_len, default_max_players, default_max_power_ups,
    default_min_obstacle_spacing, default_obstacle_density, default_obstacle_spawn_attempts,
    default_power_up_spawn_attempts, default_power_up_spawn_probability,
    default_reconnect_window_ms, default_replay_id_length, default_replays_per_user,
    default_safe_spawn_attempts, default_session_sweep_interval_ms,
    default_session_sweep_threshold_ms, default_speed_boost_duration_ms, default_tick_rate_ms,
};
use serde::{Deserialize, Serialize};

/// Server configuration for lobby, simulation and session tuning.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// Fixed simulation tick period, in milliseconds.
    #[serde(default = "default_tick_rate_ms")]
    pub tick_rate_ms: u64,
    /// Lobby `starting` countdown duration, in milliseconds.
    #[serde(default = "default_countdown_ms")]
    pub countdown_ms: u64,
    /// Duration a single speed power-up extends the boost window, in milliseconds.
    #[serde(default = "default_speed_boost_duration_ms")]
    pub speed_boost_duration_ms: i64,
    /// Maximum simultaneous power-ups on the grid.
    #[serde(default = "default_max_power_ups")]
    pub max_power_ups: usize,
    /// Per-tick probability of attempting a power-up spawn.
    #[serde(default = "default_power_up_spawn_probability")]
    pub power_up_spawn_probability: f64,
    /// Attempts allowed when searching for a free cell to spawn a power-up.
    #[serde(default = "default_power_up_spawn_attempts")]
    pub power_up_spawn_attempts: u32,
    /// Margin, in cells, kept clear along each edge when placing obstacles/power-ups/spawns.
    #[serde(default = "default_grid_margin")]
    pub grid_margin: i32,
    /// Target obstacle density per grid quadrant.
    #[serde(default = "default_obstacle_density")]
    pub obstacle_density: f64,
    /// Minimum Euclidean spacing enforced between generated obstacles.
    #[serde(default = "default_min_obstacle_spacing")]
    pub min_obstacle_spacing: f64,
    /// Attempts allowed per quadrant when generating obstacles.
    #[serde(default = "default_obstacle_spawn_attempts")]
    pub obstacle_spawn_attempts: u32,
    /// Attempts allowed when searching for a safe spawn cell.
    #[serde(default = "default_safe_spawn_attempts")]
    pub safe_spawn_attempts: u32,
    /// Hue difference (degrees) below which two player colors are considered colliding.
    #[serde(default = "default_color_hue_threshold_deg")]
    pub color_hue_threshold_deg: f64,
    /// Maximum accepted player name length; longer names are truncated.
    #[serde(default = "default_max_player_name_len")]
    pub max_player_name_len: usize,
    /// Grid sizes a lobby may select.
    #[serde(default = "default_allowed_grid_sizes")]
    pub allowed_grid_sizes: Vec<u32>,
    /// Grid size used when a lobby does not specify one.
    #[serde(default = "default_grid_size")]
    pub default_grid_size: u32,
    /// Player counts a lobby may select.
    #[serde(default = "default_allowed_max_players")]
    pub allowed_max_players: Vec<u8>,
    /// Max players used when a lobby does not specify one.
    #[serde(default = "default_max_players")]
    pub default_max_players: u8,
    /// Reconnect window, in milliseconds, during which a disconnected session can be reclaimed.
    #[serde(default = "default_reconnect_window_ms")]
    pub reconnect_window_ms: i64,
    /// Age, in milliseconds, after which an archived session is swept regardless of reconnects.
    #[serde(default = "default_session_sweep_threshold_ms")]
    pub session_sweep_threshold_ms: i64,
    /// Interval, in milliseconds, between session-sweep passes.
    #[serde(default = "default_session_sweep_interval_ms")]
    pub session_sweep_interval_ms: u64,
    /// Maximum number of simultaneously live lobbies.
    #[serde(default = "default_max_lobbies")]
    pub max_lobbies: usize,
    /// Replays retained per user before the oldest is evicted.
    #[serde(default = "default_replays_per_user")]
    pub replays_per_user: usize,
    /// Length, in characters, of a generated replay id.
    #[serde(default = "default_replay_id_length")]
    pub replay_id_length: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick_rate_ms: default_tick_rate_ms(),
            countdown_ms: default_countdown_ms(),
            speed_boost_duration_ms: default_speed_boost_duration_ms(),
            max_power_ups: default_max_power_ups(),
            power_up_spawn_probability: default_power_up_spawn_probability(),
            power_up_spawn_attempts: default_power_up_spawn_attempts(),
            grid_margin: default_grid_margin(),
            obstacle_density: default_obstacle_density(),
            min_obstacle_spacing: default_min_obstacle_spacing(),
            obstacle_spawn_attempts: default_obstacle_spawn_attempts(),
            safe_spawn_attempts: default_safe_spawn_attempts(),
            color_hue_threshold_deg: default_color_hue_threshold_deg(),
            max_player_name_len: default_max_player_name_len(),
            allowed_grid_sizes: default_allowed_grid_sizes(),
            default_grid_size: default_grid_size(),
            allowed_max_players: default_allowed_max_players(),
            default_max_players: default_max_players(),
            reconnect_window_ms: default_reconnect_window_ms(),
            session_sweep_threshold_ms: default_session_sweep_threshold_ms(),
            session_sweep_interval_ms: default_session_sweep_interval_ms(),
            max_lobbies: default_max_lobbies(),
            replays_per_user: default_replays_per_user(),
            replay_id_length: default_replay_id_length(),
        }
    }
}
