//! Default value functions for configuration fields.
//!
//! Organized by category so `#[serde(default = ...)]` attributes stay next to the
//! value they produce.

use super::logging::LogFormat;

// =============================================================================
// Port & Root Config
// =============================================================================

pub const fn default_port() -> u16 {
    3536
}

// =============================================================================
// Simulation defaults
// =============================================================================

pub const fn default_tick_rate_ms() -> u64 {
    200
}

pub const fn default_countdown_ms() -> u64 {
    5000
}

pub const fn default_speed_boost_duration_ms() -> i64 {
    2000
}

pub const fn default_max_power_ups() -> usize {
    5
}

pub const fn default_power_up_spawn_probability() -> f64 {
    0.10
}

pub const fn default_power_up_spawn_attempts() -> u32 {
    50
}

pub const fn default_grid_margin() -> i32 {
    5
}

pub const fn default_obstacle_density() -> f64 {
    0.08
}

pub const fn default_min_obstacle_spacing() -> f64 {
    5.0
}

pub const fn default_obstacle_spawn_attempts() -> u32 {
    100
}

pub const fn default_safe_spawn_attempts() -> u32 {
    50
}

pub const fn default_color_hue_threshold_deg() -> f64 {
    30.0
}

pub const fn default_max_player_name_len() -> usize {
    20
}

pub fn default_allowed_grid_sizes() -> Vec<u32> {
    vec![30, 40, 50, 60]
}

pub const fn default_grid_size() -> u32 {
    40
}

pub fn default_allowed_max_players() -> Vec<u8> {
    vec![2, 4, 6, 8]
}

pub const fn default_max_players() -> u8 {
    8
}

// =============================================================================
// Session / reconnection defaults
// =============================================================================

pub const fn default_reconnect_window_ms() -> i64 {
    60_000
}

pub const fn default_session_sweep_threshold_ms() -> i64 {
    120_000
}

pub const fn default_session_sweep_interval_ms() -> u64 {
    15_000
}

pub const fn default_max_lobbies() -> usize {
    1000
}

// =============================================================================
// Replay defaults
// =============================================================================

pub const fn default_replays_per_user() -> usize {
    50
}

pub const fn default_replay_id_length() -> usize {
    12
}

// =============================================================================
// Logging defaults
// =============================================================================

pub fn default_log_dir() -> String {
    "logs".to_string()
}

pub fn default_log_filename() -> String {
    "server.log".to_string()
}

pub fn default_rotation() -> String {
    "daily".to_string()
}

pub const fn default_enable_file_logging() -> bool {
    false
}

pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

// =============================================================================
// WebSocket defaults
// =============================================================================

pub fn default_websocket_host() -> String {
    "0.0.0.0".to_string()
}

pub const fn default_max_message_size() -> usize {
    64 * 1024
}

pub const fn default_outgoing_queue_capacity() -> usize {
    64
}
