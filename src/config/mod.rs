//! Configuration module for the arena server.
//!
//! This module provides configuration management with support for:
//! - JSON configuration files
//! - Environment variable overrides
//! - Stdin input
//! - Sensible defaults
//!
//! # Module Structure
//!
//! - [`crate::config::types`]: Root `Config` struct
//! - [`server`]: Simulation/lobby tuning (tick rate, countdown, grid, reconnection, replays)
//! - [`logging`]: Logging configuration
//! - [`websocket`]: WebSocket connection settings
//! - [`crate::config::loader`]: Configuration loading functions
//! - [`crate::config::validation`]: Configuration validation functions
//! - [`crate::config::defaults`]: Default value functions

// Submodules
pub mod defaults;
pub mod loader;
pub mod logging;
pub mod server;
pub mod types;
pub mod validation;
pub mod websocket;

// Re-exports for convenience
pub use loader::load;

pub use logging::{LogFormat, LogLevel, LoggingConfig};

pub use server::ServerConfig;

pub use types::Config;

pub use validation::{is_production_mode, validate_config_security};

pub use websocket::WebSocketConfig;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();

        assert_eq!(config.port, 3536);
        assert_eq!(config.server.tick_rate_ms, 200);
        assert_eq!(config.server.countdown_ms, 5000);
        assert_eq!(config.server.max_power_ups, 5);
        assert_eq!(config.server.speed_boost_duration_ms, 2000);
        assert_eq!(config.server.reconnect_window_ms, 60_000);
        assert_eq!(config.server.session_sweep_threshold_ms, 120_000);
        assert_eq!(config.server.replays_per_user, 50);
        assert_eq!(config.server.allowed_grid_sizes, vec![30, 40, 50, 60]);
        assert_eq!(config.server.allowed_max_players, vec![2, 4, 6, 8]);

        assert_eq!(config.logging.dir, "logs");
        assert_eq!(config.logging.filename, "server.log");
        assert_eq!(config.logging.rotation, "daily");
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let deserialized: Config = serde_json::from_str(&json).unwrap();

        assert_eq!(config.port, deserialized.port);
        assert_eq!(
            config.server.tick_rate_ms,
            deserialized.server.tick_rate_ms
        );
        assert_eq!(
            config.server.max_power_ups,
            deserialized.server.max_power_ups
        );
    }

    #[test]
    fn test_log_level_display() {
        assert_eq!(LogLevel::Trace.to_string(), "trace");
        assert_eq!(LogLevel::Debug.to_string(), "debug");
        assert_eq!(LogLevel::Info.to_string(), "info");
        assert_eq!(LogLevel::Warn.to_string(), "warn");
        assert_eq!(LogLevel::Error.to_string(), "error");
    }

    #[test]
    fn test_validate_config_security_rejects_bad_grid_default() {
        let mut config = Config::default();
        config.server.default_grid_size = 999;
        assert!(validate_config_security(&config).is_err());
    }
}
