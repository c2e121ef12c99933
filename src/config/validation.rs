//! Configuration validation functions.

use super::Config;

/// Validate the resolved configuration, bailing with a descriptive error on anything
/// that would make the server misbehave once running.
pub fn validate_config_security(config: &Config) -> anyhow::Result<()> {
    if config.server.tick_rate_ms == 0 {
        anyhow::bail!("server.tick_rate_ms must be greater than zero");
    }
    if config.server.allowed_grid_sizes.is_empty() {
        anyhow::bail!("server.allowed_grid_sizes must not be empty");
    }
    if !config
        .server
        .allowed_grid_sizes
        .contains(&config.server.default_grid_size)
    {
        anyhow::bail!("server.default_grid_size must be one of server.allowed_grid_sizes");
    }
    if config.server.allowed_max_players.is_empty() {
        anyhow::bail!("server.allowed_max_players must not be empty");
    }
    if !config
        .server
        .allowed_max_players
        .contains(&config.server.default_max_players)
    {
        anyhow::bail!("server.default_max_players must be one of server.allowed_max_players");
    }
    if config.server.replays_per_user == 0 {
        anyhow::bail!("server.replays_per_user must be at least 1");
    }

    config.websocket.validate()?;

    Ok(())
}

/// Detect if we're running in production mode.
pub fn is_production_mode() -> bool {
    use std::env;

    if let Ok(mode) = env::var("ARENA__ENVIRONMENT") {
        return mode.eq_ignore_ascii_case("production") || mode.eq_ignore_ascii_case("prod");
    }

    env::var("ARENA_PRODUCTION").is_ok() || env::var("PRODUCTION").is_ok() || env::var("PROD").is_ok()
}
