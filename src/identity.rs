//! Player identity helpers: name normalization and color-hue collision avoidance.
//!
//! Grounded on the teacher's validation-function style (`protocol/validation.rs`):
//! small, pure, top-level functions rather than a heavyweight validator type.

use crate::protocol::types::Player;

/// Truncate a player-supplied name to the configured maximum length.
pub fn truncate_name(name: &str, max_len: usize) -> String {
    if name.chars().count() <= max_len {
        return name.to_string();
    }
    name.chars().take(max_len).collect()
}

/// Parse the hue component out of an `hsl(H, S%, L%)` string. Returns `None` if the
/// string isn't in that shape.
pub fn parse_hue(color: &str) -> Option<f64> {
    let inner = color.strip_prefix("hsl(")?.strip_suffix(')')?;
    let hue_part = inner.split(',').next()?;
    hue_part.trim().parse::<f64>().ok()
}

/// Smallest angular distance between two hues on the 360-degree color wheel.
pub fn hue_distance(a: f64, b: f64) -> f64 {
    let diff = (a - b).rem_euclid(360.0);
    diff.min(360.0 - diff)
}

/// True if `color` collides (hue distance below `threshold_deg`) with any existing
/// player's color.
pub fn collides(color: &str, players: &[Player], threshold_deg: f64) -> bool {
    let Some(hue) = parse_hue(color) else {
        return false;
    };
    players.iter().any(|p| {
        p.color != color
            && parse_hue(&p.color)
                .map(|other| hue_distance(hue, other) < threshold_deg)
                .unwrap_or(false)
    })
}

/// Produce an HSL color string whose hue does not collide with any existing player,
/// by repeatedly sampling a random hue. Falls back to the last sampled hue if the
/// player set is so dense no hue is free (practically unreachable given 360 degrees
/// and small lobby sizes).
pub fn non_colliding_color(players: &[Player], threshold_deg: f64) -> String {
    const ATTEMPTS: u32 = 64;
    let mut last = format!("hsl({}, 70%, 55%)", fastrand::u32(0..360));
    for _ in 0..ATTEMPTS {
        let hue = fastrand::u32(0..360);
        let candidate = format!("hsl({hue}, 70%, 55%)");
        if !collides(&candidate, players, threshold_deg) {
            return candidate;
        }
        last = candidate;
    }
    last
}
