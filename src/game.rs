//! The game state machine and 200 ms tick simulator: movement, collisions,
//! power-ups, speed boosts, braking, shields, trail erasers, and win detection.
//!
//! `GamePhase` tracks the coarse machine (`idle`/`playing`/`paused`/`gameOver`);
//! [`GameContext`] owns the simulation state and [`resolve_tick`] is the single
//! pure function that advances it by one tick. Everything here is deterministic
//! given its inputs — the caller (the per-lobby actor) owns the clock, the RNG
//! seed boundary, and broadcasting.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::ai;
use crate::grid;
use crate::protocol::types::{Direction, GameSettings, Player, PowerUp, PowerUpType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GamePhase {
    Idle,
    Playing,
    Paused,
    GameOver,
}

/// One event a tick can produce, in emission order. The caller turns these into
/// broadcasts and replay-recorder entries; `resolve_tick` itself does no I/O.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    PlayerCrashed { player_id: String },
    ShieldAbsorbed { player_id: String },
    TrailEraserUsed { player_id: String },
    PowerUpCollected { player_id: String, kind: PowerUpType },
    GameOver { winner: Option<String>, draw: bool },
}

#[derive(Debug, Clone)]
pub struct GameContext {
    pub game_id: String,
    pub players: Vec<Player>,
    pub power_ups: Vec<PowerUp>,
    pub obstacles: HashSet<String>,
    pub grid_size: u32,
    pub settings: GameSettings,
    pub ticks: u64,
    pub phase: GamePhase,
    pub winner: Option<String>,
}

impl GameContext {
    pub fn new(
        game_id: String,
        players: Vec<Player>,
        obstacles: HashSet<String>,
        grid_size: u32,
        settings: GameSettings,
    ) -> Self {
        Self {
            game_id,
            players,
            power_ups: Vec::new(),
            obstacles,
            grid_size,
            settings,
            ticks: 0,
            phase: GamePhase::Playing,
            winner: None,
        }
    }

    pub fn active_player_count(&self) -> usize {
        self.players.iter().filter(|p| !p.is_crashed()).count()
    }

    /// `shouldEnd`: zero active players, or exactly one survivor out of more than one.
    pub fn should_end(&self) -> bool {
        let active = self.active_player_count();
        active == 0 || (active == 1 && self.players.len() > 1)
    }

    fn find_player_mut(&mut self, id: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    /// All occupied cells in the game, keyed by cell string, used for trail/collision
    /// lookups and for the AI driver's view of the board. A crashed player's pushed
    /// trail cells remain live collision surface for everyone else.
    fn all_trail_cells(&self) -> HashSet<String> {
        self.players.iter().flat_map(|p| p.occupied_cells()).collect()
    }

    /// A direct player-move request. Rejects the 180-degree reversal once a trail
    /// exists. A same-direction press while holding a trail eraser consumes the
    /// charge and clears a prefix of the trail instead of moving.
    pub fn apply_player_move(&mut self, player_id: &str, dir: Direction, events: &mut Vec<GameEvent>) {
        let Some(player) = self.find_player_mut(player_id) else {
            return;
        };
        if player.is_crashed() {
            return;
        }

        let reversal = !player.trail.is_empty() && player.direction.opposite() == Some(dir);
        if reversal {
            return;
        }

        if player.direction == dir && player.last_direction == dir && player.has_trail_eraser {
            player.has_trail_eraser = false;
            let keep_from = player.trail.len() / 2;
            player.trail.drain(0..keep_from);
            events.push(GameEvent::TrailEraserUsed {
                player_id: player_id.to_string(),
            });
            return;
        }

        player.last_direction = player.direction;
        player.direction = dir;
    }

    pub fn apply_player_brake(&mut self, player_id: &str, braking: bool, now: i64) {
        if let Some(player) = self.find_player_mut(player_id) {
            player.is_braking = braking;
            player.brake_start_time = if braking { Some(now) } else { None };
        }
    }
}

/// Advance `ctx` by exactly one tick. Returns the events produced, in order.
///
/// Mirrors the eight-step resolution: AI moves, power-up spawn attempt, per-player
/// movement/collision/power-up resolution in iteration order, then the end check.
/// Broadcasting the resulting `gameState`/`gameOver` frames is the caller's job.
pub fn resolve_tick(ctx: &mut GameContext, now: i64) -> Vec<GameEvent> {
    let mut events = Vec::new();
    ctx.ticks = ctx.ticks.wrapping_add(1);

    drive_bots(ctx);
    maybe_spawn_power_up(ctx);

    let player_ids: Vec<String> = ctx.players.iter().map(|p| p.id.clone()).collect();
    for player_id in player_ids {
        resolve_player_movement(ctx, &player_id, now, &mut events);
    }

    if ctx.should_end() {
        let winner = if ctx.active_player_count() == 1 {
            ctx.players.iter().find(|p| !p.is_crashed()).map(|p| p.id.clone())
        } else {
            None
        };
        ctx.winner.clone_from(&winner);
        ctx.phase = GamePhase::GameOver;
        events.push(GameEvent::GameOver {
            winner,
            draw: ctx.active_player_count() == 0,
        });
    }

    events
}

fn drive_bots(ctx: &mut GameContext) {
    let trail_cells = ctx.all_trail_cells();
    let bot_ids: Vec<String> = ctx
        .players
        .iter()
        .filter(|p| p.is_ai() && !p.is_crashed())
        .map(|p| p.id.clone())
        .collect();

    for bot_id in bot_ids {
        let Some(bot) = ctx.players.iter().find(|p| p.id == bot_id) else {
            continue;
        };
        let new_dir = ai::choose_direction(bot, &trail_cells, &ctx.obstacles, &ctx.power_ups, ctx.grid_size);
        if new_dir != bot.direction {
            if let Some(bot_mut) = ctx.find_player_mut(&bot_id) {
                bot_mut.last_direction = bot_mut.direction;
                bot_mut.direction = new_dir;
            }
        }
    }
}

fn maybe_spawn_power_up(ctx: &mut GameContext) {
    if ctx.power_ups.len() >= ctx.settings.max_power_ups {
        return;
    }
    if fastrand::f64() >= 0.10 {
        return;
    }

    let mut occupied: HashSet<String> = ctx.all_trail_cells();
    occupied.extend(ctx.obstacles.iter().cloned());
    occupied.extend(ctx.power_ups.iter().map(|p| p.cell().key()));

    if let Some(cell) = grid::spawn_power_up_cell(ctx.grid_size, 5, &occupied, 50) {
        let kind = PowerUpType::ALL[fastrand::usize(0..PowerUpType::ALL.len())];
        ctx.power_ups.push(PowerUp { x: cell.x, y: cell.y, kind });
    }
}

fn moves_this_tick(player: &Player, now: i64, ticks: u64) -> u32 {
    if player.speed_boost_until.map(|deadline| deadline > now).unwrap_or(false) {
        return 2;
    }
    if player.is_braking {
        return u32::from(ticks % 5 == 0);
    }
    1
}

fn resolve_player_movement(ctx: &mut GameContext, player_id: &str, now: i64, events: &mut Vec<GameEvent>) {
    let Some(player) = ctx.players.iter().find(|p| p.id == player_id) else {
        return;
    };
    if player.is_crashed() {
        return;
    }

    if player.speed_boost_until.map(|d| d <= now).unwrap_or(false) {
        if let Some(p) = ctx.find_player_mut(player_id) {
            p.speed_boost_until = None;
            p.speed = 1;
        }
    }

    let player = ctx.players.iter().find(|p| p.id == player_id).unwrap();
    let steps = moves_this_tick(player, now, ctx.ticks);
    let direction = player.direction;

    for _ in 0..steps {
        let Some(player) = ctx.players.iter().find(|p| p.id == player_id) else {
            return;
        };
        if player.is_crashed() {
            return;
        }

        let head = player.head();
        let next = head.stepped(direction);
        let own_trail_prefix: HashSet<String> = if player.trail.is_empty() {
            HashSet::new()
        } else {
            player.trail[..player.trail.len() - 1].iter().cloned().collect()
        };

        let hits_own_trail = own_trail_prefix.contains(&next.key());
        let hits_other_trail = ctx
            .players
            .iter()
            .filter(|p| p.id != player_id)
            .any(|p| p.occupied_cells().contains(&next.key()));
        let hits_wall = !next.in_bounds(ctx.grid_size);
        let hits_obstacle = ctx.obstacles.contains(&next.key());
        let collided = hits_wall || hits_obstacle || hits_own_trail || hits_other_trail;
        let power_up_idx = ctx.power_ups.iter().position(|p| p.cell() == next);

        let Some(player) = ctx.find_player_mut(player_id) else {
            return;
        };
        player.trail.push(head.key());

        if collided {
            if player.has_shield {
                player.has_shield = false;
                events.push(GameEvent::ShieldAbsorbed {
                    player_id: player_id.to_string(),
                });
                player.x = next.x;
                player.y = next.y;
                continue;
            }
            player.direction = Direction::Crashed;
            events.push(GameEvent::PlayerCrashed {
                player_id: player_id.to_string(),
            });
            return;
        }

        player.x = next.x;
        player.y = next.y;

        if let Some(idx) = power_up_idx {
            let kind = ctx.power_ups[idx].kind;
            ctx.power_ups.remove(idx);
            apply_power_up(ctx, player_id, kind, now);
            events.push(GameEvent::PowerUpCollected {
                player_id: player_id.to_string(),
                kind,
            });
        }
    }
}

fn apply_power_up(ctx: &mut GameContext, player_id: &str, kind: PowerUpType, now: i64) {
    let boost_ms = ctx.settings.speed_boost_duration_ms;
    let Some(player) = ctx.find_player_mut(player_id) else {
        return;
    };
    match kind {
        PowerUpType::Speed => {
            if let Some(deadline) = player.speed_boost_until {
                player.speed_boost_until = Some(deadline + boost_ms);
            } else {
                player.speed = 2;
                player.speed_boost_until = Some(now + boost_ms);
            }
        }
        PowerUpType::Shield => player.has_shield = true,
        PowerUpType::TrailEraser => player.has_trail_eraser = true,
    }
}

/// Reset every player for the next round: safe-spawned position, cleared trail,
/// speed/brake state, and any crashed direction lifted.
pub fn reset_players_for_next_round(
    players: &mut [Player],
    grid_size: u32,
    obstacles: &HashSet<String>,
    margin: i32,
    safe_spawn_attempts: u32,
) {
    let mut occupied: HashSet<String> = HashSet::new();
    for player in players.iter_mut() {
        let (cell, dir) = grid::safe_spawn(grid_size, margin, obstacles, &occupied, safe_spawn_attempts);
        occupied.insert(cell.key());
        player.x = cell.x;
        player.y = cell.y;
        player.direction = dir;
        player.last_direction = dir;
        player.trail.clear();
        player.speed = 1;
        player.speed_boost_until = None;
        player.is_braking = false;
        player.brake_start_time = None;
        player.has_shield = false;
        player.has_trail_eraser = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_player(id: &str, x: i32, y: i32, dir: Direction) -> Player {
        Player {
            id: id.to_string(),
            name: id.to_string(),
            color: "hsl(0, 70%, 55%)".to_string(),
            avatar: None,
            x,
            y,
            direction: dir,
            last_direction: dir,
            trail: vec![],
            is_ready: true,
            speed: 1,
            speed_boost_until: None,
            is_braking: false,
            brake_start_time: None,
            has_shield: false,
            has_trail_eraser: false,
            game_id: None,
        }
    }

    fn settings() -> GameSettings {
        GameSettings {
            tick_rate_ms: 200,
            speed_boost_duration_ms: 2000,
            max_power_ups: 5,
        }
    }

    #[test]
    fn lone_survivor_wins() {
        let mut ctx = GameContext::new(
            "g1".into(),
            vec![make_player("p1", 20, 20, Direction::Right), make_player("p2", 0, 0, Direction::Crashed)],
            HashSet::new(),
            40,
            settings(),
        );
        assert!(ctx.should_end());
        let events = resolve_tick(&mut ctx, 0);
        assert_eq!(ctx.winner.as_deref(), Some("p1"));
        assert!(events.iter().any(|e| matches!(e, GameEvent::GameOver { draw: false, .. })));
    }

    #[test]
    fn mutual_crash_is_a_draw() {
        let mut ctx = GameContext::new(
            "g1".into(),
            vec![make_player("p1", 0, 0, Direction::Crashed), make_player("p2", 1, 1, Direction::Crashed)],
            HashSet::new(),
            40,
            settings(),
        );
        let events = resolve_tick(&mut ctx, 0);
        assert_eq!(ctx.winner, None);
        assert!(events.iter().any(|e| matches!(e, GameEvent::GameOver { draw: true, .. })));
    }

    #[test]
    fn wall_collision_crashes_without_shield() {
        let mut ctx = GameContext::new(
            "g1".into(),
            vec![make_player("p1", 39, 20, Direction::Right), make_player("p2", 0, 0, Direction::Right)],
            HashSet::new(),
            40,
            settings(),
        );
        resolve_tick(&mut ctx, 0);
        let p1 = ctx.players.iter().find(|p| p.id == "p1").unwrap();
        assert_eq!(p1.direction, Direction::Crashed);
    }

    #[test]
    fn shield_absorbs_one_collision_then_is_consumed() {
        let mut ctx = GameContext::new(
            "g1".into(),
            vec![make_player("p1", 39, 20, Direction::Right), make_player("p2", 0, 0, Direction::Right)],
            HashSet::new(),
            40,
            settings(),
        );
        ctx.find_player_mut("p1").unwrap().has_shield = true;
        let events = resolve_tick(&mut ctx, 0);
        let p1 = ctx.players.iter().find(|p| p.id == "p1").unwrap();
        assert!(!p1.has_shield);
        assert_ne!(p1.direction, Direction::Crashed);
        assert!(events.iter().any(|e| matches!(e, GameEvent::ShieldAbsorbed { .. })));
    }

    #[test]
    fn reversal_is_rejected_once_a_trail_exists() {
        let mut ctx = GameContext::new(
            "g1".into(),
            vec![make_player("p1", 20, 20, Direction::Right)],
            HashSet::new(),
            40,
            settings(),
        );
        ctx.find_player_mut("p1").unwrap().trail.push("19,20".to_string());
        let mut events = Vec::new();
        ctx.apply_player_move("p1", Direction::Left, &mut events);
        assert_eq!(ctx.players[0].direction, Direction::Right);
    }

    #[test]
    fn a_player_arriving_at_a_just_crashed_players_pushed_trail_cell_also_crashes() {
        // P1 at (4,5) moving right steps onto P2's head at (5,5) and crashes,
        // pushing (4,5) into its own trail. P2, moving left in the same tick,
        // then steps onto that same (4,5) cell. Iteration order processes P1
        // first, so its crash must still be live collision surface for P2.
        let mut ctx = GameContext::new(
            "g1".into(),
            vec![make_player("p1", 4, 5, Direction::Right), make_player("p2", 5, 5, Direction::Left)],
            HashSet::new(),
            40,
            settings(),
        );
        let events = resolve_tick(&mut ctx, 0);
        assert_eq!(ctx.winner, None);
        assert!(events.iter().any(|e| matches!(e, GameEvent::GameOver { draw: true, winner: None })));
        let p1 = ctx.players.iter().find(|p| p.id == "p1").unwrap();
        let p2 = ctx.players.iter().find(|p| p.id == "p2").unwrap();
        assert_eq!(p1.direction, Direction::Crashed);
        assert_eq!(p2.direction, Direction::Crashed);
    }

    #[test]
    fn speed_boost_grants_two_steps_per_tick() {
        let mut ctx = GameContext::new(
            "g1".into(),
            vec![make_player("p1", 20, 20, Direction::Right)],
            HashSet::new(),
            40,
            settings(),
        );
        ctx.find_player_mut("p1").unwrap().speed_boost_until = Some(1_000_000);
        resolve_tick(&mut ctx, 0);
        let p1 = &ctx.players[0];
        assert_eq!(p1.x, 22);
        assert_eq!(p1.trail.len(), 2);
    }
}
