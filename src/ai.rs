//! AI driver: per-tick direction selection for bot players.
//!
//! A pure function of its inputs. The "first power-up in the list" tie-break is
//! preserved deliberately so that replays of bot behaviour are reproducible.

use std::collections::HashSet;

use crate::protocol::types::{Cell, Direction, Player, PowerUp};

/// Decide the next direction for `bot`, given the full set of other players'
/// occupied cells, the obstacle set, the power-ups on the grid, and the grid size.
pub fn choose_direction(
    bot: &Player,
    all_trail_cells: &HashSet<String>,
    obstacles: &HashSet<String>,
    power_ups: &[PowerUp],
    grid_size: u32,
) -> Direction {
    let head = bot.head();
    let center = Cell::new(grid_size as i32 / 2, grid_size as i32 / 2);

    let mut best_dir = None;
    let mut best_score = f64::NEG_INFINITY;

    for dir in Direction::CARDINALS {
        let next = head.stepped(dir);
        let mut score = 0.0_f64;

        let unsafe_cell = !next.in_bounds(grid_size)
            || obstacles.contains(&next.key())
            || all_trail_cells.contains(&next.key());

        if unsafe_cell {
            score = -1000.0;
        } else {
            if safe_neighbor_count(&next, all_trail_cells, obstacles, grid_size) >= 2 {
                score += 100.0;
            }

            if let Some(first) = power_ups.first() {
                let dist = next.manhattan(&first.cell());
                if dist < 10 {
                    score += f64::from(10 - dist) * 5.0;
                }
            }

            let to_center = next.manhattan(&center);
            score += f64::from(grid_size as i32 - to_center) * 2.0;

            if bot.direction.opposite() == Some(dir) {
                score -= 50.0;
            }
        }

        if !unsafe_cell && score > best_score {
            best_score = score;
            best_dir = Some(dir);
        }
    }

    best_dir.unwrap_or(Direction::Right)
}

fn safe_neighbor_count(
    cell: &Cell,
    all_trail_cells: &HashSet<String>,
    obstacles: &HashSet<String>,
    grid_size: u32,
) -> usize {
    Direction::CARDINALS
        .iter()
        .filter(|dir| {
            let n = cell.stepped(**dir);
            n.in_bounds(grid_size) && !obstacles.contains(&n.key()) && !all_trail_cells.contains(&n.key())
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::PowerUpType;

    fn bot_at(x: i32, y: i32, dir: Direction) -> Player {
        Player {
            id: "ai-1".to_string(),
            name: "Bot".to_string(),
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

    #[test]
    fn avoids_walls_near_the_edge() {
        let bot = bot_at(0, 20, Direction::Left);
        let dir = choose_direction(&bot, &HashSet::new(), &HashSet::new(), &[], 40);
        assert_ne!(dir, Direction::Left, "must not walk into the wall at x=0");
    }

    #[test]
    fn falls_back_to_right_when_every_direction_is_unsafe() {
        let bot = bot_at(20, 20, Direction::Up);
        let mut trails = HashSet::new();
        for (dx, dy) in [(0, -1), (0, 1), (-1, 0), (1, 0)] {
            trails.insert(Cell::new(20 + dx, 20 + dy).key());
        }
        let dir = choose_direction(&bot, &trails, &HashSet::new(), &[], 40);
        assert_eq!(dir, Direction::Right);
    }

    #[test]
    fn is_pure_given_identical_inputs() {
        let bot = bot_at(20, 20, Direction::Up);
        let power_ups = vec![PowerUp { x: 25, y: 20, kind: PowerUpType::Speed }];
        let a = choose_direction(&bot, &HashSet::new(), &HashSet::new(), &power_ups, 40);
        let b = choose_direction(&bot, &HashSet::new(), &HashSet::new(), &power_ups, 40);
        assert_eq!(a, b);
    }
}
