//! Grid utilities: obstacle generation and safe-spawn search.
//!
//! Both are pure functions over an explicit RNG-free interface where possible; the
//! randomness itself comes from `fastrand`, matching the teacher's use of `fastrand`
//! alongside `rand` for lightweight non-cryptographic sampling.

use std::collections::HashSet;

use crate::protocol::types::{Cell, Direction};

/// Generate obstacles by partitioning the grid into four equal quadrants and sampling
/// a target density within each, rejecting points too close to an already-placed one.
pub fn generate_obstacles(
    grid_size: u32,
    margin: i32,
    density: f64,
    min_spacing: f64,
    attempts_per_quadrant: u32,
) -> HashSet<String> {
    let mut obstacles: Vec<Cell> = Vec::new();
    let half = grid_size as i32 / 2;
    let quadrants = [(0, half, 0, half), (half, grid_size as i32, 0, half), (0, half, half, grid_size as i32), (half, grid_size as i32, half, grid_size as i32)];
    let quadrant_side = half as f64;
    let target_per_quadrant = (quadrant_side * quadrant_side * density).floor() as u32;

    for (x0, x1, y0, y1) in quadrants {
        let lo_x = (x0 + margin).min(x1 - 1).max(x0);
        let hi_x = (x1 - margin).max(lo_x + 1);
        let lo_y = (y0 + margin).min(y1 - 1).max(y0);
        let hi_y = (y1 - margin).max(lo_y + 1);
        if hi_x <= lo_x || hi_y <= lo_y {
            continue;
        }

        let mut placed_in_quadrant = 0u32;
        let mut attempts = 0u32;
        while placed_in_quadrant < target_per_quadrant && attempts < attempts_per_quadrant {
            attempts += 1;
            let candidate = Cell::new(
                fastrand::i32(lo_x..hi_x),
                fastrand::i32(lo_y..hi_y),
            );
            if obstacles
                .iter()
                .any(|o| o.euclidean(&candidate) < min_spacing)
            {
                continue;
            }
            obstacles.push(candidate);
            placed_in_quadrant += 1;
        }
    }

    obstacles.into_iter().map(|c| c.key()).collect()
}

/// Search for a free cell to spawn a player, rejecting cells occupied by any player
/// head/trail or an obstacle. Falls back to `(margin, margin)` facing right.
pub fn safe_spawn(
    grid_size: u32,
    margin: i32,
    obstacles: &HashSet<String>,
    occupied_cells: &HashSet<String>,
    attempts: u32,
) -> (Cell, Direction) {
    let lo = margin;
    let hi = (grid_size as i32 - margin).max(lo + 1);

    for _ in 0..attempts {
        let candidate = Cell::new(fastrand::i32(lo..hi), fastrand::i32(lo..hi));
        let key = candidate.key();
        if obstacles.contains(&key) || occupied_cells.contains(&key) {
            continue;
        }
        return (candidate, random_cardinal());
    }

    (Cell::new(margin, margin), Direction::Right)
}

fn random_cardinal() -> Direction {
    let idx = fastrand::usize(0..Direction::CARDINALS.len());
    Direction::CARDINALS[idx]
}

/// Attempt to find a free cell for a power-up spawn, rejecting cells that collide with
/// an obstacle, any player trail, or an existing power-up.
pub fn spawn_power_up_cell(
    grid_size: u32,
    margin: i32,
    occupied: &HashSet<String>,
    attempts: u32,
) -> Option<Cell> {
    let lo = margin;
    let hi = (grid_size as i32 - margin).max(lo + 1);

    for _ in 0..attempts {
        let candidate = Cell::new(fastrand::i32(lo..hi), fastrand::i32(lo..hi));
        if !occupied.contains(&candidate.key()) {
            return Some(candidate);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_obstacles_respect_min_spacing() {
        let obstacles = generate_obstacles(40, 5, 0.08, 5.0, 100);
        let cells: Vec<Cell> = obstacles
            .iter()
            .filter_map(|k| {
                let mut parts = k.split(',');
                let x = parts.next()?.parse().ok()?;
                let y = parts.next()?.parse().ok()?;
                Some(Cell::new(x, y))
            })
            .collect();
        for i in 0..cells.len() {
            for j in (i + 1)..cells.len() {
                assert!(cells[i].euclidean(&cells[j]) >= 5.0);
            }
        }
    }

    #[test]
    fn safe_spawn_avoids_occupied_cells() {
        let obstacles: HashSet<String> = HashSet::new();
        let mut occupied = HashSet::new();
        for x in 5..35 {
            for y in 5..35 {
                if !(x == 20 && y == 20) {
                    occupied.insert(Cell::new(x, y).key());
                }
            }
        }
        let (cell, _) = safe_spawn(40, 5, &obstacles, &occupied, 500);
        assert!(!occupied.contains(&cell.key()) || cell == Cell::new(5, 5));
    }

    #[test]
    fn safe_spawn_falls_back_when_no_cell_is_free() {
        let obstacles: HashSet<String> = HashSet::new();
        let mut occupied = HashSet::new();
        for x in 0..40 {
            for y in 0..40 {
                occupied.insert(Cell::new(x, y).key());
            }
        }
        let (cell, dir) = safe_spawn(40, 5, &obstacles, &occupied, 10);
        assert_eq!(cell, Cell::new(5, 5));
        assert_eq!(dir, Direction::Right);
    }
}
