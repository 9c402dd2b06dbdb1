/// Ghost AI: single-step direction choice.
///
/// Two entry points:
///   1. **next_step** — tiered: A* toward a goal cell, greedy neighbor
///      choice when the goal is unreachable, `None` when boxed in.
///   2. **wander** — uniform random walk for frightened ghosts. Reversal
///      is only allowed to escape a dead end.
///
/// Both return the direction to move *now*, never a whole path.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use rand::seq::SliceRandom;
use rand::Rng;

use super::entity::Direction;
use super::grid::{manhattan, Coord, Grid};

/// Frontier entry: `(f, cell, first direction out of src)`.
/// `Reverse` turns the max-heap into a min-heap; remaining ties fall back
/// to cell then direction ordering, which keeps runs reproducible.
type Frontier = BinaryHeap<Reverse<(u32, Coord, Direction)>>;

/// Direction to take from `src` toward `dst`.
/// `forbidden` is only excluded as the first move (no instant reversal).
pub fn next_step(grid: &Grid, src: Coord, dst: Coord, forbidden: Direction) -> Direction {
    if src == dst {
        return Direction::None;
    }
    if !grid.contains(src) {
        return Direction::None;
    }
    if let Some(dir) = search(grid, src, dst, forbidden) {
        return dir;
    }
    greedy(grid, src, dst, forbidden)
}

/// A* with unit edge cost and Manhattan heuristic. Each queued node
/// inherits the first direction of the path that discovered it.
fn search(grid: &Grid, src: Coord, dst: Coord, forbidden: Direction) -> Option<Direction> {
    let width = grid.width();
    let index = |(x, y): Coord| y as usize * width + x as usize;

    let mut g_score = vec![u32::MAX; width * grid.height()];
    g_score[index(src)] = 0;

    let mut open: Frontier = BinaryHeap::with_capacity(64);
    open.push(Reverse((0, src, Direction::None)));

    while let Some(Reverse((_, current, first))) = open.pop() {
        if current == dst {
            return Some(first);
        }
        let g = g_score[index(current)];

        for (next, dir) in grid.neighbors(current) {
            if current == src && dir == forbidden {
                continue;
            }
            let tentative = g + 1;
            let slot = &mut g_score[index(next)];
            if tentative < *slot {
                *slot = tentative;
                let f = tentative + manhattan(next, dst) as u32;
                let tag = if first.is_none() { dir } else { first };
                open.push(Reverse((f, next, tag)));
            }
        }
    }
    None
}

/// Closest legal neighbor by Manhattan distance; ties keep enumeration order.
fn greedy(grid: &Grid, src: Coord, dst: Coord, forbidden: Direction) -> Direction {
    grid.neighbors(src)
        .filter(|&(_, dir)| dir != forbidden)
        .min_by_key(|&(cell, _)| manhattan(cell, dst))
        .map(|(_, dir)| dir)
        .unwrap_or(Direction::None)
}

/// Random legal direction, avoiding `forbidden` unless it is the only way out.
pub fn wander<R: Rng + ?Sized>(grid: &Grid, src: Coord, forbidden: Direction, rng: &mut R) -> Direction {
    let mut options: Vec<Direction> = grid.neighbors(src)
        .map(|(_, dir)| dir)
        .filter(|&dir| dir != forbidden)
        .collect();
    if options.is_empty() {
        options = grid.neighbors(src).map(|(_, dir)| dir).collect();
    }
    options.choose(rng).copied().unwrap_or(Direction::None)
}
