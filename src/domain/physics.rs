/// Movement layer: continuous positions over the discrete wall grid.
///
/// ## Integration
///
///   new = wrap(pos + delta · speed · dt), vertical component × vertical_mult
///
/// If the cell of `new` is a wall the whole move is rejected. There is no
/// sliding and no clamping to the wall edge.
///
/// ## Rejection Table
/// ┌──────────────┬───────────────┬──────────────────────┐
/// │ Actor        │ Position      │ Direction            │
/// ├──────────────┼───────────────┼──────────────────────┤
/// │ Player       │ unchanged     │ kept                 │
/// │ Ghost        │ unchanged     │ zeroed (re-decide)   │
/// └──────────────┴───────────────┴──────────────────────┘
///
/// ## Ghost Decision (priority order)
/// ┌──────────────────────────────┬────────────────────────────────┐
/// │ Condition                    │ Choice                         │
/// ├──────────────────────────────┼────────────────────────────────┤
/// │ home_timer > 0               │ timer counts down, no movement │
/// │ not aligned and moving       │ keep current direction         │
/// │ frightened                   │ wander                         │
/// │ inside home area             │ next_step → exit above centre  │
/// │ otherwise                    │ next_step → player cell        │
/// │ result None                  │ wander, nothing forbidden      │
/// └──────────────────────────────┴────────────────────────────────┘

use rand::Rng;

use super::ai;
use super::entity::{Direction, Ghost, Player, Position};
use super::grid::{Coord, Grid};

/// A ghost re-decides when both axes are this close to an integer.
pub const ALIGN_EPSILON: f64 = 0.1;
/// Half-width of the square around the map centre treated as home.
pub const HOME_RADIUS: f64 = 3.0;
/// Rows above the centre that a ghost leaving home aims for.
pub const HOME_EXIT_OFFSET: i32 = 4;

/// Speed parameters for one actor class.
#[derive(Clone, Copy, Debug)]
pub struct Motion {
    /// Cells per second along the horizontal axis.
    pub speed: f64,
    /// Vertical speed factor for non-square terminal cells.
    pub vertical_mult: f64,
}

/// Count a timer down by `dt`, floored at zero.
#[inline]
pub fn decay(timer: f64, dt: f64) -> f64 {
    (timer - dt).max(0.0)
}

// ══════════════════════════════════════════════════════════════
// Integration
// ══════════════════════════════════════════════════════════════

/// Tentative position after one tick, or `None` if it lands in a wall.
pub fn integrate(grid: &Grid, pos: Position, dir: Direction, motion: Motion, dt: f64) -> Option<Position> {
    let (dx, dy) = dir.delta();
    let step = motion.speed * dt;
    let next = grid.wrap_pos(Position::new(
        pos.x + dx as f64 * step,
        pos.y + dy as f64 * step * motion.vertical_mult,
    ));
    let (cx, cy) = next.cell();
    if grid.is_wall(cx, cy) { None } else { Some(next) }
}

/// Both axes within `ALIGN_EPSILON` of an integer coordinate.
#[inline]
pub fn is_aligned(pos: Position) -> bool {
    (pos.x - pos.x.round()).abs() < ALIGN_EPSILON && (pos.y - pos.y.round()).abs() < ALIGN_EPSILON
}

/// Inside the square home area around the map centre.
pub fn in_home_area(grid: &Grid, pos: Position) -> bool {
    let (cx, cy) = grid.center();
    (pos.x - cx as f64).abs() < HOME_RADIUS && (pos.y - cy as f64).abs() < HOME_RADIUS
}

// ── Player ──

/// Adopt the sticky `want` direction if the cell one step away is open.
/// Returns true when the direction changed.
pub fn steer_player(grid: &Grid, player: &mut Player) -> bool {
    if player.want.is_none() || player.want == player.dir {
        return false;
    }
    let (cx, cy) = grid.wrap_pos(player.pos.step(player.want)).cell();
    if grid.is_wall(cx, cy) {
        return false;
    }
    player.dir = player.want;
    true
}

/// Advance the player. A blocked move leaves position and direction as is.
pub fn move_player(grid: &Grid, player: &mut Player, motion: Motion, dt: f64) -> bool {
    if player.dir.is_none() {
        return false;
    }
    match integrate(grid, player.pos, player.dir, motion, dt) {
        Some(next) => {
            player.pos = next;
            true
        }
        None => false,
    }
}

// ── Ghosts ──

/// Where a ghost still inside the home area heads to get out.
pub fn home_exit(grid: &Grid, cell: Coord) -> Coord {
    (cell.0, (grid.center().1 - HOME_EXIT_OFFSET).max(0))
}

/// Pick a new direction for `ghost`. Caller decides when to ask.
pub fn decide_ghost<R: Rng + ?Sized>(grid: &Grid, ghost: &Ghost, target: Coord, rng: &mut R) -> Direction {
    let cell = ghost.pos.cell();
    let forbidden = ghost.dir.reverse();

    let choice = if ghost.is_frightened() {
        ai::wander(grid, cell, forbidden, rng)
    } else if in_home_area(grid, ghost.pos) {
        ai::next_step(grid, cell, home_exit(grid, cell), forbidden)
    } else {
        ai::next_step(grid, cell, target, forbidden)
    };

    if choice.is_none() {
        ai::wander(grid, cell, Direction::None, rng)
    } else {
        choice
    }
}

/// One tick of ghost movement toward `target` (the player's cell).
/// A ghost still waiting at home only counts its release timer down.
pub fn move_ghost<R: Rng + ?Sized>(
    grid: &Grid,
    ghost: &mut Ghost,
    target: Coord,
    motion: Motion,
    dt: f64,
    rng: &mut R,
) {
    if ghost.home_timer > 0.0 {
        ghost.home_timer = decay(ghost.home_timer, dt);
        return;
    }

    if ghost.dir.is_none() || is_aligned(ghost.pos) {
        ghost.dir = decide_ghost(grid, ghost, target, rng);
    }
    if ghost.dir.is_none() {
        return;
    }

    match integrate(grid, ghost.pos, ghost.dir, motion, dt) {
        Some(next) => ghost.pos = next,
        None => ghost.dir = Direction::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::grid::tests::grid_from;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const DT: f64 = 1.0 / 30.0;
    const PLAYER: Motion = Motion { speed: 7.0, vertical_mult: 0.7 };
    const GHOST: Motion = Motion { speed: 6.0, vertical_mult: 0.7 };

    fn room() -> Grid {
        grid_from(&[
            "#######",
            "#     #",
            "#     #",
            "#     #",
            "#######",
        ])
    }

    #[test]
    fn decay_floors_at_zero() {
        assert_eq!(decay(1.0, 0.25), 0.75);
        assert_eq!(decay(0.1, 0.5), 0.0);
        assert_eq!(decay(0.0, 0.5), 0.0);
    }

    #[test]
    fn horizontal_and_vertical_speeds_differ() {
        let g = room();
        let start = Position::new(2.0, 2.0);
        let right = integrate(&g, start, Direction::Right, PLAYER, 0.1).unwrap();
        assert!((right.x - 2.7).abs() < 1e-9);
        assert_eq!(right.y, 2.0);
        let down = integrate(&g, start, Direction::Down, PLAYER, 0.1).unwrap();
        assert!((down.y - 2.49).abs() < 1e-9);
        assert_eq!(down.x, 2.0);
    }

    #[test]
    fn move_into_wall_is_rejected_whole() {
        let g = room();
        // (0,1) is a wall: moving left from x=1.0 lands in it.
        assert_eq!(integrate(&g, Position::new(1.0, 1.0), Direction::Left, PLAYER, DT), None);
        // y below zero maps to row -1, which is always a wall.
        let top = grid_from(&["   ", "   "]);
        assert_eq!(integrate(&top, Position::new(1.0, 0.0), Direction::Up, PLAYER, DT), None);
    }

    #[test]
    fn player_keeps_direction_when_blocked() {
        let g = room();
        let mut p = Player::new((1, 1), 3, 0.0);
        p.dir = Direction::Left;
        assert!(!move_player(&g, &mut p, PLAYER, DT));
        assert_eq!(p.pos, Position::new(1.0, 1.0));
        assert_eq!(p.dir, Direction::Left);
    }

    #[test]
    fn steering_is_sticky_until_the_turn_is_open() {
        let g = grid_from(&[
            "#####",
            "#   #",
            "### #",
            "#####",
        ]);
        let mut p = Player::new((1, 1), 3, 0.0);
        p.dir = Direction::Right;
        p.want = Direction::Down;
        // (1,2) is a wall, so the turn waits.
        assert!(!steer_player(&g, &mut p));
        assert_eq!(p.dir, Direction::Right);

        p.pos = Position::new(3.0, 1.0);
        assert!(steer_player(&g, &mut p));
        assert_eq!(p.dir, Direction::Down);
        assert_eq!(p.want, Direction::Down);
    }

    #[test]
    fn player_wraps_through_side_tunnel() {
        let g = grid_from(&["#####", "     ", "#####"]);
        let mut p = Player::new((0, 1), 3, 0.0);
        p.dir = Direction::Left;
        assert!(move_player(&g, &mut p, PLAYER, DT));
        assert_eq!(p.pos, Position::new(4.0, 1.0));
    }

    #[test]
    fn alignment_window() {
        assert!(is_aligned(Position::new(3.05, 2.0)));
        assert!(is_aligned(Position::new(2.95, 1.99)));
        assert!(!is_aligned(Position::new(3.2, 2.0)));
        assert!(!is_aligned(Position::new(3.0, 2.5)));
    }

    #[test]
    fn home_area_and_exit() {
        let g = grid_from(&["            "; 12]);
        // Centre is (6, 6).
        assert!(in_home_area(&g, Position::new(6.0, 6.0)));
        assert!(in_home_area(&g, Position::new(8.9, 3.1)));
        assert!(!in_home_area(&g, Position::new(9.0, 6.0)));
        assert_eq!(home_exit(&g, (5, 7)), (5, 2));

        let small = grid_from(&["      ", "      ", "      "]);
        assert_eq!(home_exit(&small, (3, 1)), (3, 0));
    }

    #[test]
    fn waiting_ghost_only_counts_down() {
        let g = room();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut ghost = Ghost::new((3, 2));
        ghost.home_timer = 0.05;
        move_ghost(&g, &mut ghost, (1, 1), GHOST, DT, &mut rng);
        assert_eq!(ghost.pos, Position::new(3.0, 2.0));
        assert!((ghost.home_timer - (0.05 - DT)).abs() < 1e-12);
        move_ghost(&g, &mut ghost, (1, 1), GHOST, DT, &mut rng);
        assert_eq!(ghost.home_timer, 0.0);
        assert_eq!(ghost.pos, Position::new(3.0, 2.0));
    }

    #[test]
    fn chasing_ghost_heads_for_the_player() {
        let g = grid_from(&[
            "###########",
            "#         #",
            "###########",
        ]);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut ghost = Ghost::new((1, 1));
        // Centre is (5,1), four cells away: outside the home area.
        move_ghost(&g, &mut ghost, (9, 1), GHOST, DT, &mut rng);
        assert_eq!(ghost.dir, Direction::Right);
        assert!(ghost.pos.x > 1.0);
    }

    #[test]
    fn ghost_in_home_heads_for_the_exit() {
        let g = grid_from(&[
            "#########",
            "#       #",
            "#       #",
            "#       #",
            "#       #",
            "#       #",
            "#       #",
            "#       #",
            "#########",
        ]);
        // Centre (4,4). The exit sits on the top wall row, so the greedy
        // fallback still points Up although the player is below.
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let ghost = Ghost::new((4, 4));
        assert_eq!(decide_ghost(&g, &ghost, (4, 7), &mut rng), Direction::Up);
    }

    #[test]
    fn frightened_ghost_never_reverses_in_open_corridor() {
        let g = grid_from(&[
            "###########",
            "#         #",
            "###########",
        ]);
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut ghost = Ghost::new((2, 1));
        ghost.frightened = 5.0;
        ghost.dir = Direction::Right;
        for _ in 0..10 {
            assert_eq!(decide_ghost(&g, &ghost, (1, 1), &mut rng), Direction::Right);
        }
    }

    #[test]
    fn blocked_ghost_zeroes_direction() {
        let g = grid_from(&[
            "#####",
            "#   #",
            "#####",
        ]);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut ghost = Ghost::new((1, 1));
        ghost.pos = Position::new(1.15, 1.0);
        ghost.dir = Direction::Left;
        // Not aligned, keeps Left and lands at x < 1.0 → cell 0 is a wall.
        move_ghost(&g, &mut ghost, (3, 1), GHOST, DT, &mut rng);
        assert_eq!(ghost.dir, Direction::None);
        assert_eq!(ghost.pos, Position::new(1.15, 1.0));
    }
}
