/// Capture rules — what happens when the player and a ghost meet.
///
/// Ghosts are scanned in spawn order. Distance is the Manhattan distance
/// between continuous positions; a collision needs `distance < threshold`.
///
/// ### Collision Truth Table
/// ┌───────────────────────────────┬─────────────────────────────────┐
/// │ Condition (priority order)    │ Result                          │
/// ├───────────────────────────────┼─────────────────────────────────┤
/// │ distance >= threshold         │ skip                            │
/// │ ghost frightened              │ ghost sent home, +ghost_points  │
/// │ player shielded               │ skip                            │
/// │ lives - 1 < 0                 │ GameOver, stop                  │
/// │ otherwise                     │ everyone to spawn, stop         │
/// └───────────────────────────────┴─────────────────────────────────┘
///
/// At most one life is lost per tick.

use super::entity::{Ghost, Player};

/// Parameters of one collision pass.
#[derive(Clone, Copy, Debug)]
pub struct CaptureRules {
    pub threshold: f64,
    pub ghost_points: u32,
    /// Release delay for a ghost sent home.
    pub home_time: f64,
    /// Invulnerability after a respawn.
    pub shield_time: f64,
}

/// How a dangerous collision ended.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Caught {
    /// A life was lost; player and ghosts are back at spawn.
    Respawn,
    /// Lives dropped below zero.
    GameOver,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Collision {
    /// Indices of frightened ghosts eaten this tick, in scan order.
    pub captured: Vec<usize>,
    pub caught: Option<Caught>,
}

impl Collision {
    pub fn is_quiet(&self) -> bool {
        self.captured.is_empty() && self.caught.is_none()
    }
}

#[inline]
pub fn touching(player: &Player, ghost: &Ghost, threshold: f64) -> bool {
    player.pos.manhattan(ghost.pos) < threshold
}

/// Resolve every player/ghost contact for this tick.
pub fn resolve_collisions(player: &mut Player, ghosts: &mut [Ghost], rules: &CaptureRules) -> Collision {
    let mut out = Collision::default();

    for i in 0..ghosts.len() {
        if !touching(player, &ghosts[i], rules.threshold) {
            continue;
        }

        if ghosts[i].is_frightened() {
            ghosts[i].reset(rules.home_time);
            player.score += rules.ghost_points;
            out.captured.push(i);
            continue;
        }

        if player.shield > 0.0 {
            continue;
        }

        player.lives -= 1;
        if player.lives < 0 {
            out.caught = Some(Caught::GameOver);
            return out;
        }

        player.respawn(rules.shield_time);
        for g in ghosts.iter_mut() {
            g.reset(rules.home_time);
        }
        out.caught = Some(Caught::Respawn);
        return out;
    }

    out
}
