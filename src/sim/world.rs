/// Session: the complete state of one play session on one level.
///
/// ## State Machine
///
///   Idle → Running → {Paused ⇄ Running} → {Won | Lost}
///
///   - `Idle`    — ghosts frozen, timers frozen. Left on the first tick the
///                 player holds a direction. Also re-entered after a
///                 non-fatal capture.
///   - `Running` — full tick pipeline.
///   - `Paused`  — nothing advances. Remembers whether to go back to Idle
///                 or Running.
///   - `Won` / `Lost` — terminal. `step` is a no-op from here on.
///
/// The session owns its random source so a seeded run replays exactly.

use rand_chacha::ChaCha8Rng;

use crate::config::{RulesConfig, SpeedConfig};
use crate::domain::entity::{Ghost, Player};
use crate::domain::grid::Grid;
use crate::domain::pickup::PickupSet;
use crate::sim::level::Level;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SessionState {
    Idle,
    Running,
    Paused,
    Won,
    Lost,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Won | SessionState::Lost)
    }
}

/// How a session ended.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Outcome {
    Quit,
    Won,
    Lost,
}

/// Handed back to the caller when a session ends.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SessionResult {
    pub outcome: Outcome,
    pub score: u32,
    pub lives: i32,
}

/// Read-only view for the renderer.
#[derive(Clone, Copy, Debug)]
pub struct Snapshot<'a> {
    pub title: &'a str,
    pub state: SessionState,
    pub grid: &'a Grid,
    pub pickups: &'a PickupSet,
    pub player: &'a Player,
    pub ghosts: &'a [Ghost],
    pub power: f64,
    pub lives: i32,
    pub score: u32,
}

pub struct Session {
    pub title: String,
    pub state: SessionState,
    /// State to return to when a pause ends.
    resume_to: SessionState,
    pub grid: Grid,
    pub pickups: PickupSet,
    pub player: Player,
    /// Spawn-discovery order; collisions are scanned in this order.
    pub ghosts: Vec<Ghost>,
    pub speed: SpeedConfig,
    pub rules: RulesConfig,
    pub rng: ChaCha8Rng,
}

impl Session {
    pub fn new(level: &Level, speed: SpeedConfig, rules: RulesConfig, rng: ChaCha8Rng) -> Self {
        let player = Player::new(level.player_spawn, rules.lives_start, speed.shield_time);
        let ghosts = level.ghost_spawns.iter().map(|&home| Ghost::new(home)).collect();
        Session {
            title: level.name.clone(),
            state: SessionState::Idle,
            resume_to: SessionState::Idle,
            grid: level.grid.clone(),
            pickups: PickupSet::new(level.pellets.iter().copied(), level.powers.iter().copied()),
            player,
            ghosts,
            speed,
            rules,
            rng,
        }
    }

    /// Continue a run: score and lives come from the previous level.
    pub fn with_carry_over(mut self, score: u32, lives: i32) -> Self {
        self.player.score = score;
        self.player.lives = lives;
        self
    }

    /// Enter Paused from Idle or Running. Returns false if not allowed.
    pub fn pause(&mut self) -> bool {
        match self.state {
            SessionState::Idle | SessionState::Running => {
                self.resume_to = self.state;
                self.state = SessionState::Paused;
                true
            }
            _ => false,
        }
    }

    /// Leave Paused. Returns false if the session was not paused.
    pub fn resume(&mut self) -> bool {
        if self.state != SessionState::Paused {
            return false;
        }
        self.state = self.resume_to;
        true
    }

    /// Terminal outcome, if the session has reached one.
    pub fn outcome(&self) -> Option<Outcome> {
        match self.state {
            SessionState::Won => Some(Outcome::Won),
            SessionState::Lost => Some(Outcome::Lost),
            _ => None,
        }
    }

    pub fn result(&self, outcome: Outcome) -> SessionResult {
        SessionResult {
            outcome,
            score: self.player.score,
            lives: self.player.lives,
        }
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            title: &self.title,
            state: self.state,
            grid: &self.grid,
            pickups: &self.pickups,
            player: &self.player,
            ghosts: &self.ghosts,
            power: self.player.power,
            lives: self.player.lives,
            score: self.player.score,
        }
    }
}
