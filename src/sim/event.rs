/// Events emitted during a simulation step.
/// The presentation layer consumes these for sound and logging.

use crate::domain::grid::Coord;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameEvent {
    /// First move of the session or after a respawn.
    Started,
    PelletEaten { x: i32, y: i32 },
    PowerPelletEaten { x: i32, y: i32 },
    GhostCaptured { index: usize },
    /// A life was lost; `lives` is what remains.
    PlayerCaught { lives: i32 },
    GameOver,
    LevelCleared,
    Paused,
    Resumed,
}

impl GameEvent {
    pub fn pellet((x, y): Coord) -> Self {
        GameEvent::PelletEaten { x, y }
    }

    pub fn power((x, y): Coord) -> Self {
        GameEvent::PowerPelletEaten { x, y }
    }
}
