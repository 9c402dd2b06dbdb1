/// Entities: Player and Ghost state records, plus the value types they
/// move with. Behavior lives in `physics`, `ai` and `rules`; these types
/// only know how to reset themselves.

use super::grid::Coord;

/// Movement direction. At most one axis is ever non-zero.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub enum Direction {
    #[default]
    None,
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::None => (0, 0),
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    pub fn reverse(self) -> Direction {
        match self {
            Direction::None => Direction::None,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    pub fn is_none(self) -> bool {
        self == Direction::None
    }
}

/// One abstract input command per tick. Device mapping lives in `ui`.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Command {
    #[default]
    None,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    Pause,
    Quit,
}

impl Command {
    /// The steering request carried by a move command.
    pub fn direction(self) -> Option<Direction> {
        match self {
            Command::MoveUp => Some(Direction::Up),
            Command::MoveDown => Some(Direction::Down),
            Command::MoveLeft => Some(Direction::Left),
            Command::MoveRight => Some(Direction::Right),
            _ => None,
        }
    }
}

/// Continuous position with sub-cell precision.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Position { x, y }
    }

    pub fn from_cell((x, y): Coord) -> Self {
        Position { x: x as f64, y: y as f64 }
    }

    /// Integer cell containing this position.
    #[inline]
    pub fn cell(self) -> Coord {
        (self.x.floor() as i32, self.y.floor() as i32)
    }

    /// Offset by whole cells in `dir`.
    pub fn step(self, dir: Direction) -> Position {
        let (dx, dy) = dir.delta();
        Position { x: self.x + dx as f64, y: self.y + dy as f64 }
    }

    pub fn manhattan(self, other: Position) -> f64 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

#[derive(Clone, Debug)]
pub struct Player {
    pub pos: Position,
    pub dir: Direction,
    /// Sticky steering request, retried every tick until a turn is legal.
    pub want: Direction,
    /// Remaining lives; dropping below zero loses the session.
    pub lives: i32,
    pub power: f64,
    pub shield: f64,
    pub score: u32,
    pub spawn: Coord,
}

impl Player {
    pub fn new(spawn: Coord, lives: i32, shield: f64) -> Self {
        Player {
            pos: Position::from_cell(spawn),
            dir: Direction::None,
            want: Direction::None,
            lives,
            power: 0.0,
            shield,
            score: 0,
            spawn,
        }
    }

    /// Back to spawn after losing a life. Score and lives are kept.
    pub fn respawn(&mut self, shield: f64) {
        self.pos = Position::from_cell(self.spawn);
        self.dir = Direction::None;
        self.want = Direction::None;
        self.power = 0.0;
        self.shield = shield;
    }
}

#[derive(Clone, Debug)]
pub struct Ghost {
    pub pos: Position,
    pub dir: Direction,
    pub home: Coord,
    pub frightened: f64,
    /// While positive the ghost waits at home and does not chase.
    pub home_timer: f64,
}

impl Ghost {
    pub fn new(home: Coord) -> Self {
        Ghost {
            pos: Position::from_cell(home),
            dir: Direction::None,
            home,
            frightened: 0.0,
            home_timer: 0.0,
        }
    }

    pub fn is_frightened(&self) -> bool {
        self.frightened > 0.0
    }

    /// Send the ghost home: used both when it is eaten and when the
    /// player loses a life.
    pub fn reset(&mut self, home_time: f64) {
        self.pos = Position::from_cell(self.home);
        self.dir = Direction::None;
        self.frightened = 0.0;
        self.home_timer = home_time;
    }
}
