/// Immutable maze grid.
///
/// Geometry rules:
///   - Horizontal axis wraps: `x < 0` becomes `W-1`, `x >= W` becomes `0`.
///   - Vertical axis is bounded: any `y` outside `[0, H)` is a wall.
///   - `neighbors` enumerates Right, Left, Down, Up. Every fallback
///     selection in the AI breaks ties in this order.

use thiserror::Error;

use super::entity::{Direction, Position};
use super::tile::Tile;

/// Integer cell coordinate `(x, y)`.
pub type Coord = (i32, i32);

/// Enumeration order for adjacency queries.
pub const NEIGHBOR_ORDER: [Direction; 4] = [
    Direction::Right,
    Direction::Left,
    Direction::Down,
    Direction::Up,
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("grid has no rows")]
    Empty,
    #[error("row {row} has {len} cells, expected {expected}")]
    Ragged { row: usize, len: usize, expected: usize },
}

#[derive(Clone, Debug)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<Tile>,
}

impl Grid {
    pub fn new(rows: Vec<Vec<Tile>>) -> Result<Self, GridError> {
        let width = rows.first().map(|r| r.len()).ok_or(GridError::Empty)?;
        if width == 0 {
            return Err(GridError::Empty);
        }
        let height = rows.len();
        let mut cells = Vec::with_capacity(width * height);
        for (row, tiles) in rows.into_iter().enumerate() {
            if tiles.len() != width {
                return Err(GridError::Ragged { row, len: tiles.len(), expected: width });
            }
            cells.extend(tiles);
        }
        Ok(Grid { width, height, cells })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Map centre in integer halves, as used by the home-area check.
    pub fn center(&self) -> Coord {
        ((self.width / 2) as i32, (self.height / 2) as i32)
    }

    /// Whether `c` is inside the grid without wrapping.
    pub fn contains(&self, (x, y): Coord) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    pub fn tile(&self, x: i32, y: i32) -> Tile {
        if y < 0 || y as usize >= self.height {
            return Tile::Wall;
        }
        let (x, y) = self.wrap_cell(x, y);
        self.cells[y as usize * self.width + x as usize]
    }

    #[inline]
    pub fn is_wall(&self, x: i32, y: i32) -> bool {
        self.tile(x, y).is_wall()
    }

    /// Horizontal wrap for cells. `y` is left untouched.
    #[inline]
    pub fn wrap_cell(&self, x: i32, y: i32) -> Coord {
        let w = self.width as i32;
        let x = if x < 0 {
            w - 1
        } else if x >= w {
            0
        } else {
            x
        };
        (x, y)
    }

    /// Horizontal wrap for continuous positions.
    #[inline]
    pub fn wrap_pos(&self, pos: Position) -> Position {
        let w = self.width as f64;
        let x = if pos.x < 0.0 {
            w - 1.0
        } else if pos.x >= w {
            0.0
        } else {
            pos.x
        };
        Position { x, y: pos.y }
    }

    /// Non-wall neighbors of a cell, in `NEIGHBOR_ORDER`.
    pub fn neighbors(&self, (x, y): Coord) -> impl Iterator<Item = (Coord, Direction)> + '_ {
        NEIGHBOR_ORDER.into_iter().filter_map(move |dir| {
            let (dx, dy) = dir.delta();
            let next = self.wrap_cell(x + dx, y + dy);
            if self.is_wall(next.0, next.1) {
                None
            } else {
                Some((next, dir))
            }
        })
    }

    /// Row-major iterator over every open cell.
    #[cfg(test)]
    pub fn open_cells(&self) -> impl Iterator<Item = Coord> + '_ {
        (0..self.height).flat_map(move |y| {
            (0..self.width).filter_map(move |x| {
                let c = (x as i32, y as i32);
                (!self.is_wall(c.0, c.1)).then_some(c)
            })
        })
    }
}

/// Grid distance, ignoring wrap.
#[inline]
pub fn manhattan(a: Coord, b: Coord) -> i32 {
    (a.0 - b.0).abs() + (a.1 - b.1).abs()
}
