/// Pellets and power pellets still on the board.

use std::collections::HashSet;

use super::grid::Coord;

/// What the player just ate.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Pickup {
    Pellet,
    Power,
}

#[derive(Clone, Debug, Default)]
pub struct PickupSet {
    pellets: HashSet<Coord>,
    powers: HashSet<Coord>,
}

impl PickupSet {
    /// A cell listed in both sets is kept as a power pellet only.
    pub fn new(pellets: impl IntoIterator<Item = Coord>, powers: impl IntoIterator<Item = Coord>) -> Self {
        let powers: HashSet<Coord> = powers.into_iter().collect();
        let pellets = pellets.into_iter().filter(|c| !powers.contains(c)).collect();
        PickupSet { pellets, powers }
    }

    /// Remove whatever sits on `cell`. Returns `None` when the cell is
    /// already empty, so repeated visits are no-ops.
    pub fn consume(&mut self, cell: Coord) -> Option<Pickup> {
        if self.pellets.remove(&cell) {
            Some(Pickup::Pellet)
        } else if self.powers.remove(&cell) {
            Some(Pickup::Power)
        } else {
            None
        }
    }

    pub fn has_pellet(&self, cell: Coord) -> bool {
        self.pellets.contains(&cell)
    }

    pub fn has_power(&self, cell: Coord) -> bool {
        self.powers.contains(&cell)
    }

    pub fn pellets_left(&self) -> usize {
        self.pellets.len()
    }

    pub fn powers_left(&self) -> usize {
        self.powers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pellets.is_empty() && self.powers.is_empty()
    }
}
