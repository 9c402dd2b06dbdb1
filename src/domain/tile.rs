/// Cell classification.
/// The simulation only ever asks "is this a wall?"; glyph handling for
/// level text is centralized here so the loader and renderer agree.

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Tile {
    #[default]
    Open,
    Wall,
}

impl Tile {
    pub fn is_wall(self) -> bool {
        matches!(self, Tile::Wall)
    }

    /// Classify a level glyph. Anything that is not a known open glyph
    /// (blank, pickups, spawn markers, ghost door) is a wall.
    pub fn from_glyph(ch: char) -> Tile {
        match ch {
            ' ' | '.' | 'o' | 'C' | 'M' | '=' => Tile::Open,
            _ => Tile::Wall,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_drawing_glyphs_are_walls() {
        for ch in "─│┌┐└┘├┤┬┴┼#".chars() {
            assert_eq!(Tile::from_glyph(ch), Tile::Wall, "{ch:?}");
        }
    }

    #[test]
    fn markers_and_pickups_are_open() {
        for ch in [' ', '.', 'o', 'C', 'M', '='] {
            assert!(!Tile::from_glyph(ch).is_wall(), "{ch:?}");
        }
    }
}
