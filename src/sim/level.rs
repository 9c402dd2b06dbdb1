/// Level loader.
///
/// ## Sources (priority order):
///   1. `LEVEL` environment variable naming a file stem in `levels/`
///   2. `levels/` directory (individual `.txt` files, sorted by name)
///   3. Built-in embedded level
///
/// ## Single-level format (`.txt`):
///   One map row per line. Every row must have the same width.
///   Trailing blank lines are ignored; `\r` line endings are accepted.
///
/// ## Glyph legend:
///   ' ' = Open                   '=' = Ghost door (open)
///   '.' = Pellet                 'o' = Power pellet
///   'C' = Player spawn           'M' = Ghost spawn
///   anything else = Wall (box-drawing glyphs, '#', ...)
///
/// Markers are stripped here; the simulation only ever sees a clean
/// wall/open grid plus coordinates.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::grid::{Coord, Grid, GridError};
use crate::domain::tile::Tile;

/// A validated level, ready to build a session from.
#[derive(Clone, Debug)]
pub struct Level {
    pub name: String,
    pub grid: Grid,
    pub pellets: Vec<Coord>,
    pub powers: Vec<Coord>,
    pub player_spawn: Coord,
    /// Row-major discovery order; this is also the collision scan order.
    pub ghost_spawns: Vec<Coord>,
}

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("level is empty")]
    Empty,
    #[error("row {row} length {len} != {expected} (level must be rectangular)")]
    Ragged { row: usize, len: usize, expected: usize },
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<GridError> for LevelError {
    fn from(e: GridError) -> Self {
        match e {
            GridError::Empty => LevelError::Empty,
            GridError::Ragged { row, len, expected } => LevelError::Ragged { row, len, expected },
        }
    }
}

/// Where the next level comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LevelSource {
    File(PathBuf),
    Embedded,
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// Parse level text. `name` becomes the HUD title.
pub fn parse_level(name: &str, text: &str) -> Result<Level, LevelError> {
    let mut rows: Vec<Vec<char>> = text.lines().map(|l| l.chars().collect()).collect();
    while rows.last().map_or(false, |r| r.is_empty()) {
        rows.pop();
    }
    if rows.is_empty() {
        return Err(LevelError::Empty);
    }

    let expected = rows[0].len();
    if let Some((row, r)) = rows.iter().enumerate().find(|(_, r)| r.len() != expected) {
        return Err(LevelError::Ragged { row, len: r.len(), expected });
    }

    let mut pellets = vec![];
    let mut powers = vec![];
    let mut player_spawn = None;
    let mut ghost_spawns = vec![];

    for (y, row) in rows.iter().enumerate() {
        for (x, &ch) in row.iter().enumerate() {
            let c = (x as i32, y as i32);
            match ch {
                '.' => pellets.push(c),
                'o' => powers.push(c),
                'C' if player_spawn.is_none() => player_spawn = Some(c),
                'M' => ghost_spawns.push(c),
                _ => {}
            }
        }
    }

    let player_spawn = player_spawn.unwrap_or_else(|| fallback_spawn(&rows));

    let tiles = rows
        .iter()
        .map(|r| r.iter().map(|&ch| Tile::from_glyph(ch)).collect())
        .collect();
    let grid = Grid::new(tiles)?;

    debug!(
        name,
        width = grid.width(),
        height = grid.height(),
        pellets = pellets.len(),
        powers = powers.len(),
        ghosts = ghost_spawns.len(),
        "level parsed"
    );

    Ok(Level {
        name: name.to_string(),
        grid,
        pellets,
        powers,
        player_spawn,
        ghost_spawns,
    })
}

/// Read and parse one level file. The title is the file stem.
pub fn load_level_file(path: &Path) -> Result<Level, LevelError> {
    let text = std::fs::read_to_string(path).map_err(|source| LevelError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_level(&level_title(path), &text)
}

/// Load whatever `source` points at.
pub fn load(source: &LevelSource) -> Result<Level, LevelError> {
    match source {
        LevelSource::File(path) => load_level_file(path),
        LevelSource::Embedded => embedded_level(),
    }
}

/// Sorted `.txt` files in `dir`. A missing directory yields an empty list.
pub fn list_level_files(dir: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(_) => return vec![],
    };

    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.extension()
                .map_or(false, |e| e.to_string_lossy().eq_ignore_ascii_case("txt"))
        })
        .collect();
    files.sort();
    files
}

/// The level order for one run: every file in `dir`, or the embedded
/// level when there are none.
pub fn level_sources(dir: &Path) -> Vec<LevelSource> {
    let files = list_level_files(dir);
    if files.is_empty() {
        warn!(dir = %dir.display(), "no level files found, using built-in level");
        return vec![LevelSource::Embedded];
    }
    files.into_iter().map(LevelSource::File).collect()
}

/// Index of the level named by `requested` (a file stem), else 0.
pub fn initial_level(sources: &[LevelSource], requested: Option<&str>) -> usize {
    let Some(stem) = requested.filter(|s| !s.is_empty()) else {
        return 0;
    };
    let found = sources.iter().position(|s| match s {
        LevelSource::File(p) => p.file_stem().map_or(false, |f| f == stem),
        LevelSource::Embedded => false,
    });
    match found {
        Some(i) => i,
        None => {
            let available: Vec<String> = sources.iter().map(source_title).collect();
            warn!(level = stem, ?available, "requested level not found, starting at the first");
            0
        }
    }
}

/// Display title for a source.
pub fn source_title(source: &LevelSource) -> String {
    match source {
        LevelSource::File(p) => level_title(p),
        LevelSource::Embedded => EMBEDDED_NAME.to_string(),
    }
}

fn level_title(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "level".to_string())
}

/// First open cell scanning from the middle row down, else (1, 1).
fn fallback_spawn(rows: &[Vec<char>]) -> Coord {
    let h = rows.len();
    for (y, row) in rows.iter().enumerate().skip(h / 2) {
        if let Some(x) = row.iter().position(|&ch| matches!(ch, ' ' | '.' | 'o' | 'M')) {
            return (x as i32, y as i32);
        }
    }
    (1, 1)
}

// ══════════════════════════════════════════════════════════════
// Embedded fallback level
// ══════════════════════════════════════════════════════════════

const EMBEDDED_NAME: &str = "classic";

const EMBEDDED_MAP: &[&str] = &[
    "┌────────────┬┬────────────┐",
    "│............││............│",
    "│.┌──┐.┌───┐.││.┌───┐.┌──┐.│",
    "│o│  │.│   │.││.│   │.│  │o│",
    "│.└──┘.└───┘.└┘.└───┘.└──┘.│",
    "│..........................│",
    "│.┌──┐.┌┐.┌──────┐.┌┐.┌──┐.│",
    "│.└──┘.││.└──┐┌──┘.││.└──┘.│",
    "│......││....││....││......│",
    "└────┐.│└──┐ ││ ┌──┘│.┌────┘",
    "     │.│┌──┘ └┘ └──┐│.│     ",
    "     │.││          ││.│     ",
    "     │.││ ┌──==──┐ ││.│     ",
    "─────┘.└┘ │      │ └┘.└─────",
    "      .   │ M  M │   .      ",
    "─────┐.┌┐ │      │ ┌┐.┌─────",
    "     │.││ └──────┘ ││.│     ",
    "     │.││          ││.│     ",
    "     │.││ ┌──────┐ ││.│     ",
    "┌────┘.└┘ └──┐┌──┘ └┘.└────┐",
    "│............││............│",
    "│.┌──┐.┌───┐.││.┌───┐.┌──┐.│",
    "│.└─┐│.└───┘.└┘.└───┘.│┌─┘.│",
    "│o..││.......C .......││..o│",
    "├─┐.││.┌┐.┌──────┐.┌┐.││.┌─┤",
    "├─┘.└┘.││.└──┐┌──┘.││.└┘.└─┤",
    "│......││....││....││......│",
    "│.┌────┘└──┐.││.┌──┘└────┐.│",
    "│.└────────┘.└┘.└────────┘.│",
    "│..........................│",
    "└──────────────────────────┘",
];

fn embedded_level() -> Result<Level, LevelError> {
    parse_level(EMBEDDED_NAME, &EMBEDDED_MAP.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markers_become_open_cells() {
        let lvl = parse_level("t", "#####\n#C.M#\n#o M#\n#####\n").unwrap();
        assert_eq!(lvl.player_spawn, (1, 1));
        assert_eq!(lvl.ghost_spawns, vec![(3, 1), (3, 2)]);
        assert_eq!(lvl.pellets, vec![(2, 1)]);
        assert_eq!(lvl.powers, vec![(1, 2)]);
        assert!(!lvl.grid.is_wall(1, 1));
        assert!(!lvl.grid.is_wall(3, 1));
        assert!(lvl.grid.is_wall(0, 0));
    }

    #[test]
    fn first_player_marker_wins() {
        let lvl = parse_level("t", "C C\n   \n").unwrap();
        assert_eq!(lvl.player_spawn, (0, 0));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let err = parse_level("t", "####\n# #\n####").unwrap_err();
        assert!(matches!(err, LevelError::Ragged { row: 1, len: 3, expected: 4 }));
    }

    #[test]
    fn empty_text_is_rejected() {
        assert!(matches!(parse_level("t", ""), Err(LevelError::Empty)));
        assert!(matches!(parse_level("t", "\n\n"), Err(LevelError::Empty)));
    }

    #[test]
    fn crlf_and_trailing_blank_lines_are_accepted() {
        let lvl = parse_level("t", "###\r\n#C#\r\n###\r\n\r\n\n").unwrap();
        assert_eq!(lvl.grid.height(), 3);
        assert_eq!(lvl.grid.width(), 3);
    }

    #[test]
    fn width_counts_characters_not_bytes() {
        let lvl = parse_level("t", "┌─┐\n│C│\n└─┘").unwrap();
        assert_eq!(lvl.grid.width(), 3);
        assert!(lvl.grid.is_wall(0, 0));
    }

    #[test]
    fn spawn_falls_back_to_lower_half() {
        let lvl = parse_level("t", "#####\n# . #\n##.##\n#  .#\n#####").unwrap();
        // H = 5, scan starts at row 2.
        assert_eq!(lvl.player_spawn, (2, 2));
        let lvl = parse_level("t", " ##\n###\n###").unwrap();
        assert_eq!(lvl.player_spawn, (1, 1));
    }

    #[test]
    fn initial_level_honours_request() {
        let sources = vec![
            LevelSource::File(PathBuf::from("levels/a.txt")),
            LevelSource::File(PathBuf::from("levels/b.txt")),
        ];
        assert_eq!(initial_level(&sources, Some("b")), 1);
        assert_eq!(initial_level(&sources, Some("zzz")), 0);
        assert_eq!(initial_level(&sources, None), 0);
        assert_eq!(source_title(&sources[1]), "b");
    }

    #[test]
    fn missing_directory_uses_embedded_level() {
        let sources = level_sources(Path::new("/nonexistent/cman/levels"));
        assert_eq!(sources, vec![LevelSource::Embedded]);
        let lvl = load(&sources[0]).unwrap();
        assert_eq!(lvl.name, "classic");
        assert_eq!(lvl.ghost_spawns.len(), 2);
        assert!(lvl.pellets.len() > 100);
        assert_eq!(lvl.powers.len(), 4);
    }

    #[test]
    fn directory_listing_is_sorted_txt_only() {
        let dir = std::env::temp_dir().join(format!("cman-levels-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("b.txt"), "#C#\n").unwrap();
        std::fs::write(dir.join("a.txt"), "#C#\n").unwrap();
        std::fs::write(dir.join("notes.md"), "x").unwrap();
        let files = list_level_files(&dir);
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
        let lvl = load_level_file(&files[0]).unwrap();
        assert_eq!(lvl.name, "a");
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
