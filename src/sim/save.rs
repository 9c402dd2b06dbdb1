/// Persistence: the resumable run state and the high-score table.
///
/// ## Run state (`state_file`):
///   `{"score": 120, "lives": 2, "level": 3}`
///   Written after every cleared level, deleted on game over, read by
///   "continue" on the landing screen.
///
/// ## High scores (`scores_file`):
///   JSON list of `{"score", "initials", "date"}`, best first, at most 10.
///   Dates are local time, `YYYY-MM-DDTHH:MM:SS`.
///
/// Relative file names resolve against the data directory: the exe
/// directory when writable, else `~/.local/share/cman`, else the CWD.
/// A missing or corrupt file reads as "nothing saved".

use std::fmt::Display;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{CmanError, Result};

/// Number of entries kept in the high-score table.
pub const TABLE_SIZE: usize = 10;

// ══════════════════════════════════════════════════════════════
// Paths
// ══════════════════════════════════════════════════════════════

fn data_dir() -> PathBuf {
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            // System installs like /usr/games/ won't be writable
            let test_path = parent.join(".write_test_cman");
            if std::fs::write(&test_path, "").is_ok() {
                let _ = std::fs::remove_file(&test_path);
                return parent.to_path_buf();
            }
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/cman");
        if std::fs::create_dir_all(&xdg).is_ok() {
            return xdg;
        }
    }

    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Absolute paths are kept; relative ones go under the data directory.
pub fn resolve(file: &Path) -> PathBuf {
    if file.is_absolute() {
        file.to_path_buf()
    } else {
        data_dir().join(file)
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Option<T> {
    let text = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&text) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring unreadable save file");
            None
        }
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|source| CmanError::File { path: dir.to_path_buf(), source })?;
    }
    let text = serde_json::to_string_pretty(value)
        .map_err(|source| CmanError::Json { path: path.to_path_buf(), source })?;
    std::fs::write(path, text).map_err(|source| CmanError::File { path: path.to_path_buf(), source })
}

// ══════════════════════════════════════════════════════════════
// Run state
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedState {
    pub score: u32,
    pub lives: i32,
    /// Index of the next level to play.
    #[serde(default)]
    pub level: usize,
}

pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: PathBuf) -> Self {
        StateStore { path }
    }

    pub fn load(&self) -> Option<SavedState> {
        read_json(&self.path)
    }

    pub fn save(&self, state: &SavedState) -> Result<()> {
        write_json(&self.path, state)
    }

    pub fn clear(&self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

// ══════════════════════════════════════════════════════════════
// High scores
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighScore {
    pub score: u32,
    #[serde(default = "default_initials")]
    pub initials: String,
    #[serde(default)]
    pub date: String,
}

fn default_initials() -> String {
    "???".into()
}

pub struct ScoreTable {
    path: PathBuf,
}

impl ScoreTable {
    pub fn new(path: PathBuf) -> Self {
        ScoreTable { path }
    }

    fn load(&self) -> Vec<HighScore> {
        read_json(&self.path).unwrap_or_default()
    }

    /// Best `limit` entries, highest first.
    pub fn top(&self, limit: usize) -> Vec<HighScore> {
        let mut scores = self.load();
        sort_scores(&mut scores);
        scores.truncate(limit);
        scores
    }

    /// Whether `score` would make the table.
    pub fn is_high_score(&self, score: u32) -> bool {
        qualifies(&self.load(), score)
    }

    /// Insert a new entry dated now. Returns whether it survived the cut.
    pub fn add(&self, score: u32, initials: &str) -> Result<bool> {
        let entry = HighScore {
            score,
            initials: normalize_initials(initials),
            date: timestamp(&Local::now()),
        };
        let mut scores = self.load();
        let kept = insert(&mut scores, entry);
        write_json(&self.path, &scores)?;
        Ok(kept)
    }
}

fn sort_scores(scores: &mut [HighScore]) {
    // Stable: earlier entries win ties.
    scores.sort_by(|a, b| b.score.cmp(&a.score));
}

fn qualifies(scores: &[HighScore], score: u32) -> bool {
    scores.len() < TABLE_SIZE || scores.iter().map(|s| s.score).min().map_or(true, |low| score > low)
}

fn insert(scores: &mut Vec<HighScore>, entry: HighScore) -> bool {
    scores.push(entry.clone());
    sort_scores(scores);
    scores.truncate(TABLE_SIZE);
    scores.contains(&entry)
}

/// Up to three uppercase ASCII letters; "???" when nothing usable is left.
pub fn normalize_initials(raw: &str) -> String {
    let s: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(3)
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if s.is_empty() { default_initials() } else { s }
}

// ── Dates ──

/// `YYYY-MM-DDTHH:MM:SS` in the zone of `t`, without an offset suffix.
fn timestamp<Tz: TimeZone>(t: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    t.format("%Y-%m-%dT%H:%M:%S").to_string()
}
