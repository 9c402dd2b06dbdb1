/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.

use serde::Deserialize;
use std::path::PathBuf;

use crate::domain::physics::Motion;
use crate::domain::rules::CaptureRules;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub speed: SpeedConfig,
    pub rules: RulesConfig,
    pub gamepad: GamepadConfig,
    pub levels_dir: PathBuf,
    pub state_file: PathBuf,
    pub scores_file: PathBuf,
    /// Fixed RNG seed for reproducible runs. `None` seeds from entropy.
    pub seed: Option<u64>,
}

#[derive(Clone, Debug)]
pub struct SpeedConfig {
    pub fps: u32,
    pub player_speed: f64,
    pub ghost_speed: f64,
    pub vertical_speed_mult: f64,
    pub power_time: f64,
    pub home_time: f64,
    pub shield_time: f64,
    pub blink_time: f64,      // frightened ghosts blink for the last N seconds
    pub death_pause_ms: u64,
}

#[derive(Clone, Debug)]
pub struct RulesConfig {
    pub lives_start: i32,
    pub collision_threshold: f64,
    pub pellet_points: u32,
    pub ghost_points: u32,
    pub level_bonus: u32,
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub pause: Vec<String>,
    pub quit: Vec<String>,
    pub confirm: Vec<String>,
}

impl SpeedConfig {
    pub fn player_motion(&self) -> Motion {
        Motion { speed: self.player_speed, vertical_mult: self.vertical_speed_mult }
    }

    pub fn ghost_motion(&self) -> Motion {
        Motion { speed: self.ghost_speed, vertical_mult: self.vertical_speed_mult }
    }

    /// Seconds per tick.
    pub fn tick_interval(&self) -> f64 {
        1.0 / self.fps.max(1) as f64
    }
}

impl RulesConfig {
    pub fn capture(&self, speed: &SpeedConfig) -> CaptureRules {
        CaptureRules {
            threshold: self.collision_threshold,
            ghost_points: self.ghost_points,
            home_time: speed.home_time,
            shield_time: speed.shield_time,
        }
    }
}

impl Default for SpeedConfig {
    fn default() -> Self {
        TomlSpeed::default().into()
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        TomlRules::default().into()
    }
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    speed: TomlSpeed,
    #[serde(default)]
    rules: TomlRules,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlSpeed {
    #[serde(default = "default_fps")]
    fps: u32,
    #[serde(default = "default_player_speed")]
    player_speed: f64,
    #[serde(default = "default_ghost_speed")]
    ghost_speed: f64,
    #[serde(default = "default_vertical_mult")]
    vertical_speed_mult: f64,
    #[serde(default = "default_power_time")]
    power_time: f64,
    #[serde(default = "default_home_time")]
    home_time: f64,
    #[serde(default = "default_shield_time")]
    shield_time: f64,
    #[serde(default = "default_blink_time")]
    blink_time: f64,
    #[serde(default = "default_death_pause")]
    death_pause_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlRules {
    #[serde(default = "default_lives")]
    lives_start: i32,
    #[serde(default = "default_threshold")]
    collision_threshold: f64,
    #[serde(default = "default_pellet_points")]
    pellet_points: u32,
    #[serde(default = "default_ghost_points")]
    ghost_points: u32,
    #[serde(default = "default_level_bonus")]
    level_bonus: u32,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_pause")]
    pause: Vec<String>,
    #[serde(default = "default_quit")]
    quit: Vec<String>,
    #[serde(default = "default_confirm")]
    confirm: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_levels_dir")]
    levels_dir: String,
    #[serde(default = "default_state_file")]
    state_file: String,
    #[serde(default = "default_scores_file")]
    scores_file: String,
    #[serde(default)]
    seed: Option<u64>,
}

// ── Defaults ──

fn default_fps() -> u32 { 30 }
fn default_player_speed() -> f64 { 7.0 }
fn default_ghost_speed() -> f64 { 6.0 }
fn default_vertical_mult() -> f64 { 0.7 }   // terminal cells are ~2:1
fn default_power_time() -> f64 { 8.0 }
fn default_home_time() -> f64 { 2.0 }
fn default_shield_time() -> f64 { 1.0 }
fn default_blink_time() -> f64 { 2.0 }
fn default_death_pause() -> u64 { 500 }

fn default_lives() -> i32 { 3 }
fn default_threshold() -> f64 { 0.9 }
fn default_pellet_points() -> u32 { 1 }
fn default_ghost_points() -> u32 { 10 }
fn default_level_bonus() -> u32 { 50 }

fn default_pause() -> Vec<String> { vec!["Start".into()] }
fn default_quit() -> Vec<String> { vec!["Select".into()] }
fn default_confirm() -> Vec<String> { vec!["A".into()] }

fn default_levels_dir() -> String { "levels".into() }
fn default_state_file() -> String { "cman_state.json".into() }
fn default_scores_file() -> String { "high_scores.json".into() }

impl Default for TomlSpeed {
    fn default() -> Self {
        TomlSpeed {
            fps: default_fps(),
            player_speed: default_player_speed(),
            ghost_speed: default_ghost_speed(),
            vertical_speed_mult: default_vertical_mult(),
            power_time: default_power_time(),
            home_time: default_home_time(),
            shield_time: default_shield_time(),
            blink_time: default_blink_time(),
            death_pause_ms: default_death_pause(),
        }
    }
}

impl Default for TomlRules {
    fn default() -> Self {
        TomlRules {
            lives_start: default_lives(),
            collision_threshold: default_threshold(),
            pellet_points: default_pellet_points(),
            ghost_points: default_ghost_points(),
            level_bonus: default_level_bonus(),
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            pause: default_pause(),
            quit: default_quit(),
            confirm: default_confirm(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            levels_dir: default_levels_dir(),
            state_file: default_state_file(),
            scores_file: default_scores_file(),
            seed: None,
        }
    }
}

impl From<TomlSpeed> for SpeedConfig {
    fn from(s: TomlSpeed) -> Self {
        SpeedConfig {
            fps: s.fps.max(1),
            player_speed: s.player_speed,
            ghost_speed: s.ghost_speed,
            vertical_speed_mult: s.vertical_speed_mult,
            power_time: s.power_time,
            home_time: s.home_time,
            shield_time: s.shield_time,
            blink_time: s.blink_time,
            death_pause_ms: s.death_pause_ms,
        }
    }
}

impl From<TomlRules> for RulesConfig {
    fn from(r: TomlRules) -> Self {
        RulesConfig {
            lives_start: r.lives_start,
            collision_threshold: r.collision_threshold,
            pellet_points: r.pellet_points,
            ghost_points: r.ghost_points,
            level_bonus: r.level_bonus,
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);
        Self::from_toml(toml_cfg, &search_dirs)
    }

    /// Parse a config document directly. Used by tests and tools.
    #[cfg(test)]
    fn parse(text: &str) -> Result<Self, toml::de::Error> {
        let cfg = toml::from_str::<TomlConfig>(text)?;
        Ok(Self::from_toml(cfg, &[]))
    }

    fn from_toml(toml_cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        // Resolve levels directory
        let levels_dir_str = &toml_cfg.general.levels_dir;
        let levels_dir = if PathBuf::from(levels_dir_str).is_absolute() {
            PathBuf::from(levels_dir_str)
        } else {
            search_dirs.iter()
                .map(|d| d.join(levels_dir_str))
                .find(|p| p.is_dir())
                .unwrap_or_else(|| PathBuf::from(levels_dir_str))
        };

        GameConfig {
            speed: toml_cfg.speed.into(),
            rules: toml_cfg.rules.into(),
            gamepad: GamepadConfig {
                pause: toml_cfg.gamepad.pause,
                quit: toml_cfg.gamepad.quit,
                confirm: toml_cfg.gamepad.confirm,
            },
            levels_dir,
            state_file: PathBuf::from(toml_cfg.general.state_file),
            scores_file: PathBuf::from(toml_cfg.general.scores_file),
            seed: toml_cfg.general.seed,
        }
    }
}

/// Candidate directories to search: exe dir + CWD (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
/// Runs before the terminal is switched to raw mode, so warnings go to stderr.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                    Ok(cfg) => return cfg,
                    Err(e) => {
                        eprintln!("Warning: config.toml parse error: {e}");
                        eprintln!("Using default settings.");
                        return TomlConfig::default();
                    }
                },
                Err(e) => {
                    eprintln!("Warning: could not read {}: {e}", path.display());
                }
            }
        }
    }
    TomlConfig::default()
}
