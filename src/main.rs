/// Entry point: landing screen, level progression, persistence.

mod config;
mod domain;
mod error;
mod sim;
mod ui;

use std::path::PathBuf;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use config::GameConfig;
use error::Result;
use sim::event::GameEvent;
use sim::level::{self, LevelSource};
use sim::runner::{run_session, FrameSink, SystemClock};
use sim::save::{self, SavedState, ScoreTable, StateStore};
use sim::world::{Outcome, Session, SessionResult, Snapshot};
use ui::gamepad::GamepadState;
use ui::input::{MenuKey, TerminalInput};
use ui::renderer::{LandingView, Renderer, ResultView};
use ui::sound::SoundEngine;

/// Entries shown on the landing screen.
const LANDING_SCORES: usize = 10;

fn main() {
    init_logging();

    let config = GameConfig::load();
    let sources = level::level_sources(&config.levels_dir);
    let requested = std::env::var("LEVEL").ok();
    let first = level::initial_level(&sources, requested.as_deref());

    let mut renderer = Renderer::new(config.speed.blink_time);
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let sound = SoundEngine::new();
    let mut app = App {
        input: TerminalInput::new(GamepadState::new(&config.gamepad)),
        renderer,
        sound,
        state: StateStore::new(save::resolve(&config.state_file)),
        scores: ScoreTable::new(save::resolve(&config.scores_file)),
        rng: match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        },
        sources,
        first,
        config,
        best: 0,
    };

    let result = app.run();

    if let Err(e) = app.renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    if let Err(e) = result {
        eprintln!("Game error: {e}");
    }

    println!();
    println!("Thanks for playing Cman!");
    println!("Best Score: {}", app.best);
}

/// Log to a file, and only when `RUST_LOG` is set: the terminal belongs to the game.
fn init_logging() {
    if std::env::var_os("RUST_LOG").is_none() {
        return;
    }
    let path = std::env::var_os("CMAN_LOG_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("cman.log"));
    let file = match std::fs::OpenOptions::new().create(true).append(true).open(&path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Cannot open log file {}: {e}", path.display());
            return;
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .init();
}

// ══════════════════════════════════════════════════════════════
// Presentation sink
// ══════════════════════════════════════════════════════════════

/// Routes session output to the terminal and the speaker.
struct Presenter<'a> {
    renderer: &'a mut Renderer,
    sound: Option<&'a SoundEngine>,
}

impl FrameSink for Presenter<'_> {
    fn present(&mut self, frame: &Snapshot<'_>) -> std::io::Result<()> {
        self.renderer.render_game(frame)
    }

    fn events(&mut self, events: &[GameEvent]) {
        for event in events {
            match event {
                GameEvent::PelletEaten { .. } => {}
                _ => debug!(?event, "game event"),
            }
        }
        if let Some(sfx) = self.sound {
            sfx.on_events(events);
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Application flow
// ══════════════════════════════════════════════════════════════

enum LandingChoice {
    Start,
    Continue(SavedState),
    Quit,
}

/// What the player picked on the result screen.
enum ResultChoice {
    Next,
    Quit,
}

struct App {
    config: GameConfig,
    sources: Vec<LevelSource>,
    first: usize,
    input: TerminalInput,
    renderer: Renderer,
    sound: Option<SoundEngine>,
    state: StateStore,
    scores: ScoreTable,
    rng: ChaCha8Rng,
    best: u32,
}

impl App {
    fn run(&mut self) -> Result<()> {
        loop {
            let quit = match self.landing()? {
                LandingChoice::Quit => return Ok(()),
                LandingChoice::Start => {
                    let lives = self.config.rules.lives_start;
                    self.play_run(self.first, 0, lives)?
                }
                LandingChoice::Continue(saved) => {
                    info!(level = saved.level, score = saved.score, lives = saved.lives, "continuing saved run");
                    let start = saved.level % self.sources.len();
                    self.play_run(start, saved.score, saved.lives)?
                }
            };
            if quit {
                return Ok(());
            }
        }
    }

    fn landing(&mut self) -> Result<LandingChoice> {
        loop {
            let saved = self.state.load();
            let scores = self.scores.top(LANDING_SCORES);
            self.renderer.render_landing(&LandingView {
                scores: &scores,
                can_continue: saved.is_some(),
                levels: self.sources.len(),
                gamepad: self.input.gamepad_connected(),
            })?;

            match self.input.read_menu_key()? {
                MenuKey::Enter => return Ok(LandingChoice::Start),
                MenuKey::Char('c' | 'C') => {
                    if let Some(st) = saved {
                        return Ok(LandingChoice::Continue(st));
                    }
                }
                MenuKey::Char('q' | 'Q') | MenuKey::Back => return Ok(LandingChoice::Quit),
                _ => {}
            }
        }
    }

    /// Play levels from `index` until the run ends. Returns true when the
    /// player asked to leave the program.
    fn play_run(&mut self, mut index: usize, mut score: u32, mut lives: i32) -> Result<bool> {
        loop {
            let level = level::load(&self.sources[index])?;
            info!(level = %level.name, index, "level loaded");

            let rng = ChaCha8Rng::seed_from_u64(self.rng.gen());
            let mut session = Session::new(&level, self.config.speed.clone(), self.config.rules.clone(), rng)
                .with_carry_over(score, lives);

            let result = {
                let mut sink = Presenter { renderer: &mut self.renderer, sound: self.sound.as_ref() };
                run_session(&mut session, &mut self.input, &mut sink, &mut SystemClock::new())
            };
            self.best = self.best.max(result.score);
            score = result.score;
            lives = result.lives;

            let has_next = index + 1 < self.sources.len();
            match result.outcome {
                Outcome::Won => {
                    if has_next {
                        let next = SavedState { score, lives, level: index + 1 };
                        if let Err(e) = self.state.save(&next) {
                            warn!(error = %e, "could not save run state");
                        }
                    } else {
                        info!(score, "all levels completed");
                        self.state.clear();
                        self.record_high_score(&level.name, &result)?;
                    }
                }
                Outcome::Lost => {
                    self.state.clear();
                    self.record_high_score(&level.name, &result)?;
                }
                Outcome::Quit => {}
            }

            match self.result_screen(&level.name, &result, has_next)? {
                ResultChoice::Quit => return Ok(true),
                ResultChoice::Next if result.outcome == Outcome::Won && has_next => index += 1,
                ResultChoice::Next => return Ok(false),
            }
        }
    }

    /// Initials entry when `result` makes the table.
    fn record_high_score(&mut self, title: &str, result: &SessionResult) -> Result<()> {
        if result.score == 0 || !self.scores.is_high_score(result.score) {
            return Ok(());
        }
        let mut initials = String::new();
        loop {
            self.renderer.render_result(&ResultView {
                title,
                outcome: result.outcome,
                score: result.score,
                lives: result.lives,
                has_next: false,
                initials: Some(initials.as_str()),
            })?;
            match self.input.read_menu_key()? {
                MenuKey::Enter | MenuKey::Back => break,
                MenuKey::Backspace => {
                    initials.pop();
                }
                MenuKey::Char(c) if c.is_ascii_alphanumeric() && initials.len() < 3 => {
                    initials.push(c.to_ascii_uppercase());
                }
                MenuKey::Char(_) => {}
            }
        }
        match self.scores.add(result.score, &initials) {
            Ok(kept) => info!(score = result.score, kept, "high score recorded"),
            Err(e) => warn!(error = %e, "could not save high score"),
        }
        Ok(())
    }

    fn result_screen(&mut self, title: &str, result: &SessionResult, has_next: bool) -> Result<ResultChoice> {
        loop {
            self.renderer.render_result(&ResultView {
                title,
                outcome: result.outcome,
                score: result.score,
                lives: result.lives,
                has_next,
                initials: None,
            })?;
            match self.input.read_menu_key()? {
                MenuKey::Enter => return Ok(ResultChoice::Next),
                MenuKey::Char('q' | 'Q') => return Ok(ResultChoice::Quit),
                // Any key leaves the goodbye screen.
                _ if result.outcome == Outcome::Quit => return Ok(ResultChoice::Next),
                _ => {}
            }
        }
    }
}
