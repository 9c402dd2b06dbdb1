/// Session driver: frame pacing, the pause suspension point, quit.
///
/// The driver talks to the outside world through three seams so it runs
/// the same against a terminal or a test script:
///
///   - `CommandSource` — one abstract command per tick, plus a blocking
///                       read used only while paused.
///   - `FrameSink`     — receives events and a snapshot after every tick.
///   - `Clock`         — monotonic time and sleeping.
///
/// ## Pacing
///
/// Each iteration measures elapsed time; if less than one tick interval
/// has passed it sleeps for the remainder. An overrun simply yields a
/// larger `dt` next tick. There is no fixed-step catch-up.
///
/// After a pause or a non-fatal capture the time reference is reset, so
/// the next `dt` never includes the time spent waiting.

use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::domain::entity::Command;
use super::event::GameEvent;
use super::step::step;
use super::world::{Outcome, Session, SessionResult, SessionState, Snapshot};

pub trait CommandSource {
    /// Next pending command without blocking; `Command::None` if idle.
    fn poll(&mut self) -> Command;
    /// Block until a command arrives.
    fn wait(&mut self) -> Command;
}

pub trait FrameSink {
    fn present(&mut self, frame: &Snapshot<'_>) -> std::io::Result<()>;
    fn events(&mut self, events: &[GameEvent]);
}

pub trait Clock {
    /// Monotonic time since an arbitrary origin.
    fn now(&self) -> Duration;
    fn sleep(&mut self, d: Duration);
}

/// Wall clock backed by `Instant`.
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        SystemClock { origin: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&mut self, d: Duration) {
        std::thread::sleep(d);
    }
}

// ══════════════════════════════════════════════════════════════
// Main loop
// ══════════════════════════════════════════════════════════════

/// Play `session` until it is won, lost or the player quits.
pub fn run_session<I, S, C>(session: &mut Session, input: &mut I, sink: &mut S, clock: &mut C) -> SessionResult
where
    I: CommandSource + ?Sized,
    S: FrameSink + ?Sized,
    C: Clock + ?Sized,
{
    let interval = Duration::from_secs_f64(session.speed.tick_interval());
    let death_pause = Duration::from_millis(session.speed.death_pause_ms);

    info!(
        level = %session.title,
        score = session.player.score,
        lives = session.player.lives,
        ghosts = session.ghosts.len(),
        "session start"
    );
    present(sink, session);

    let mut last = clock.now();
    loop {
        let mut now = clock.now();
        let elapsed = now.saturating_sub(last);
        if elapsed < interval {
            clock.sleep(interval - elapsed);
            now = clock.now();
        }
        let dt = now.saturating_sub(last).as_secs_f64();
        last = now;

        let cmd = input.poll();
        if cmd == Command::Quit {
            return finish(session, Outcome::Quit);
        }

        let events = step(session, cmd, dt);
        if !events.is_empty() {
            sink.events(&events);
        }
        present(sink, session);

        if let Some(outcome) = session.outcome() {
            return finish(session, outcome);
        }

        if events.iter().any(|e| matches!(e, GameEvent::PlayerCaught { .. })) {
            clock.sleep(death_pause);
            last = clock.now();
        }

        if session.state == SessionState::Paused {
            if wait_while_paused(session, input, sink) {
                return finish(session, Outcome::Quit);
            }
            last = clock.now();
        }
    }
}

/// Block on the input source until resume or quit. Returns true on quit.
fn wait_while_paused<I, S>(session: &mut Session, input: &mut I, sink: &mut S) -> bool
where
    I: CommandSource + ?Sized,
    S: FrameSink + ?Sized,
{
    loop {
        match input.wait() {
            Command::Quit => return true,
            Command::Pause => {
                let events = step(session, Command::Pause, 0.0);
                sink.events(&events);
                present(sink, session);
                return false;
            }
            _ => {}
        }
    }
}

fn present<S: FrameSink + ?Sized>(sink: &mut S, session: &Session) {
    if let Err(e) = sink.present(&session.snapshot()) {
        warn!(error = %e, "frame present failed");
    }
}

fn finish(session: &Session, outcome: Outcome) -> SessionResult {
    let result = session.result(outcome);
    info!(outcome = ?result.outcome, score = result.score, lives = result.lives, "session end");
    result
}
