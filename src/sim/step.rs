/// The step function: advances a session by one tick of `dt` seconds.
///
/// Processing order:
///   1. Command (pause toggle, steering request)
///   2. Player timers (shield, power)
///   3. Player steering + movement, Idle → Running on first motion
///   4. Pickups + scoring
///   5. Collisions (may send everyone home, or end the session)
///   6. Ghost movement                       [Running only]
///   7. Frightened timers                    [Running only]
///   8. Win check
///
/// Frightened timers decay after collisions so that a power pellet eaten
/// this tick is already in effect when the player touches a ghost.
/// Quit is not handled here: the driver ends the loop before stepping.

use tracing::debug;

use crate::domain::entity::Command;
use crate::domain::physics;
use crate::domain::pickup::Pickup;
use crate::domain::rules::{self, Caught};
use super::event::GameEvent;
use super::world::{Session, SessionState};

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(session: &mut Session, cmd: Command, dt: f64) -> Vec<GameEvent> {
    let mut events: Vec<GameEvent> = Vec::new();
    if session.state.is_terminal() {
        return events;
    }

    if resolve_command(session, cmd, &mut events) {
        return events;
    }
    if session.state == SessionState::Paused {
        return events;
    }

    resolve_player_timers(session, dt);
    resolve_player_movement(session, dt, &mut events);
    resolve_pickups(session, &mut events);
    if resolve_collisions(session, &mut events) {
        return events;
    }
    if session.state == SessionState::Running {
        resolve_ghost_movement(session, dt);
        resolve_frightened(session, dt);
    }
    resolve_win(session, &mut events);

    events
}

// ══════════════════════════════════════════════════════════════
// Input
// ══════════════════════════════════════════════════════════════

/// Returns true if the command consumed the tick (pause toggled).
fn resolve_command(session: &mut Session, cmd: Command, events: &mut Vec<GameEvent>) -> bool {
    match cmd {
        Command::Pause => {
            if session.state == SessionState::Paused {
                session.resume();
                debug!(state = ?session.state, "resumed");
                events.push(GameEvent::Resumed);
            } else if session.pause() {
                debug!("paused");
                events.push(GameEvent::Paused);
            }
            true
        }
        other => {
            if let Some(dir) = other.direction() {
                session.player.want = dir;
            }
            false
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Player
// ══════════════════════════════════════════════════════════════

fn resolve_player_timers(session: &mut Session, dt: f64) {
    let p = &mut session.player;
    p.shield = physics::decay(p.shield, dt);
    p.power = physics::decay(p.power, dt);
}

fn resolve_player_movement(session: &mut Session, dt: f64, events: &mut Vec<GameEvent>) {
    let motion = session.speed.player_motion();
    physics::steer_player(&session.grid, &mut session.player);
    physics::move_player(&session.grid, &mut session.player, motion, dt);

    if session.state == SessionState::Idle && !session.player.dir.is_none() {
        session.state = SessionState::Running;
        debug!(dir = ?session.player.dir, "session running");
        events.push(GameEvent::Started);
    }
}

fn resolve_pickups(session: &mut Session, events: &mut Vec<GameEvent>) {
    let cell = session.player.pos.cell();
    match session.pickups.consume(cell) {
        Some(Pickup::Pellet) => {
            session.player.score += session.rules.pellet_points;
            events.push(GameEvent::pellet(cell));
        }
        Some(Pickup::Power) => {
            let t = session.speed.power_time;
            session.player.power = t;
            for g in session.ghosts.iter_mut() {
                g.frightened = t;
            }
            events.push(GameEvent::power(cell));
        }
        None => {}
    }
}

// ══════════════════════════════════════════════════════════════
// Collisions
// ══════════════════════════════════════════════════════════════

/// Returns true if the session ended.
fn resolve_collisions(session: &mut Session, events: &mut Vec<GameEvent>) -> bool {
    let capture = session.rules.capture(&session.speed);
    let outcome = rules::resolve_collisions(&mut session.player, &mut session.ghosts, &capture);
    if outcome.is_quiet() {
        return false;
    }

    for &index in &outcome.captured {
        events.push(GameEvent::GhostCaptured { index });
    }

    match outcome.caught {
        Some(Caught::GameOver) => {
            session.state = SessionState::Lost;
            debug!(score = session.player.score, "session lost");
            events.push(GameEvent::GameOver);
            true
        }
        Some(Caught::Respawn) => {
            session.state = SessionState::Idle;
            debug!(lives = session.player.lives, "player caught, back to spawn");
            events.push(GameEvent::PlayerCaught { lives: session.player.lives });
            false
        }
        None => false,
    }
}

// ══════════════════════════════════════════════════════════════
// Ghosts
// ══════════════════════════════════════════════════════════════

fn resolve_ghost_movement(session: &mut Session, dt: f64) {
    let motion = session.speed.ghost_motion();
    let target = session.player.pos.cell();
    for ghost in session.ghosts.iter_mut() {
        physics::move_ghost(&session.grid, ghost, target, motion, dt, &mut session.rng);
    }
}

fn resolve_frightened(session: &mut Session, dt: f64) {
    for g in session.ghosts.iter_mut() {
        g.frightened = physics::decay(g.frightened, dt);
    }
}

// ══════════════════════════════════════════════════════════════
// Win
// ══════════════════════════════════════════════════════════════

fn resolve_win(session: &mut Session, events: &mut Vec<GameEvent>) {
    if !session.pickups.is_empty() {
        return;
    }
    session.player.score += session.rules.level_bonus;
    session.state = SessionState::Won;
    debug!(score = session.player.score, "level cleared");
    events.push(GameEvent::LevelCleared);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::{Direction, Position};
    use crate::sim::world::tests::session_from;

    const DT: f64 = 1.0 / 30.0;

    /// Step with the same command until `done` holds, at most `limit` ticks.
    fn run_until(
        s: &mut Session,
        cmd: Command,
        limit: usize,
        mut done: impl FnMut(&Session) -> bool,
    ) -> Vec<GameEvent> {
        let mut all = vec![];
        for _ in 0..limit {
            all.extend(step(s, cmd, DT));
            if done(s) {
                break;
            }
        }
        all
    }

    #[test]
    fn idle_until_first_move() {
        let mut s = session_from(&["#######", "#C...M#", "#######"]);
        let ghost_before = s.ghosts[0].pos;
        let ev = step(&mut s, Command::None, DT);
        assert!(ev.is_empty());
        assert_eq!(s.state, SessionState::Idle);
        assert_eq!(s.ghosts[0].pos, ghost_before);

        let ev = step(&mut s, Command::MoveRight, DT);
        assert_eq!(s.state, SessionState::Running);
        assert!(ev.contains(&GameEvent::Started));
        assert_eq!(s.player.dir, Direction::Right);
    }

    #[test]
    fn idle_freezes_ghost_timers() {
        let mut s = session_from(&["#######", "#C...M#", "#######"]);
        s.ghosts[0].home_timer = 1.0;
        s.ghosts[0].frightened = 1.0;
        for _ in 0..10 {
            step(&mut s, Command::None, DT);
        }
        assert_eq!(s.ghosts[0].home_timer, 1.0);
        assert_eq!(s.ghosts[0].frightened, 1.0);
    }

    #[test]
    fn blocked_request_does_not_start_the_session() {
        let mut s = session_from(&["#####", "#C. #", "#####"]);
        step(&mut s, Command::MoveUp, DT);
        assert_eq!(s.state, SessionState::Idle);
        assert_eq!(s.player.want, Direction::Up);
    }

    #[test]
    fn pause_toggles_and_freezes_everything() {
        let mut s = session_from(&["#######", "#C...M#", "#######"]);
        step(&mut s, Command::MoveRight, DT);
        let pos = s.player.pos;
        let ev = step(&mut s, Command::Pause, DT);
        assert_eq!(ev, vec![GameEvent::Paused]);
        assert_eq!(s.state, SessionState::Paused);
        for _ in 0..5 {
            assert!(step(&mut s, Command::MoveRight, DT).is_empty());
        }
        assert_eq!(s.player.pos, pos);
        let ev = step(&mut s, Command::Pause, DT);
        assert_eq!(ev, vec![GameEvent::Resumed]);
        assert_eq!(s.state, SessionState::Running);
    }

    #[test]
    fn pellets_score_points() {
        let mut s = session_from(&["#######", "#C.. M#", "#######"]);
        s.ghosts[0].home_timer = 100.0;
        let ev = run_until(&mut s, Command::MoveRight, 30, |s| s.pickups.pellets_left() == 0);
        assert!(ev.contains(&GameEvent::PelletEaten { x: 2, y: 1 }));
        assert!(ev.contains(&GameEvent::PelletEaten { x: 3, y: 1 }));
        // Two pellets plus the level bonus.
        assert_eq!(s.state, SessionState::Won);
        assert_eq!(s.player.score, 2 + 50);
    }

    #[test]
    fn scenario_frighten() {
        // 3×3 open room, player at (1,1), ghost beside it, power at (2,2).
        let mut s = session_from(&[
            "#####",
            "#CM #",
            "# o #",
            "#   #",
            "#####",
        ]);
        s.player.shield = 5.0;
        s.ghosts[0].home_timer = 100.0;
        s.ghosts[0].frightened = 1.0;

        run_until(&mut s, Command::MoveDown, 30, |s| s.player.pos.cell().1 == 2);
        let ev = run_until(&mut s, Command::MoveRight, 30, |s| s.pickups.powers_left() == 0);
        assert!(ev.contains(&GameEvent::PowerPelletEaten { x: 2, y: 2 }));
        assert_eq!(s.player.power, s.speed.power_time);
        for g in &s.ghosts {
            // Set this tick, then decayed once at the end of it.
            assert!((g.frightened - (s.speed.power_time - DT)).abs() < 1e-9);
        }
    }

    #[test]
    fn scenario_eaten_ghost() {
        let mut s = session_from(&["#######", "#C   M#", "#  .  #", "#######"]);
        s.state = SessionState::Running;
        s.ghosts[0].pos = s.player.pos;
        s.ghosts[0].frightened = 4.0;
        let lives = s.player.lives;
        let ev = step(&mut s, Command::None, DT);
        assert!(ev.contains(&GameEvent::GhostCaptured { index: 0 }));
        assert_eq!(s.player.lives, lives);
        assert_eq!(s.player.score, 10);
        assert_eq!(s.ghosts[0].pos, Position::from_cell(s.ghosts[0].home));
        // Restarted on capture, then counted down once by ghost movement.
        assert!((s.ghosts[0].home_timer - (s.speed.home_time - DT)).abs() < 1e-9);
        assert_eq!(s.state, SessionState::Running);
    }

    #[test]
    fn power_pellet_counts_for_contact_in_the_same_tick() {
        let mut s = session_from(&["######", "#Co M#", "######"]);
        s.state = SessionState::Running;
        s.player.shield = 0.0;
        s.player.pos = Position::new(2.0, 1.0);
        s.ghosts[0].pos = Position::new(2.3, 1.0);
        let ev = step(&mut s, Command::None, DT);
        assert!(ev.contains(&GameEvent::PowerPelletEaten { x: 2, y: 1 }));
        assert!(ev.contains(&GameEvent::GhostCaptured { index: 0 }));
        assert!(!ev.iter().any(|e| matches!(e, GameEvent::PlayerCaught { .. } | GameEvent::GameOver)));
        assert_eq!(s.player.lives, 3);
        assert_eq!(s.ghosts[0].pos, Position::from_cell(s.ghosts[0].home));
    }

    #[test]
    fn scenario_win_on_last_pellet() {
        let mut s = session_from(&["######", "#C. M#", "######"]);
        s.ghosts[0].home_timer = 100.0;
        let mut ticks = 0;
        while s.pickups.pellets_left() > 0 {
            assert_ne!(s.state, SessionState::Won);
            step(&mut s, Command::MoveRight, DT);
            ticks += 1;
            assert!(ticks < 30);
        }
        assert_eq!(s.state, SessionState::Won);
        // Terminal: further steps do nothing.
        let score = s.player.score;
        assert!(step(&mut s, Command::MoveLeft, DT).is_empty());
        assert_eq!(s.player.score, score);
    }

    #[test]
    fn scenario_loss_after_last_life() {
        let mut s = session_from(&["#######", "#C . M#", "#######"]);
        let start_lives = s.player.lives;
        for n in 0..=start_lives {
            assert_ne!(s.state, SessionState::Lost, "lost early after {n} captures");
            s.state = SessionState::Running;
            s.player.shield = 0.0;
            s.ghosts[0].pos = s.player.pos;
            s.ghosts[0].home_timer = 0.0;
            let ev = step(&mut s, Command::None, DT);
            if n < start_lives {
                assert!(ev.contains(&GameEvent::PlayerCaught { lives: start_lives - n - 1 }));
                assert_eq!(s.state, SessionState::Idle);
            } else {
                assert!(ev.contains(&GameEvent::GameOver));
            }
        }
        assert_eq!(s.state, SessionState::Lost);
        assert_eq!(s.player.lives, -1);
    }

    #[test]
    fn non_fatal_capture_resets_everyone() {
        let mut s = session_from(&["########", "#C  . M#", "########"]);
        s.state = SessionState::Running;
        s.player.shield = 0.0;
        s.player.pos = Position::new(3.0, 1.0);
        s.player.dir = Direction::Right;
        s.ghosts[0].pos = Position::new(3.5, 1.0);
        step(&mut s, Command::None, DT);
        assert_eq!(s.player.pos, Position::from_cell(s.player.spawn));
        assert_eq!(s.ghosts[0].pos, Position::from_cell(s.ghosts[0].home));
        assert!(s.player.shield > 0.0);
        assert_eq!(s.player.dir, Direction::None);
        assert_eq!(s.state, SessionState::Idle);
    }

    #[test]
    fn shield_protects_after_respawn() {
        let mut s = session_from(&["#######", "#C . M#", "#######"]);
        s.state = SessionState::Running;
        s.player.shield = 0.5;
        s.ghosts[0].pos = s.player.pos;
        s.ghosts[0].home_timer = 100.0;
        let ev = step(&mut s, Command::None, DT);
        assert!(!ev.iter().any(|e| matches!(e, GameEvent::PlayerCaught { .. })));
        assert_eq!(s.player.lives, 3);
    }

    #[test]
    fn ghost_chases_once_released() {
        let mut s = session_from(&["###########", "#C   .   M#", "###########"]);
        step(&mut s, Command::MoveRight, DT);
        assert_eq!(s.state, SessionState::Running);
        let x0 = s.ghosts[0].pos.x;
        step(&mut s, Command::None, DT);
        assert_eq!(s.ghosts[0].dir, Direction::Left);
        assert!(s.ghosts[0].pos.x < x0);
    }

    #[test]
    fn seeded_sessions_replay_identically() {
        let rows = [
            "#########",
            "#C.....o#",
            "#.#.#.#.#",
            "#...M...#",
            "#.#.#.#.#",
            "#o.....M#",
            "#########",
        ];
        let mut a = session_from(&rows);
        let mut b = session_from(&rows);
        let script = [Command::MoveRight, Command::None, Command::MoveDown, Command::None];
        for i in 0..120 {
            let cmd = script[i % script.len()];
            assert_eq!(step(&mut a, cmd, DT), step(&mut b, cmd, DT));
        }
        for (ga, gb) in a.ghosts.iter().zip(&b.ghosts) {
            assert_eq!(ga.pos, gb.pos);
        }
        assert_eq!(a.player.score, b.player.score);
    }
}
