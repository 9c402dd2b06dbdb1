/// Keyboard (and gamepad) input.
///
/// During play the terminal is drained once per tick and folded into a
/// single abstract `Command`:
///
///   Quit (Q / Esc / Ctrl-C)  >  Pause (P)  >  last movement key seen
///
/// Movement is latched by the simulation (`Player::want`), so a single
/// press is enough; held keys simply repeat. Release events (reported on
/// terminals with keyboard enhancement) are ignored.
///
/// Menus read raw `MenuKey`s instead, blocking until one arrives.

use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::domain::entity::Command;
use crate::sim::runner::CommandSource;
use super::gamepad::GamepadState;

/// How long a blocking wait sleeps in the terminal before checking the gamepad.
const WAIT_SLICE: Duration = Duration::from_millis(50);

// ── Key Constants ──

const KEYS_LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
const KEYS_RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
const KEYS_UP: &[KeyCode] = &[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')];
const KEYS_DOWN: &[KeyCode] = &[KeyCode::Down, KeyCode::Char('s'), KeyCode::Char('S')];
const KEYS_PAUSE: &[KeyCode] = &[KeyCode::Char('p'), KeyCode::Char('P')];
const KEYS_QUIT: &[KeyCode] = &[KeyCode::Esc, KeyCode::Char('q'), KeyCode::Char('Q')];

fn is_ctrl_c(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
}

/// Map one key press to a game command.
pub fn map_key(key: &KeyEvent) -> Command {
    if key.kind == KeyEventKind::Release {
        return Command::None;
    }
    let code = key.code;
    if is_ctrl_c(key) || KEYS_QUIT.contains(&code) {
        Command::Quit
    } else if KEYS_PAUSE.contains(&code) {
        Command::Pause
    } else if KEYS_UP.contains(&code) {
        Command::MoveUp
    } else if KEYS_DOWN.contains(&code) {
        Command::MoveDown
    } else if KEYS_LEFT.contains(&code) {
        Command::MoveLeft
    } else if KEYS_RIGHT.contains(&code) {
        Command::MoveRight
    } else {
        Command::None
    }
}

/// Fold one tick's worth of commands: quit wins, then pause, then the
/// most recent movement.
pub fn merge(acc: Command, next: Command) -> Command {
    match (acc, next) {
        (Command::Quit, _) | (_, Command::Quit) => Command::Quit,
        (Command::Pause, _) | (_, Command::Pause) => Command::Pause,
        (acc, Command::None) => acc,
        (_, next) => next,
    }
}

/// A key as seen by the landing, result and initials screens.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuKey {
    Enter,
    Back,
    Backspace,
    Char(char),
}

pub fn map_menu_key(key: &KeyEvent) -> Option<MenuKey> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    if is_ctrl_c(key) {
        return Some(MenuKey::Back);
    }
    match key.code {
        KeyCode::Enter => Some(MenuKey::Enter),
        KeyCode::Esc => Some(MenuKey::Back),
        KeyCode::Backspace => Some(MenuKey::Backspace),
        KeyCode::Char(c) => Some(MenuKey::Char(c)),
        _ => None,
    }
}

pub struct TerminalInput {
    gamepad: GamepadState,
}

impl TerminalInput {
    pub fn new(gamepad: GamepadState) -> Self {
        TerminalInput { gamepad }
    }

    pub fn gamepad_connected(&self) -> bool {
        self.gamepad.connected
    }

    /// Block until a menu key (or gamepad confirm / quit) arrives.
    pub fn read_menu_key(&mut self) -> std::io::Result<MenuKey> {
        // Drop anything typed during play.
        while event::poll(Duration::ZERO)? {
            event::read()?;
        }
        loop {
            self.gamepad.update();
            if self.gamepad.confirm_pressed() {
                return Ok(MenuKey::Enter);
            }
            if self.gamepad.quit_pressed() {
                return Ok(MenuKey::Back);
            }
            if event::poll(WAIT_SLICE)? {
                if let Event::Key(key) = event::read()? {
                    if let Some(k) = map_menu_key(&key) {
                        return Ok(k);
                    }
                }
            }
        }
    }

    fn drain_keys(&mut self) -> Command {
        let mut cmd = Command::None;
        // A dead terminal reads as quit so the session can end cleanly.
        loop {
            match event::poll(Duration::ZERO) {
                Ok(true) => match event::read() {
                    Ok(Event::Key(key)) => cmd = merge(cmd, map_key(&key)),
                    Ok(_) => {}
                    Err(_) => return Command::Quit,
                },
                Ok(false) => return cmd,
                Err(_) => return Command::Quit,
            }
        }
    }
}

impl CommandSource for TerminalInput {
    fn poll(&mut self) -> Command {
        self.gamepad.update();
        let keys = self.drain_keys();
        merge(self.gamepad.command(), keys)
    }

    fn wait(&mut self) -> Command {
        loop {
            self.gamepad.update();
            let pad = self.gamepad.command();
            if matches!(pad, Command::Quit | Command::Pause) {
                return pad;
            }
            match event::poll(WAIT_SLICE) {
                Ok(true) => match event::read() {
                    Ok(Event::Key(key)) => {
                        let cmd = map_key(&key);
                        if cmd != Command::None {
                            return cmd;
                        }
                    }
                    Ok(_) => {}
                    Err(_) => return Command::Quit,
                },
                Ok(false) => {}
                Err(_) => return Command::Quit,
            }
        }
    }
}
