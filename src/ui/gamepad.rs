/// Gamepad input tracker using gilrs.
///
/// Button mapping comes from `[gamepad]` in config.toml.
/// Default mapping:
///   D-pad / Left Stick    →  Movement
///   Start                 →  Pause / Resume
///   Select                →  Quit
///   A                     →  Confirm (menus)
///
/// Without the `gamepad` feature this is a tracker that never sees input.

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, EventType, Gilrs};

use crate::config::GamepadConfig;
use crate::domain::entity::Command;

const STICK_DEADZONE: f32 = 0.25;

/// Logical button identifiers (one per physical button).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Btn {
    A,       // South
    B,       // East
    X,       // West
    Y,       // North
    L1,
    R1,
    Start,
    Select,
}

const BTN_COUNT: usize = 8;

impl Btn {
    fn from_name(s: &str) -> Option<Btn> {
        match s.to_uppercase().as_str() {
            "A" | "SOUTH"  => Some(Btn::A),
            "B" | "EAST"   => Some(Btn::B),
            "X" | "WEST"   => Some(Btn::X),
            "Y" | "NORTH"  => Some(Btn::Y),
            "L1" | "LB" | "LEFTTRIGGER"  => Some(Btn::L1),
            "R1" | "RB" | "RIGHTTRIGGER" => Some(Btn::R1),
            "START" => Some(Btn::Start),
            "SELECT" | "BACK" => Some(Btn::Select),
            _ => None,
        }
    }

    #[cfg(feature = "gamepad")]
    fn from_gilrs(btn: Button) -> Option<Btn> {
        match btn {
            Button::South     => Some(Btn::A),
            Button::East      => Some(Btn::B),
            Button::West      => Some(Btn::X),
            Button::North     => Some(Btn::Y),
            Button::LeftTrigger  => Some(Btn::L1),
            Button::RightTrigger => Some(Btn::R1),
            Button::Start     => Some(Btn::Start),
            Button::Select    => Some(Btn::Select),
            _ => None,
        }
    }
}

/// Per-button edge flag, set on press and cleared by the next update.
#[derive(Clone, Copy, Debug, Default)]
struct BtnState {
    just_pressed: bool,
}

/// Action-to-button mapping.
#[derive(Debug, PartialEq)]
struct ActionMap {
    pause: Vec<Btn>,
    quit: Vec<Btn>,
    confirm: Vec<Btn>,
}

impl Default for ActionMap {
    fn default() -> Self {
        ActionMap {
            pause:   vec![Btn::Start],
            quit:    vec![Btn::Select],
            confirm: vec![Btn::A],
        }
    }
}

impl ActionMap {
    /// Unknown names are dropped; an entry that ends up empty keeps its default.
    fn from_config(cfg: &GamepadConfig) -> Self {
        fn parse_list(names: &[String]) -> Vec<Btn> {
            names.iter().filter_map(|s| Btn::from_name(s)).collect()
        }
        let mut map = ActionMap::default();
        let p = parse_list(&cfg.pause);
        if !p.is_empty() { map.pause = p; }
        let q = parse_list(&cfg.quit);
        if !q.is_empty() { map.quit = q; }
        let c = parse_list(&cfg.confirm);
        if !c.is_empty() { map.confirm = c; }
        map
    }
}

pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,

    buttons: [BtnState; BTN_COUNT],

    // D-pad
    dpad_up: bool,
    dpad_down: bool,
    dpad_left: bool,
    dpad_right: bool,

    // Stick
    stick_x: f32,
    stick_y: f32,

    action_map: ActionMap,

    pub connected: bool,
}

fn btn_index(btn: Btn) -> usize {
    btn as usize
}

impl GamepadState {
    pub fn new(cfg: &GamepadConfig) -> Self {
        #[cfg(feature = "gamepad")]
        let (gilrs_opt, connected) = match Gilrs::new() {
            Ok(g) => {
                let has_pad = g.gamepads().next().is_some();
                (Some(g), has_pad)
            }
            Err(e) => {
                tracing::warn!(error = %e, "gamepad support unavailable");
                (None, false)
            }
        };
        #[cfg(not(feature = "gamepad"))]
        let connected = false;

        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs: gilrs_opt,
            buttons: [BtnState::default(); BTN_COUNT],
            dpad_up: false,
            dpad_down: false,
            dpad_left: false,
            dpad_right: false,
            stick_x: 0.0,
            stick_y: 0.0,
            action_map: ActionMap::from_config(cfg),
            connected,
        }
    }

    /// Pull pending gamepad events. Edge flags only last until the next update.
    pub fn update(&mut self) {
        for b in &mut self.buttons {
            b.just_pressed = false;
        }

        #[cfg(feature = "gamepad")]
        self.poll_gilrs();
    }

    #[cfg(feature = "gamepad")]
    fn poll_gilrs(&mut self) {
        let gilrs = match &mut self.gilrs {
            Some(g) => g,
            None => return,
        };

        let events: Vec<_> = std::iter::from_fn(|| gilrs.next_event()).collect();

        for event in events {
            match event.event {
                EventType::ButtonPressed(btn, _) => {
                    self.connected = true;
                    self.set_button(btn, true);
                }
                EventType::ButtonReleased(btn, _) => {
                    self.connected = true;
                    self.set_button(btn, false);
                }
                EventType::AxisChanged(axis, value, _) => {
                    self.connected = true;
                    match axis {
                        Axis::LeftStickX => self.stick_x = value,
                        Axis::LeftStickY => self.stick_y = value,
                        _ => {}
                    }
                }
                EventType::Connected => { self.connected = true; }
                EventType::Disconnected => {
                    self.connected = false;
                    self.release_all();
                }
                _ => {}
            }
        }
    }

    #[cfg(feature = "gamepad")]
    fn set_button(&mut self, gilrs_btn: Button, held: bool) {
        match gilrs_btn {
            Button::DPadUp    => { self.dpad_up = held; return; }
            Button::DPadDown  => { self.dpad_down = held; return; }
            Button::DPadLeft  => { self.dpad_left = held; return; }
            Button::DPadRight => { self.dpad_right = held; return; }
            _ => {}
        }

        if let Some(btn) = Btn::from_gilrs(gilrs_btn) {
            if held {
                self.buttons[btn_index(btn)].just_pressed = true;
            }
        }
    }

    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    fn release_all(&mut self) {
        self.buttons = [BtnState::default(); BTN_COUNT];
        self.dpad_up = false;
        self.dpad_down = false;
        self.dpad_left = false;
        self.dpad_right = false;
        self.stick_x = 0.0;
        self.stick_y = 0.0;
    }

    // ── Action queries ──

    fn any_just_pressed(&self, btns: &[Btn]) -> bool {
        btns.iter().any(|&b| self.buttons[btn_index(b)].just_pressed)
    }

    pub fn confirm_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.confirm)
    }

    pub fn quit_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.quit)
    }

    /// Held direction from the D-pad, falling back to the stick.
    fn held_move(&self) -> Command {
        if self.dpad_up || self.stick_y > STICK_DEADZONE {
            Command::MoveUp
        } else if self.dpad_down || self.stick_y < -STICK_DEADZONE {
            Command::MoveDown
        } else if self.dpad_left || self.stick_x < -STICK_DEADZONE {
            Command::MoveLeft
        } else if self.dpad_right || self.stick_x > STICK_DEADZONE {
            Command::MoveRight
        } else {
            Command::None
        }
    }

    /// This update's command: quit, then pause, then any held direction.
    pub fn command(&self) -> Command {
        if self.quit_pressed() {
            Command::Quit
        } else if self.any_just_pressed(&self.action_map.pause) {
            Command::Pause
        } else {
            self.held_move()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(pause: &[&str], quit: &[&str], confirm: &[&str]) -> GamepadConfig {
        let list = |v: &[&str]| v.iter().map(|s| s.to_string()).collect();
        GamepadConfig { pause: list(pause), quit: list(quit), confirm: list(confirm) }
    }

    fn press(gp: &mut GamepadState, btn: Btn) {
        gp.buttons[btn_index(btn)] = BtnState { just_pressed: true };
    }

    #[test]
    fn button_names_are_case_insensitive() {
        assert_eq!(Btn::from_name("start"), Some(Btn::Start));
        assert_eq!(Btn::from_name("Back"), Some(Btn::Select));
        assert_eq!(Btn::from_name("south"), Some(Btn::A));
        assert_eq!(Btn::from_name("turbo"), None);
    }

    #[test]
    fn empty_or_unknown_lists_keep_defaults() {
        let map = ActionMap::from_config(&cfg(&["bogus"], &[], &["B", "x"]));
        assert_eq!(map.pause, vec![Btn::Start]);
        assert_eq!(map.quit, vec![Btn::Select]);
        assert_eq!(map.confirm, vec![Btn::B, Btn::X]);
    }

    #[test]
    fn quit_beats_pause_beats_movement() {
        let mut gp = GamepadState::new(&cfg(&["Start"], &["Select"], &["A"]));
        assert_eq!(gp.command(), Command::None);
        gp.dpad_left = true;
        assert_eq!(gp.command(), Command::MoveLeft);
        press(&mut gp, Btn::Start);
        assert_eq!(gp.command(), Command::Pause);
        press(&mut gp, Btn::Select);
        assert_eq!(gp.command(), Command::Quit);
    }

    #[test]
    fn stick_respects_deadzone() {
        let mut gp = GamepadState::new(&cfg(&[], &[], &[]));
        gp.stick_x = 0.2;
        assert_eq!(gp.command(), Command::None);
        gp.stick_x = 0.8;
        assert_eq!(gp.command(), Command::MoveRight);
        gp.stick_y = -0.9;
        assert_eq!(gp.command(), Command::MoveDown);
    }

    #[test]
    fn edges_clear_on_update() {
        let mut gp = GamepadState::new(&cfg(&[], &[], &[]));
        press(&mut gp, Btn::A);
        assert!(gp.confirm_pressed());
        gp.update();
        assert!(!gp.confirm_pressed());
    }
}
