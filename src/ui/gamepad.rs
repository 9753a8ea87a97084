/// Gamepad input using gilrs.
///
/// Button mapping comes from the `[gamepad]` section of config.toml.
/// Default mapping:
///   D-pad / Left Stick    →  Swipe (menu: move highlight)
///   B                     →  Undo
///   A / Start             →  Confirm
///   Select                →  Quit
///
/// Every query is edge-triggered: a swipe fires once per push of the pad.

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, EventType, Gilrs};

use crate::config::GamepadConfig;
use crate::domain::direction::Direction;

#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
const STICK_DEADZONE: f32 = 0.5;

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
            "A" | "SOUTH" => Some(Btn::A),
            "B" | "EAST"  => Some(Btn::B),
            "X" | "WEST"  => Some(Btn::X),
            "Y" | "NORTH" => Some(Btn::Y),
            "L1" | "LB"   => Some(Btn::L1),
            "R1" | "RB"   => Some(Btn::R1),
            "START" => Some(Btn::Start),
            "SELECT" | "BACK" => Some(Btn::Select),
            _ => None,
        }
    }

    #[cfg(feature = "gamepad")]
    fn from_gilrs(btn: Button) -> Option<Btn> {
        match btn {
            Button::South => Some(Btn::A),
            Button::East  => Some(Btn::B),
            Button::West  => Some(Btn::X),
            Button::North => Some(Btn::Y),
            Button::LeftTrigger  => Some(Btn::L1),
            Button::RightTrigger => Some(Btn::R1),
            Button::Start  => Some(Btn::Start),
            Button::Select => Some(Btn::Select),
            _ => None,
        }
    }
}

fn direction_index(dir: Direction) -> usize {
    match dir {
        Direction::Up => 0,
        Direction::Down => 1,
        Direction::Left => 2,
        Direction::Right => 3,
    }
}

/// Per-input state: held and just_pressed (edge).
#[derive(Clone, Copy, Debug, Default)]
struct BtnState {
    held: bool,
    just_pressed: bool,
}

impl BtnState {
    fn set(&mut self, held: bool) {
        if held && !self.held { self.just_pressed = true; }
        self.held = held;
    }
}

/// Action-to-button mapping.
#[derive(Debug, PartialEq)]
struct ActionMap {
    undo: Vec<Btn>,
    quit: Vec<Btn>,
    confirm: Vec<Btn>,
}

impl Default for ActionMap {
    fn default() -> Self {
        ActionMap {
            undo:    vec![Btn::B],
            quit:    vec![Btn::Select],
            confirm: vec![Btn::A, Btn::Start],
        }
    }
}

impl ActionMap {
    /// Unknown names are skipped; a list with nothing usable keeps the default.
    fn from_config(cfg: &GamepadConfig) -> Self {
        fn parse_list(names: &[String], fallback: Vec<Btn>) -> Vec<Btn> {
            let parsed: Vec<Btn> = names.iter().filter_map(|s| Btn::from_name(s)).collect();
            if parsed.is_empty() { fallback } else { parsed }
        }
        let d = ActionMap::default();
        ActionMap {
            undo: parse_list(&cfg.undo, d.undo),
            quit: parse_list(&cfg.quit, d.quit),
            confirm: parse_list(&cfg.confirm, d.confirm),
        }
    }
}

pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,

    buttons: [BtnState; BTN_COUNT],
    /// D-pad, indexed by direction_index
    dpad: [BtnState; 4],
    /// Left stick folded to four digital directions
    stick: [BtnState; 4],
    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    stick_x: f32,
    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    stick_y: f32,

    action_map: ActionMap,

    pub connected: bool,
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
                log::info!("gamepad support unavailable: {e}");
                (None, false)
            }
        };
        #[cfg(not(feature = "gamepad"))]
        let connected = false;

        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs: gilrs_opt,
            buttons: [BtnState::default(); BTN_COUNT],
            dpad: [BtnState::default(); 4],
            stick: [BtnState::default(); 4],
            stick_x: 0.0,
            stick_y: 0.0,
            action_map: ActionMap::from_config(cfg),
            connected,
        }
    }

    /// Call once per frame, before reading any action.
    pub fn update(&mut self) {
        self.clear_just_pressed();

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

        let (x, y) = (self.stick_x, self.stick_y);
        self.stick[direction_index(Direction::Up)].set(y > STICK_DEADZONE);
        self.stick[direction_index(Direction::Down)].set(y < -STICK_DEADZONE);
        self.stick[direction_index(Direction::Left)].set(x < -STICK_DEADZONE);
        self.stick[direction_index(Direction::Right)].set(x > STICK_DEADZONE);
    }

    #[cfg(feature = "gamepad")]
    fn set_button(&mut self, gilrs_btn: Button, held: bool) {
        let dpad = match gilrs_btn {
            Button::DPadUp => Some(Direction::Up),
            Button::DPadDown => Some(Direction::Down),
            Button::DPadLeft => Some(Direction::Left),
            Button::DPadRight => Some(Direction::Right),
            _ => None,
        };
        if let Some(dir) = dpad {
            self.dpad[direction_index(dir)].set(held);
        } else if let Some(btn) = Btn::from_gilrs(gilrs_btn) {
            self.buttons[btn as usize].set(held);
        }
    }

    // ── Action queries ──

    fn any_just_pressed(&self, btns: &[Btn]) -> bool {
        btns.iter().any(|&b| self.buttons[b as usize].just_pressed)
    }

    pub fn undo_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.undo)
    }
    pub fn quit_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.quit)
    }
    pub fn confirm_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.confirm)
    }

    /// First direction pushed this frame on the d-pad or stick.
    pub fn direction_pressed(&self) -> Option<Direction> {
        Direction::ALL.into_iter().find(|&d| {
            let i = direction_index(d);
            self.dpad[i].just_pressed || self.stick[i].just_pressed
        })
    }

    // ── Internal ──

    fn clear_just_pressed(&mut self) {
        for b in self.buttons.iter_mut().chain(&mut self.dpad).chain(&mut self.stick) {
            b.just_pressed = false;
        }
    }

    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    fn release_all(&mut self) {
        self.buttons = [BtnState::default(); BTN_COUNT];
        self.dpad = [BtnState::default(); 4];
        self.stick = [BtnState::default(); 4];
        self.stick_x = 0.0;
        self.stick_y = 0.0;
    }
}
