/// Keyboard input.
///
/// Every frame the pending terminal events are drained into a queue of key
/// presses. Turn-based play wants each press exactly once, so there is no
/// held-key tracking: a Press or auto-Repeat is one action, Release is ignored.
/// Screens that wait for "any key" only react to a fresh Press, so a held
/// arrow repeating out of the last move does not skip them.
///
/// Key bindings live here too, so the main loop only sees commands.

use std::time::Duration;

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::domain::direction::Direction;
use crate::sim::session::Command;

pub struct InputState {
    /// Presses collected during the most recent drain_events() call, in order.
    presses: Vec<KeyEvent>,
}

impl InputState {
    pub fn new() -> Self {
        InputState { presses: Vec::with_capacity(8) }
    }

    /// Drain all pending terminal events without blocking.
    /// Call this once per frame.
    pub fn drain_events(&mut self) {
        self.presses.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                if key.kind != KeyEventKind::Release {
                    self.presses.push(key);
                }
            }
        }
    }

    pub fn presses(&self) -> &[KeyEvent] {
        &self.presses
    }

    /// Check if any press this frame is Ctrl+C
    pub fn ctrl_c_pressed(&self) -> bool {
        self.presses.iter().any(|k| is_ctrl_c(k))
    }
}

pub fn is_ctrl_c(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
}

/// A deliberate key press, not an auto-repeat of a held key.
pub fn dismisses_screen(key: &KeyEvent) -> bool {
    key.kind == KeyEventKind::Press
}

// ══════════════════════════════════════════════════════════════
// Bindings
// ══════════════════════════════════════════════════════════════

/// In-game binding: arrows or WASD move, `r` undoes, `q` quits.
pub fn game_command(key: &KeyEvent) -> Option<Command> {
    if key.modifiers.contains(KeyModifiers::CONTROL) { return None; }
    let cmd = match key.code {
        KeyCode::Up | KeyCode::Char('w') | KeyCode::Char('W') => Command::Move(Direction::Up),
        KeyCode::Down | KeyCode::Char('s') | KeyCode::Char('S') => Command::Move(Direction::Down),
        KeyCode::Left | KeyCode::Char('a') | KeyCode::Char('A') => Command::Move(Direction::Left),
        KeyCode::Right | KeyCode::Char('d') | KeyCode::Char('D') => Command::Move(Direction::Right),
        KeyCode::Char('r') | KeyCode::Char('R') => Command::Undo,
        KeyCode::Char('q') | KeyCode::Char('Q') => Command::Quit,
        _ => return None,
    };
    Some(cmd)
}

/// What a key does in the name prompt.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TextEdit {
    Insert(char),
    Backspace,
    Submit,
    Cancel,
}

pub fn text_edit(key: &KeyEvent) -> Option<TextEdit> {
    match key.code {
        KeyCode::Enter => Some(TextEdit::Submit),
        KeyCode::Esc => Some(TextEdit::Cancel),
        KeyCode::Backspace => Some(TextEdit::Backspace),
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(TextEdit::Insert(c))
        }
        _ => None,
    }
}
