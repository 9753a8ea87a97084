/// WorldState: everything the main loop and the renderer share.
///
/// ## Phases
///
/// ```text
///   Menu ──Start──▶ Naming ──Enter──▶ Playing ──defeat / quit──▶ GameOver
///    ▲ │                │                                          │
///    │ └──Top list──▶ TopList                                      │
///    └──────────────────┴────────────── any key ◀──────────────────┘
/// ```
///
/// The session (board, undo history) only exists while `Playing` or
/// `GameOver`; returning to the menu drops it together with its history.

use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::GameConfig;
use crate::domain::board::Grid;
use super::event::GameEvent;
use super::ledger::{is_valid_name, ScoreLedger};
use super::session::{Command, GameSession};

/// Longest accepted player name, in characters.
pub const NAME_MAX_LEN: usize = 20;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Menu,
    TopList,
    Naming,
    Playing,
    GameOver,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MenuItem {
    StartGame,
    TopList,
    Quit,
}

impl MenuItem {
    pub const ALL: [MenuItem; 3] = [MenuItem::StartGame, MenuItem::TopList, MenuItem::Quit];

    pub fn label(self) -> &'static str {
        match self {
            MenuItem::StartGame => "Start Game",
            MenuItem::TopList => "Top list",
            MenuItem::Quit => "Quit",
        }
    }
}

pub struct WorldState {
    pub phase: Phase,

    // ── Menu ──
    pub menu_cursor: usize,

    // ── Naming ──
    pub name_input: String,

    // ── Session ──
    pub session: Option<GameSession>,
    pub undo_credits: u32,
    /// Most recently spawned tile, for highlighting.
    pub last_spawn: Option<(usize, usize)>,

    // ── Result of the last session ──
    pub final_score: u32,
    pub final_rank: Option<usize>,
    pub save_error: Option<String>,

    // ── Top list ──
    pub ledger: ScoreLedger,

    // ── UI ──
    /// One-shot message, cleared by the next key.
    pub message: String,

    /// Seeds one RNG per session.
    seeder: StdRng,
}

impl WorldState {
    pub fn new(ledger: ScoreLedger, config: &GameConfig) -> Self {
        WorldState::with_seeder(ledger, config.undo_credits, StdRng::from_entropy())
    }

    pub fn with_seeder(ledger: ScoreLedger, undo_credits: u32, seeder: StdRng) -> Self {
        WorldState {
            phase: Phase::Menu,
            menu_cursor: 0,
            name_input: String::new(),
            session: None,
            undo_credits,
            last_spawn: None,
            final_score: 0,
            final_rank: None,
            save_error: None,
            ledger,
            message: String::new(),
            seeder,
        }
    }

    pub fn set_message(&mut self, msg: &str) {
        self.message = msg.to_string();
    }

    pub fn grid(&self) -> Option<&Grid> {
        self.session.as_ref().map(|s| s.grid())
    }

    // ── Menu ──

    pub fn selected(&self) -> MenuItem {
        MenuItem::ALL[self.menu_cursor]
    }

    /// Move the highlight, wrapping at both ends.
    pub fn menu_move(&mut self, delta: i32) {
        let n = MenuItem::ALL.len() as i32;
        self.menu_cursor = (self.menu_cursor as i32 + delta).rem_euclid(n) as usize;
    }

    /// Act on the highlighted item. Returns `true` when the player chose Quit.
    pub fn menu_select(&mut self) -> bool {
        match self.selected() {
            MenuItem::StartGame => {
                self.name_input.clear();
                self.phase = Phase::Naming;
            }
            MenuItem::TopList => {
                self.ledger.load();
                self.phase = Phase::TopList;
            }
            MenuItem::Quit => return true,
        }
        false
    }

    pub fn close_top_list(&mut self) {
        self.phase = Phase::Menu;
    }

    // ── Naming ──

    /// Append a typed character. Commas, control characters and anything
    /// past `NAME_MAX_LEN` are dropped.
    pub fn type_char(&mut self, c: char) {
        if c.is_control() || !is_valid_name(c.encode_utf8(&mut [0; 4])) { return; }
        if self.name_input.chars().count() >= NAME_MAX_LEN { return; }
        self.name_input.push(c);
    }

    pub fn backspace(&mut self) {
        self.name_input.pop();
    }

    pub fn cancel_naming(&mut self) {
        self.name_input.clear();
        self.phase = Phase::Menu;
    }

    /// Confirm the name and start playing.
    pub fn confirm_name(&mut self) {
        let name = std::mem::take(&mut self.name_input);
        let rng = StdRng::from_rng(&mut self.seeder).unwrap_or_else(|_| StdRng::from_entropy());
        self.session = Some(GameSession::with_rng(name, self.undo_credits, rng));
        self.last_spawn = None;
        self.final_rank = None;
        self.save_error = None;
        self.message.clear();
        self.phase = Phase::Playing;
    }

    // ── Playing ──

    /// Forward a command to the session and follow up on what happened.
    pub fn command(&mut self, command: Command) -> Vec<GameEvent> {
        if self.phase != Phase::Playing { return vec![]; }
        let session = match self.session.as_mut() {
            Some(s) => s,
            None => return vec![],
        };

        self.message.clear();
        let events = session.apply(command, &mut self.ledger);
        let score = session.score();
        let over = session.is_over();

        for event in &events {
            match event {
                GameEvent::TileSpawned { row, col } => self.last_spawn = Some((*row, *col)),
                GameEvent::Blocked { .. } => self.last_spawn = None,
                GameEvent::UndoApplied { .. } => self.last_spawn = None,
                GameEvent::UndoRefused => self.set_message("NO COINS! No undo left."),
                GameEvent::ScoreRecorded { rank } => self.final_rank = *rank,
                GameEvent::ScoreNotSaved { reason } => self.save_error = Some(reason.clone()),
                _ => {}
            }
        }

        if over {
            self.final_score = score;
            self.phase = Phase::GameOver;
        }
        events
    }

    /// Leave the game-over screen. Drops the finished session.
    pub fn return_to_menu(&mut self) {
        self.session = None;
        self.last_spawn = None;
        self.message.clear();
        self.phase = Phase::Menu;
    }

    /// Process exit (Ctrl+C): an unfinished session still gets its score
    /// committed.
    pub fn abort(&mut self) -> Vec<GameEvent> {
        if self.phase == Phase::Playing {
            info!("interrupted mid-game, committing score");
            return self.command(Command::Quit);
        }
        vec![]
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
