/// One game session: board, undo history, and the command contract.
///
/// Processing order for a directional command:
///   1. Snapshot the grid onto the undo history (always, even if the
///      swipe turns out to change nothing)
///   2. Swipe
///   3. If the board changed: spawn a tile, then check for defeat
///   4. On defeat: commit the score to the ledger and end the session
///
/// Undo pops one snapshot and restores the grid only. The score is not
/// rolled back.
///
/// Once the session has ended every command is ignored.

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::Rng;

use crate::domain::board::{Board, Grid};
use crate::domain::direction::Direction;
use super::event::GameEvent;
use super::ledger::ScoreLedger;

/// Undo credits granted at session start unless configured otherwise.
pub const DEFAULT_UNDO_CREDITS: u32 = 3;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Command {
    Move(Direction),
    Undo,
    Quit,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EndReason {
    Defeated,
    Quit,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SessionState {
    Playing,
    Ended(EndReason),
}

pub struct GameSession<R = StdRng> {
    board: Board,
    history: Vec<Grid>,
    undos_left: u32,
    name: String,
    state: SessionState,
    rng: R,
}

impl<R: Rng> GameSession<R> {
    /// Fresh session: empty board plus two spawned tiles.
    pub fn with_rng(name: impl Into<String>, undo_credits: u32, mut rng: R) -> Self {
        let mut board = Board::new();
        board.spawn_tile(&mut rng);
        board.spawn_tile(&mut rng);
        GameSession::from_board(board, name, undo_credits, rng)
    }

    /// Session starting from a given grid, nothing spawned.
    #[cfg(test)]
    pub fn from_grid(grid: Grid, name: impl Into<String>, undo_credits: u32, rng: R) -> Self {
        GameSession::from_board(Board::from_grid(grid), name, undo_credits, rng)
    }

    fn from_board(board: Board, name: impl Into<String>, undo_credits: u32, rng: R) -> Self {
        let name = name.into();
        info!("session started for {name:?} with {undo_credits} undo credits");
        GameSession {
            board,
            history: Vec::new(),
            undos_left: undo_credits,
            name,
            state: SessionState::Playing,
            rng,
        }
    }

    // ── Accessors ──

    pub fn grid(&self) -> &Grid {
        self.board.grid()
    }

    pub fn score(&self) -> u32 {
        self.board.score()
    }

    pub fn undos_left(&self) -> u32 {
        self.undos_left
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_over(&self) -> bool {
        self.state != SessionState::Playing
    }

    #[cfg(test)]
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty() && self.undos_left > 0
    }

    // ── Commands ──

    /// Apply one command. Ledger failures are reported as events; the
    /// session itself stays valid.
    pub fn apply(&mut self, command: Command, ledger: &mut ScoreLedger) -> Vec<GameEvent> {
        let mut events = Vec::new();
        if self.is_over() { return events; }

        match command {
            Command::Move(dir) => self.swipe(dir, ledger, &mut events),
            Command::Undo => self.undo(&mut events),
            Command::Quit => {
                events.push(GameEvent::Quit { score: self.score() });
                self.finish(EndReason::Quit, ledger, &mut events);
            }
        }
        events
    }

    fn swipe(&mut self, dir: Direction, ledger: &mut ScoreLedger, events: &mut Vec<GameEvent>) {
        self.history.push(*self.board.grid());

        let slide = self.board.slide(dir);
        if !slide.changed {
            debug!("{} swipe changed nothing", dir.name());
            events.push(GameEvent::Blocked { direction: dir });
            return;
        }
        events.push(GameEvent::Slid { direction: dir, merged: slide.merged });

        match self.board.spawn_tile(&mut self.rng) {
            Some((row, col)) => events.push(GameEvent::TileSpawned { row, col }),
            None => events.push(GameEvent::NoSpace),
        }

        if self.board.is_defeated() {
            events.push(GameEvent::Defeated { score: self.score() });
            self.finish(EndReason::Defeated, ledger, events);
        }
    }

    fn undo(&mut self, events: &mut Vec<GameEvent>) {
        if !self.can_undo() {
            debug!(
                "undo refused: {} snapshots, {} credits",
                self.history.len(), self.undos_left
            );
            events.push(GameEvent::UndoRefused);
            return;
        }
        if let Some(prev) = self.history.pop() {
            self.undos_left -= 1;
            self.board.restore(prev);
            events.push(GameEvent::UndoApplied { remaining: self.undos_left });
        }
    }

    fn finish(&mut self, reason: EndReason, ledger: &mut ScoreLedger, events: &mut Vec<GameEvent>) {
        self.state = SessionState::Ended(reason);
        self.history.clear();
        let score = self.score();
        info!("session for {:?} ended ({reason:?}) with score {score}", self.name);
        debug!("final board:\n{}", self.board.grid());

        match ledger.record(&self.name, score) {
            Ok(rank) => events.push(GameEvent::ScoreRecorded { rank }),
            Err(e) => {
                warn!("score not saved: {e}");
                events.push(GameEvent::ScoreNotSaved { reason: e.to_string() });
            }
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use crate::sim::ledger::{MemoryScoreStore, ScoreEntry};

    const CHECKER: [[u32; 4]; 4] = [
        [2, 4, 2, 4],
        [4, 2, 4, 2],
        [2, 4, 2, 4],
        [4, 2, 4, 2],
    ];

    fn rng() -> StdRng {
        StdRng::seed_from_u64(2048)
    }

    fn ledger() -> (ScoreLedger, MemoryScoreStore) {
        let store = MemoryScoreStore::new();
        (ScoreLedger::open(Box::new(store.clone())), store)
    }

    fn session(cells: [[u32; 4]; 4]) -> GameSession {
        GameSession::from_grid(Grid::new(cells), "tester", DEFAULT_UNDO_CREDITS, rng())
    }

    fn count_tiles(g: &Grid) -> usize {
        g.cells().iter().flatten().filter(|&&v| v != 0).count()
    }

    // ── start ──

    #[test]
    fn new_session_has_two_tiles() {
        let s = GameSession::with_rng("p", 3, rng());
        assert_eq!(count_tiles(s.grid()), 2);
        assert_eq!(s.grid().tile_sum(), 4);
        assert_eq!(s.score(), 0);
        assert_eq!(s.undos_left(), 3);
        assert_eq!(s.state(), SessionState::Playing);
    }

    // ── moves ──

    #[test]
    fn successful_move_spawns_one_tile() {
        let (mut ledger, _) = ledger();
        let mut s = session([[0, 2, 2, 0], [0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]]);
        let events = s.apply(Command::Move(Direction::Left), &mut ledger);

        assert_eq!(events[0], GameEvent::Slid { direction: Direction::Left, merged: true });
        assert!(matches!(events[1], GameEvent::TileSpawned { .. }));
        assert_eq!(s.grid().get(0, 0), 4);
        assert_eq!(s.grid().tile_sum(), 6);
        assert_eq!(s.score(), 15);
        assert_eq!(s.history_len(), 1);
    }

    #[test]
    fn blocked_move_still_pushes_history() {
        let (mut ledger, _) = ledger();
        let cells = [[2, 4, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]];
        let mut s = session(cells);
        let events = s.apply(Command::Move(Direction::Left), &mut ledger);

        assert_eq!(events, vec![GameEvent::Blocked { direction: Direction::Left }]);
        assert_eq!(*s.grid(), Grid::new(cells));
        assert_eq!(s.history_len(), 1);
        assert_eq!(s.score(), 0);
    }

    #[test]
    fn defeat_ends_session_and_records_score() {
        let (mut ledger, store) = ledger();
        // Right merges the two 8s; the spawn lands on the only empty cell
        // and leaves a board with no pairs.
        let mut s = session([
            [8, 8, 2, 4],
            [4, 2, 4, 2],
            [2, 4, 2, 4],
            [4, 2, 4, 2],
        ]);
        let events = s.apply(Command::Move(Direction::Right), &mut ledger);

        assert_eq!(*s.grid().cells(), [[2, 16, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]]);
        assert!(events.contains(&GameEvent::Defeated { score: 5 }));
        assert!(events.contains(&GameEvent::ScoreRecorded { rank: Some(0) }));
        assert_eq!(s.state(), SessionState::Ended(EndReason::Defeated));
        assert_eq!(store.stored(), vec![ScoreEntry::new("tester", 5)]);
    }

    #[test]
    fn ended_session_ignores_commands() {
        let (mut ledger, store) = ledger();
        let mut s = session(CHECKER);
        s.apply(Command::Quit, &mut ledger);
        assert!(s.apply(Command::Move(Direction::Up), &mut ledger).is_empty());
        assert!(s.apply(Command::Undo, &mut ledger).is_empty());
        assert!(s.apply(Command::Quit, &mut ledger).is_empty());
        assert_eq!(store.writes(), 1);
    }

    #[test]
    fn full_board_without_pairs_is_stuck_but_not_ended() {
        let (mut ledger, _) = ledger();
        let mut s = session(CHECKER);
        for dir in Direction::ALL {
            let events = s.apply(Command::Move(dir), &mut ledger);
            assert_eq!(events, vec![GameEvent::Blocked { direction: dir }]);
        }
        assert_eq!(s.state(), SessionState::Playing);
    }

    // ── quit ──

    #[test]
    fn quit_commits_current_score() {
        let (mut ledger, store) = ledger();
        let mut s = session([[0, 2, 2, 0], [0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]]);
        s.apply(Command::Move(Direction::Left), &mut ledger);
        let events = s.apply(Command::Quit, &mut ledger);

        assert_eq!(events[0], GameEvent::Quit { score: 15 });
        assert_eq!(s.state(), SessionState::Ended(EndReason::Quit));
        assert_eq!(store.stored(), vec![ScoreEntry::new("tester", 15)]);
        assert_eq!(s.history_len(), 0);
    }

    #[test]
    fn ledger_failure_does_not_break_the_session() {
        let (mut ledger, store) = ledger();
        store.fail_writes(true);
        let mut s = session(CHECKER);
        let events = s.apply(Command::Quit, &mut ledger);

        assert!(matches!(events.last(), Some(GameEvent::ScoreNotSaved { .. })));
        assert_eq!(s.state(), SessionState::Ended(EndReason::Quit));
        assert_eq!(ledger.entries()[0], ScoreEntry::new("tester", 0));
    }

    // ── undo ──

    #[test]
    fn undo_restores_grid_but_not_score() {
        let (mut ledger, _) = ledger();
        let cells = [[0, 2, 2, 0], [0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]];
        let mut s = session(cells);
        s.apply(Command::Move(Direction::Left), &mut ledger);
        let events = s.apply(Command::Undo, &mut ledger);

        assert_eq!(events, vec![GameEvent::UndoApplied { remaining: 2 }]);
        assert_eq!(*s.grid(), Grid::new(cells));
        assert_eq!(s.score(), 15);
    }

    #[test]
    fn repeated_undo_walks_back_move_by_move() {
        let (mut ledger, _) = ledger();
        let mut s = GameSession::with_rng("p", 3, rng());
        let mut seen = vec![*s.grid()];
        for dir in [Direction::Left, Direction::Down, Direction::Right] {
            s.apply(Command::Move(dir), &mut ledger);
            seen.push(*s.grid());
        }
        seen.pop();
        while let Some(expected) = seen.pop() {
            s.apply(Command::Undo, &mut ledger);
            assert_eq!(*s.grid(), expected);
        }
        assert_eq!(s.undos_left(), 0);
    }

    #[test]
    fn undo_credits_run_out() {
        let (mut ledger, _) = ledger();
        let mut s = GameSession::from_grid(Grid::default(), "p", 1, rng());
        s.apply(Command::Move(Direction::Left), &mut ledger);
        s.apply(Command::Move(Direction::Left), &mut ledger);

        assert!(matches!(s.apply(Command::Undo, &mut ledger)[0], GameEvent::UndoApplied { remaining: 0 }));
        let grid = *s.grid();
        assert_eq!(s.apply(Command::Undo, &mut ledger), vec![GameEvent::UndoRefused]);
        assert_eq!(*s.grid(), grid);
        assert_eq!(s.undos_left(), 0);
    }

    #[test]
    fn undo_without_history_is_refused() {
        let (mut ledger, _) = ledger();
        let mut s = session(CHECKER);
        assert_eq!(s.apply(Command::Undo, &mut ledger), vec![GameEvent::UndoRefused]);
        assert_eq!(s.undos_left(), DEFAULT_UNDO_CREDITS);
    }

    #[test]
    fn undo_of_blocked_move_is_a_wasted_credit() {
        let (mut ledger, _) = ledger();
        let cells = [[2, 4, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]];
        let mut s = session(cells);
        s.apply(Command::Move(Direction::Left), &mut ledger);
        s.apply(Command::Undo, &mut ledger);
        assert_eq!(*s.grid(), Grid::new(cells));
        assert_eq!(s.undos_left(), DEFAULT_UNDO_CREDITS - 1);
    }

    #[test]
    fn undo_credits_never_go_negative() {
        let (mut ledger, _) = ledger();
        let mut s = GameSession::with_rng("p", 2, rng());
        for _ in 0..6 {
            s.apply(Command::Move(Direction::Up), &mut ledger);
            s.apply(Command::Move(Direction::Left), &mut ledger);
        }
        for _ in 0..10 {
            s.apply(Command::Undo, &mut ledger);
        }
        assert_eq!(s.undos_left(), 0);
    }
}
