/// Events emitted while a command is applied.
/// The presentation layer consumes these for messages and sound.

use crate::domain::direction::Direction;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameEvent {
    /// The swipe changed the board.
    Slid { direction: Direction, merged: bool },
    /// The swipe changed nothing; no tile spawned.
    Blocked { direction: Direction },
    TileSpawned { row: usize, col: usize },
    /// Spawn found no empty cell.
    NoSpace,
    UndoApplied { remaining: u32 },
    /// Empty history or no undo credits left.
    UndoRefused,
    Defeated { score: u32 },
    Quit { score: u32 },
    /// Zero-based rank, `None` when the score missed the list.
    ScoreRecorded { rank: Option<usize> },
    ScoreNotSaved { reason: String },
}
