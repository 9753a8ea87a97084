/// Top list: the ten best (name, score) pairs, kept on disk.
///
/// ## File format
///   One entry per line, `name,score`, newline-terminated, best first.
///   Names never contain a comma.
///
/// A missing file is an empty ledger. Malformed lines (no comma, a comma
/// inside the name, non-numeric score) are skipped with a warning and the
/// remaining lines still load.
///
/// Storage is reached through the `ScoreStore` port so the ledger logic can
/// run against memory in tests.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::error::{Error, Result};

/// Entries kept after every `record`.
pub const LEDGER_CAPACITY: usize = 10;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScoreEntry {
    pub name: String,
    pub score: u32,
}

impl ScoreEntry {
    pub fn new(name: impl Into<String>, score: u32) -> Self {
        ScoreEntry { name: name.into(), score }
    }
}

// ══════════════════════════════════════════════════════════════
// Storage port
// ══════════════════════════════════════════════════════════════

pub trait ScoreStore {
    /// Read every stored entry. Absent storage is `Ok(vec![])`.
    fn load(&self) -> Result<Vec<ScoreEntry>>;

    /// Replace the stored entries.
    fn save(&mut self, entries: &[ScoreEntry]) -> Result<()>;
}

/// Plain-text score file.
#[derive(Clone, Debug)]
pub struct FileScoreStore {
    path: PathBuf,
}

impl FileScoreStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileScoreStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ScoreStore for FileScoreStore {
    fn load(&self) -> Result<Vec<ScoreEntry>> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(parse_entries(&text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(vec![]),
            Err(source) => Err(Error::Io {
                operation: "read score file",
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn save(&mut self, entries: &[ScoreEntry]) -> Result<()> {
        fs::write(&self.path, serialize_entries(entries)).map_err(|source| Error::Io {
            operation: "write score file",
            path: self.path.clone(),
            source,
        })
    }
}

// ══════════════════════════════════════════════════════════════
// Ledger
// ══════════════════════════════════════════════════════════════

pub struct ScoreLedger {
    store: Box<dyn ScoreStore>,
    entries: Vec<ScoreEntry>,
}

impl ScoreLedger {
    /// Open the ledger and load what the store holds. A read failure is
    /// logged and leaves the ledger empty.
    pub fn open(store: Box<dyn ScoreStore>) -> Self {
        let mut ledger = ScoreLedger { store, entries: vec![] };
        ledger.load();
        ledger
    }

    /// Re-read the store. On failure the cached entries stay.
    pub fn load(&mut self) -> &[ScoreEntry] {
        match self.store.load() {
            Ok(mut entries) => {
                normalize(&mut entries);
                self.entries = entries;
            }
            Err(e) => warn!("keeping cached top list: {e}"),
        }
        &self.entries
    }

    pub fn entries(&self) -> &[ScoreEntry] {
        &self.entries
    }

    /// Add an entry, keep the best `LEDGER_CAPACITY`, persist.
    ///
    /// Returns the zero-based rank the entry landed on, or `None` when it
    /// did not make the list. Ties keep arrival order, so a newcomer ranks
    /// below everyone already holding the same score.
    ///
    /// A persistence failure is returned as `Err`, but the in-memory list
    /// already contains the entry.
    pub fn record(&mut self, name: &str, score: u32) -> Result<Option<usize>> {
        if !is_valid_name(name) {
            return Err(Error::InvalidName { name: name.to_string() });
        }
        self.load();

        let rank = self.entries.iter().filter(|e| e.score >= score).count();
        self.entries.push(ScoreEntry::new(name, score));
        normalize(&mut self.entries);
        let rank = (rank < LEDGER_CAPACITY).then_some(rank);
        debug!("recorded {name}={score}, rank {rank:?}");

        self.store.save(&self.entries)?;
        Ok(rank)
    }
}

/// Stable sort, best first, truncated to capacity.
fn normalize(entries: &mut Vec<ScoreEntry>) {
    entries.sort_by(|a, b| b.score.cmp(&a.score));
    entries.truncate(LEDGER_CAPACITY);
}

/// Names are stored verbatim in a comma-separated line.
pub fn is_valid_name(name: &str) -> bool {
    !name.contains(|c: char| matches!(c, ',' | '\n' | '\r'))
}

// ══════════════════════════════════════════════════════════════
// Serialization
// ══════════════════════════════════════════════════════════════

fn serialize_entries(entries: &[ScoreEntry]) -> String {
    let mut out = String::with_capacity(entries.len() * 16);
    for e in entries {
        out.push_str(&format!("{},{}\n", e.name, e.score));
    }
    out
}

fn parse_entries(content: &str) -> Vec<ScoreEntry> {
    let mut entries = vec![];
    for (i, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() { continue; }
        match parse_line(line) {
            Some(entry) => entries.push(entry),
            None => warn!("score file line {}: skipping malformed entry {:?}", i + 1, line),
        }
    }
    entries
}

fn parse_line(line: &str) -> Option<ScoreEntry> {
    let (name, score) = line.split_once(',')?;
    if score.contains(',') { return None; }
    Some(ScoreEntry {
        name: name.to_string(),
        score: score.trim().parse().ok()?,
    })
}

// ══════════════════════════════════════════════════════════════
// In-memory store (tests)
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
pub use self::memory::MemoryScoreStore;


// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
