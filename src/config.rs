/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::sim::session::DEFAULT_UNDO_CREDITS;

const APP_DIR: &str = "twenty48";

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub undo_credits: u32,
    pub gamepad: GamepadConfig,
    pub score_file: PathBuf,
    pub log: LogConfig,
    pub sound: bool,
    /// Problems found while loading. Reported once logging is up.
    pub warnings: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub undo: Vec<String>,
    pub quit: Vec<String>,
    pub confirm: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct LogConfig {
    pub file: PathBuf,
    pub level: String,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    game: TomlGame,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlGame {
    #[serde(default = "default_undo_credits")]
    undo_credits: u32,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_undo")]
    undo: Vec<String>,
    #[serde(default = "default_quit")]
    quit: Vec<String>,
    #[serde(default = "default_confirm")]
    confirm: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_score_file")]
    score_file: String,
    #[serde(default = "default_log_file")]
    log_file: String,
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default = "default_sound")]
    sound: bool,
}

// ── Defaults ──

fn default_undo_credits() -> u32 { DEFAULT_UNDO_CREDITS }

fn default_undo() -> Vec<String> { vec!["B".into()] }
fn default_quit() -> Vec<String> { vec!["Select".into()] }
fn default_confirm() -> Vec<String> { vec!["A".into(), "Start".into()] }

fn default_score_file() -> String { "top_list.txt".into() }
fn default_log_file() -> String { "twenty48.log".into() }
fn default_log_level() -> String { "warn".into() }
fn default_sound() -> bool { true }

impl Default for TomlGame {
    fn default() -> Self {
        TomlGame { undo_credits: default_undo_credits() }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            undo: default_undo(),
            quit: default_quit(),
            confirm: default_confirm(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            score_file: default_score_file(),
            log_file: default_log_file(),
            log_level: default_log_level(),
            sound: default_sound(),
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory,
    /// (3) `~/.local/share/twenty48`.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let mut warnings = vec![];
        let toml_cfg = load_toml(&candidate_dirs(), &mut warnings);
        GameConfig::resolve(toml_cfg, &data_dir(), warnings)
    }

    /// Build a config from TOML text, resolving relative paths against `data_dir`.
    #[cfg(test)]
    pub fn from_toml_str(text: &str, data_dir: &Path) -> Self {
        let mut warnings = vec![];
        let toml_cfg = parse_toml(text, "config.toml", &mut warnings);
        GameConfig::resolve(toml_cfg, data_dir, warnings)
    }

    fn resolve(toml_cfg: TomlConfig, data_dir: &Path, warnings: Vec<String>) -> Self {
        GameConfig {
            undo_credits: toml_cfg.game.undo_credits,
            gamepad: GamepadConfig {
                undo: toml_cfg.gamepad.undo,
                quit: toml_cfg.gamepad.quit,
                confirm: toml_cfg.gamepad.confirm,
            },
            score_file: resolve_path(data_dir, &toml_cfg.general.score_file),
            log: LogConfig {
                file: resolve_path(data_dir, &toml_cfg.general.log_file),
                level: toml_cfg.general.log_level,
            },
            sound: toml_cfg.general.sound,
            warnings,
        }
    }
}

fn resolve_path(data_dir: &Path, value: &str) -> PathBuf {
    let path = PathBuf::from(value);
    if path.is_absolute() { path } else { data_dir.join(path) }
}

/// Candidate directories to search: exe dir + CWD + XDG data home (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    // 3. XDG data home (~/.local/share/twenty48)
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share").join(APP_DIR);
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Where the score list and log live.
pub fn data_dir() -> PathBuf {
    // 1. Exe directory (local/portable installs)
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            // System installs like /usr/games/ aren't writable
            let test_path = parent.join(".write_test_twenty48");
            if std::fs::write(&test_path, "").is_ok() {
                let _ = std::fs::remove_file(&test_path);
                return parent.to_path_buf();
            }
        }
    }

    // 2. XDG data home
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share").join(APP_DIR);
        if std::fs::create_dir_all(&xdg).is_ok() {
            return xdg;
        }
    }

    // 3. CWD
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf], warnings: &mut Vec<String>) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => return parse_toml(&text, &path.display().to_string(), warnings),
                Err(e) => warnings.push(format!("could not read {}: {e}", path.display())),
            }
        }
    }
    TomlConfig::default()
}

fn parse_toml(text: &str, origin: &str, warnings: &mut Vec<String>) -> TomlConfig {
    match toml::from_str::<TomlConfig>(text) {
        Ok(cfg) => cfg,
        Err(e) => {
            warnings.push(format!("{origin} parse error, using default settings: {e}"));
            TomlConfig::default()
        }
    }
}
