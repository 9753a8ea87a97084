/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// This eliminates flicker caused by full-screen redraws.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::board::Grid;
use crate::domain::direction::SIZE;
use crate::sim::ledger::LEDGER_CAPACITY;
use crate::sim::session::{EndReason, SessionState};
use crate::sim::world::{MenuItem, Phase, WorldState, NAME_MAX_LEN};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
    bold: bool,
}

impl Cell {
    /// Explicit background for every cell, so the gaps between rows on
    /// VTE terminals match the cell color.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG, bold: false };

    /// Sentinel cell used to invalidate the back buffer.
    /// Different from any real cell, so every position will be diff'd.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta, bold: false };

    fn new(ch: char, fg: Color, bg: Color, bold: bool) -> Self {
        let bg = match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        };
        Cell { ch, fg, bg, bold }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    /// Write a string at (x, y). Each char occupies 1 column.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color, bold: bool) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::new(ch, fg, bg, bold));
        }
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', Color::Black, bg, false));
        }
    }

    #[cfg(test)]
    fn row_text(&self, y: usize) -> String {
        (0..self.width).map(|x| self.get(x, y).ch).collect::<String>().trim_end().to_string()
    }
}

// ── Layout & palette ──

/// Columns per board cell, borders excluded.
const TILE_W: usize = 6;
const LEFT: usize = 7;
const HELP_ROW: usize = 1;
const BOARD_ROW: usize = 7;

const ACCENT: Color = Color::Rgb { r: 255, g: 200, b: 50 };
const HIGHLIGHT: Color = Color::Rgb { r: 80, g: 255, b: 80 };
const WARN: Color = Color::Rgb { r: 255, g: 60, b: 60 };
const FRAME: Color = Color::Rgb { r: 90, g: 90, b: 120 };
const MSG_BG: Color = Color::Rgb { r: 200, g: 180, b: 50 };

/// Tile foreground by value: warm yellows for small tiles darkening to deep
/// red, then magenta once past 1024.
fn tile_color(value: u32) -> Color {
    const RAMP: [u8; 10] = [228, 220, 214, 208, 202, 196, 160, 124, 88, 52];
    if value == 0 { return Color::DarkGrey; }
    let step = value.trailing_zeros() as usize; // 2 → 1, 4 → 2 …
    match step.checked_sub(1).and_then(|i| RAMP.get(i)) {
        Some(&ansi) => Color::AnsiValue(ansi),
        None => Color::Magenta,
    }
}

fn tile_label(value: u32) -> String {
    if value == 0 { "-".to_string() } else { value.to_string() }
}

// ── Renderer ──

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_phase: Option<Phase>,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_phase: None,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.resize(tw as usize, th as usize);
        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(
            self.writer,
            SetAttribute(Attribute::Reset),
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    fn resize(&mut self, w: usize, h: usize) {
        self.term_w = w;
        self.term_h = h;
        self.front.resize(w, h);
        self.back.resize(w, h);
        // Force full repaint: back ≠ front for every cell.
        self.back.cells.fill(Cell::INVALID);
    }

    pub fn render(&mut self, world: &WorldState) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.resize(tw as usize, th as usize);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        // Phase change → clear for clean transition
        if self.last_phase != Some(world.phase) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_phase = Some(world.phase);
        }

        self.compose(world);
        self.flush_diff()?;

        // Swap: current front becomes next back
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    fn compose(&mut self, world: &WorldState) {
        self.front.clear();
        match world.phase {
            Phase::Menu => self.compose_menu(world),
            Phase::TopList => self.compose_top_list(world),
            Phase::Naming => self.compose_naming(world),
            Phase::Playing => self.compose_game(world),
            Phase::GameOver => self.compose_game_over(world),
        }
        self.compose_message(world);
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut last_bold = false;
        let mut cursor_at: Option<(usize, usize)> = None;

        // Explicit base colors, not ResetColor: the terminal default may
        // differ from BASE_BG.
        queue!(
            self.writer,
            SetAttribute(Attribute::Reset),
            SetForegroundColor(Color::White),
            SetBackgroundColor(Cell::BASE_BG),
        )?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) { continue; }

                if cursor_at != Some((x, y)) {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                }

                if cell.bold != last_bold {
                    let attr = if cell.bold { Attribute::Bold } else { Attribute::NormalIntensity };
                    queue!(self.writer, SetAttribute(attr))?;
                    last_bold = cell.bold;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }

                queue!(self.writer, Print(cell.ch))?;
                cursor_at = Some((x + 1, y));
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose_menu(&mut self, w: &WorldState) {
        let title = [
            r" ___   ___  _ _   ___ ",
            r"|_  ) /   \| | | ( _ )",
            r" / / | () |_  _|/ _ \",
            r"/___| \__/  |_| \___/",
        ];
        for (i, line) in title.iter().enumerate() {
            self.front.put_str(LEFT, 1 + i, line, ACCENT, Color::Reset, true);
        }

        for (i, item) in MenuItem::ALL.iter().enumerate() {
            let row = 7 + i * 2;
            let label = format!("{:^15}", item.label());
            if i == w.menu_cursor {
                self.front.put_str(LEFT, row, &label, Color::Black, HIGHLIGHT, true);
            } else {
                self.front.put_str(LEFT, row, &label, Color::White, Color::Reset, false);
            }
        }

        self.front.put_str(LEFT, 14, "↑↓ Select   ENTER Confirm   Q Quit", Color::DarkGrey, Color::Reset, false);
    }

    fn compose_top_list(&mut self, w: &WorldState) {
        self.front.put_str(LEFT, 2, "Top list", ACCENT, Color::Reset, true);

        let entries = w.ledger.entries();
        if entries.is_empty() {
            self.front.put_str(1, 5, "No scores yet.", Color::DarkGrey, Color::Reset, false);
        }
        for (i, entry) in entries.iter().take(LEDGER_CAPACITY).enumerate() {
            let line = format!("Top {}:  name: {}, score: {}", i + 1, entry.name, entry.score);
            let fg = if i == 0 { HIGHLIGHT } else { Color::White };
            self.front.put_str(1, 5 + i, &line, fg, Color::Reset, i == 0);
        }

        let footer = 6 + LEDGER_CAPACITY;
        self.front.put_str(1, footer, "Press any key to return.", Color::DarkGrey, Color::Reset, false);
    }

    fn compose_naming(&mut self, w: &WorldState) {
        self.front.put_str(5, 5, "Please enter your name (press Enter to confirm): ", Color::White, Color::Reset, false);
        let field = format!("{:<width$}", format!("{}_", w.name_input), width = NAME_MAX_LEN + 1);
        self.front.put_str(5, 7, &field, HIGHLIGHT, Color::Rgb { r: 40, g: 40, b: 60 }, true);
        self.front.put_str(5, 9, "ESC Back to menu", Color::DarkGrey, Color::Reset, false);
    }

    fn compose_game(&mut self, w: &WorldState) {
        let session = match &w.session {
            Some(s) => s,
            None => return,
        };

        let help = [
            format!("Let's 2048, {}!", if session.name().is_empty() { "player" } else { session.name() }),
            "Use the arrow keys (or WASD) to play the game".to_string(),
            "Press Q to quit".to_string(),
            format!("You have {} chances to undo, and press R to undo.", session.undos_left()),
        ];
        for (i, line) in help.iter().enumerate() {
            self.front.put_str(LEFT, HELP_ROW + i, line, Color::White, Color::Reset, false);
        }
        let score = format!("Score: {}", session.score());
        self.front.put_str(LEFT, HELP_ROW + help.len(), &score, ACCENT, Color::Reset, true);

        self.compose_board(session.grid(), w.last_spawn, BOARD_ROW);
    }

    /// Box-drawn 4×4 board with its top-left corner at (LEFT, top).
    fn compose_board(&mut self, grid: &Grid, highlight: Option<(usize, usize)>, top: usize) {
        let bar = "─".repeat(TILE_W);
        let border = |l: &str, m: &str, r: &str| {
            format!("{l}{}{r}", vec![bar.as_str(); SIZE].join(m))
        };

        self.front.put_str(LEFT, top, &border("┌", "┬", "┐"), FRAME, Color::Reset, false);
        for row in 0..SIZE {
            let y = top + 1 + row * 2;
            for col in 0..=SIZE {
                self.front.put_str(LEFT + col * (TILE_W + 1), y, "│", FRAME, Color::Reset, false);
            }
            for col in 0..SIZE {
                let value = grid.get(row, col);
                let label = format!("{:^width$}", tile_label(value), width = TILE_W);
                let fresh = highlight == Some((row, col));
                let bg = if fresh { Color::Rgb { r: 50, g: 50, b: 75 } } else { Color::Reset };
                let x = LEFT + 1 + col * (TILE_W + 1);
                self.front.put_str(x, y, &label, tile_color(value), bg, value >= 128 || fresh);
            }
            let (l, m, r) = if row + 1 == SIZE { ("└", "┴", "┘") } else { ("├", "┼", "┤") };
            self.front.put_str(LEFT, y + 1, &border(l, m, r), FRAME, Color::Reset, false);
        }
    }

    fn compose_game_over(&mut self, w: &WorldState) {
        let defeated = w.session.as_ref()
            .map_or(false, |s| s.state() == SessionState::Ended(EndReason::Defeated));
        let headline = if defeated { "Game Over! No moves left." } else { "Game ended." };
        self.front.put_str(LEFT, 1, headline, WARN, Color::Reset, true);

        let best = w.grid().map_or(0, |g| g.max_tile());
        let score = format!("Final score: {}   Best tile: {}", w.final_score, best);
        self.front.put_str(LEFT, 3, &score, ACCENT, Color::Reset, true);

        let (standing, fg) = match (&w.save_error, w.final_rank) {
            (Some(_), _) => ("Score could not be saved.".to_string(), WARN),
            (None, Some(rank)) => (format!("You made the top list at #{}!", rank + 1), HIGHLIGHT),
            (None, None) => ("Not quite enough for the top list.".to_string(), Color::White),
        };
        self.front.put_str(LEFT, 4, &standing, fg, Color::Reset, false);

        if let Some(grid) = w.grid() {
            self.compose_board(grid, None, BOARD_ROW);
        }

        let footer = BOARD_ROW + SIZE * 2 + 2;
        self.front.put_str(LEFT, footer, "Press any key to return to the menu.", Color::DarkGrey, Color::Reset, false);
    }

    /// One-shot message on the bottom row.
    fn compose_message(&mut self, w: &WorldState) {
        if w.message.is_empty() || self.front.height == 0 { return; }
        let row = self.front.height - 1;
        self.front.fill_row(row, MSG_BG);
        self.front.put_str(1, row, &w.message, Color::Black, MSG_BG, true);
    }
}
