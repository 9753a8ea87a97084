/// Board engine: the 4x4 grid and the rules that move it.
///
/// ## Swipe
///
/// A swipe runs three phases over every line (see `direction.rs` for the
/// line numbering):
///   1. compact: slide tiles toward the target edge, no merging
///   2. merge:   scan pairs from the edge inward, double equal pairs
///   3. compact: close the gaps the merge opened
///
/// Compaction is a fixed number of swap passes (`SIZE - 1`), which is
/// enough to carry a tile across a whole line.
///
/// ## Scoring
///
/// Flat, not proportional to merged values:
///   +10 for each compaction phase that moved a tile (at most twice)
///   +5  when the swipe changed the board at all
///
/// `Grid` is `Copy`; undo history stores plain value snapshots of it.

use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;

use super::direction::{Direction, SIZE};

/// Value of every freshly spawned tile.
pub const SPAWN_VALUE: u32 = 2;
/// Awarded for each compaction phase of a swipe that moves any tile.
pub const SLIDE_POINTS: u32 = 10;
/// Awarded when a swipe changes the board.
pub const MOVE_POINTS: u32 = 5;

const COMPACTION_PASSES: usize = SIZE - 1;

// ══════════════════════════════════════════════════════════════
// Grid
// ══════════════════════════════════════════════════════════════

/// 4x4 tile values, row-major. `0` is an empty cell.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct Grid {
    cells: [[u32; SIZE]; SIZE],
}

/// What a single swipe did to the grid.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Slide {
    /// The first compaction moved at least one tile.
    pub compacted: bool,
    /// At least one pair merged.
    pub merged: bool,
    /// The compaction after the merge moved at least one tile.
    pub closed: bool,
    /// Any phase changed the grid.
    pub changed: bool,
}

impl Slide {
    /// Score awarded for this swipe.
    pub fn points(&self) -> u32 {
        let mut points = 0;
        if self.compacted { points += SLIDE_POINTS; }
        if self.closed { points += SLIDE_POINTS; }
        if self.changed { points += MOVE_POINTS; }
        points
    }
}

impl Grid {
    #[cfg(test)]
    pub fn new(cells: [[u32; SIZE]; SIZE]) -> Self {
        Grid { cells }
    }

    #[cfg(test)]
    pub fn cells(&self) -> &[[u32; SIZE]; SIZE] {
        &self.cells
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u32 {
        self.cells[row][col]
    }

    /// Empty cells in row-major order.
    pub fn empty_cells(&self) -> Vec<(usize, usize)> {
        let mut out = Vec::with_capacity(SIZE * SIZE);
        for row in 0..SIZE {
            for col in 0..SIZE {
                if self.cells[row][col] == 0 {
                    out.push((row, col));
                }
            }
        }
        out
    }

    pub fn has_empty(&self) -> bool {
        self.cells.iter().any(|row| row.contains(&0))
    }

    #[cfg(test)]
    pub fn tile_sum(&self) -> u64 {
        self.cells.iter().flatten().map(|&v| v as u64).sum()
    }

    pub fn max_tile(&self) -> u32 {
        self.cells.iter().flatten().copied().max().unwrap_or(0)
    }

    /// Place a `SPAWN_VALUE` tile on an empty cell chosen uniformly at random.
    /// Returns the cell, or `None` (grid untouched) when there is no space.
    pub fn spawn_tile<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<(usize, usize)> {
        let (row, col) = *self.empty_cells().choose(rng)?;
        self.cells[row][col] = SPAWN_VALUE;
        Some((row, col))
    }

    /// No empty cell and no horizontally or vertically adjacent equal pair.
    pub fn is_defeated(&self) -> bool {
        if self.has_empty() { return false; }
        for row in 0..SIZE {
            for col in 0..SIZE {
                let v = self.cells[row][col];
                if col + 1 < SIZE && self.cells[row][col + 1] == v { return false; }
                if row + 1 < SIZE && self.cells[row + 1][col] == v { return false; }
            }
        }
        true
    }

    /// Compaction phase. Returns whether any tile moved.
    pub fn compact(&mut self, dir: Direction) -> bool {
        let mut moved = false;
        for _ in 0..COMPACTION_PASSES {
            for line in 0..SIZE {
                for k in (1..SIZE).rev() {
                    let (nr, nc) = dir.cell(line, k - 1);
                    let (fr, fc) = dir.cell(line, k);
                    if self.cells[nr][nc] == 0 && self.cells[fr][fc] != 0 {
                        self.cells[nr][nc] = self.cells[fr][fc];
                        self.cells[fr][fc] = 0;
                        moved = true;
                    }
                }
            }
        }
        moved
    }

    /// Merge phase. The cell nearer the target edge doubles, the other
    /// empties; a zeroed cell cannot take part in a later pair this scan.
    pub fn merge(&mut self, dir: Direction) -> bool {
        let mut merged = false;
        for line in 0..SIZE {
            for k in 1..SIZE {
                let (nr, nc) = dir.cell(line, k - 1);
                let (fr, fc) = dir.cell(line, k);
                let v = self.cells[fr][fc];
                if v != 0 && v == self.cells[nr][nc] {
                    self.cells[nr][nc] = v * 2;
                    self.cells[fr][fc] = 0;
                    merged = true;
                }
            }
        }
        merged
    }

    /// Compact, merge, compact.
    pub fn slide(&mut self, dir: Direction) -> Slide {
        let compacted = self.compact(dir);
        let merged = self.merge(dir);
        let closed = self.compact(dir);
        Slide {
            compacted,
            merged,
            closed,
            changed: compacted || merged || closed,
        }
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, row) in self.cells.iter().enumerate() {
            if i > 0 { writeln!(f)?; }
            let line: Vec<String> = row.iter().map(|v| format!("{:<4}", v)).collect();
            write!(f, "{}", line.concat().trim_end())?;
        }
        Ok(())
    }
}

// ══════════════════════════════════════════════════════════════
// Board: grid + running score
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug, Default)]
pub struct Board {
    grid: Grid,
    score: u32,
}

impl Board {
    pub fn new() -> Self {
        Board::default()
    }

    #[cfg(test)]
    pub fn from_grid(grid: Grid) -> Self {
        Board { grid, score: 0 }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    /// Replace the grid contents. Score is left alone.
    pub fn restore(&mut self, grid: Grid) {
        self.grid = grid;
    }

    pub fn spawn_tile<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<(usize, usize)> {
        self.grid.spawn_tile(rng)
    }

    pub fn is_defeated(&self) -> bool {
        self.grid.is_defeated()
    }

    /// One swipe with scoring. Returns whether the board changed.
    #[cfg(test)]
    pub fn swipe(&mut self, dir: Direction) -> bool {
        self.slide(dir).changed
    }

    /// Like `swipe`, but reports the phases for sound and logging.
    pub fn slide(&mut self, dir: Direction) -> Slide {
        let slide = self.grid.slide(dir);
        self.score += slide.points();
        slide
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand::Rng;

    const RANDOM_BOARDS: usize = 3000;

    fn board(cells: [[u32; 4]; 4]) -> Board {
        Board::from_grid(Grid::new(cells))
    }

    /// Full board, no adjacent pair equal.
    const CHECKER: [[u32; 4]; 4] = [
        [2, 4, 2, 4],
        [4, 2, 4, 2],
        [2, 4, 2, 4],
        [4, 2, 4, 2],
    ];

    fn sample_grids() -> Vec<Grid> {
        vec![
            Grid::new([[0, 2, 2, 0], [0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]]),
            Grid::new([[2, 2, 2, 2], [4, 4, 8, 8], [0, 2, 0, 2], [16, 0, 16, 4]]),
            Grid::new([[2, 0, 0, 2], [2, 4, 4, 0], [8, 8, 8, 0], [0, 0, 0, 64]]),
            Grid::new(CHECKER),
            Grid::new([[1024, 1024, 0, 0], [2, 0, 0, 2], [4, 4, 4, 4], [0, 32, 32, 32]]),
        ]
    }

    /// Seeded boards: a third are full, the rest about half empty. Tile
    /// exponents are drawn from `1..=max_exp`.
    fn random_grids(seed: u64, n: usize, max_exp: u32) -> Vec<Grid> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|i| {
                let full = i % 3 == 0;
                let mut cells = [[0; 4]; 4];
                for cell in cells.iter_mut().flatten() {
                    if full || rng.gen_bool(0.5) {
                        *cell = 1 << rng.gen_range(1..=max_exp);
                    }
                }
                Grid::new(cells)
            })
            .collect()
    }

    fn all_grids() -> Vec<Grid> {
        let mut grids = sample_grids();
        grids.extend(random_grids(2048, RANDOM_BOARDS, 11));
        grids
    }

    fn tile_count(g: &Grid) -> usize {
        g.cells().iter().flatten().filter(|&&v| v != 0).count()
    }

    /// Written independently of `is_defeated`: every cell checks all four
    /// neighbours.
    fn stuck(g: &Grid) -> bool {
        let c = g.cells();
        for row in 0..4 {
            for col in 0..4 {
                if c[row][col] == 0 { return false; }
                let neighbours = [
                    (row.wrapping_sub(1), col),
                    (row + 1, col),
                    (row, col.wrapping_sub(1)),
                    (row, col + 1),
                ];
                for (r, cc) in neighbours {
                    if r < 4 && cc < 4 && c[r][cc] == c[row][col] { return false; }
                }
            }
        }
        true
    }

    // ── swipe: scenarios ──

    #[test]
    fn merge_after_compaction_scores_fifteen() {
        let mut b = board([[0, 2, 2, 0], [0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]]);
        assert!(b.swipe(Direction::Left));
        assert_eq!(b.grid().cells()[0], [4, 0, 0, 0]);
        assert_eq!(b.score(), 15);
    }

    #[test]
    fn pure_compaction_scores_fifteen() {
        let mut b = board([[2, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 2]]);
        assert!(b.swipe(Direction::Left));
        assert_eq!(
            *b.grid().cells(),
            [[2, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0], [2, 0, 0, 0]]
        );
        assert_eq!(b.score(), SLIDE_POINTS + MOVE_POINTS);
    }

    #[test]
    fn compaction_after_merge_scores_fifteen() {
        let mut b = board([[2, 2, 4, 0], [0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]]);
        let slide = b.slide(Direction::Left);
        assert!(!slide.compacted && slide.merged && slide.closed);
        assert_eq!(b.grid().cells()[0], [4, 4, 0, 0]);
        assert_eq!(b.score(), SLIDE_POINTS + MOVE_POINTS);
    }

    #[test]
    fn both_compactions_moving_scores_twenty_five() {
        let mut b = board([[0, 4, 4, 16], [8, 2, 4, 8], [4, 4, 0, 16], [4, 4, 16, 2]]);
        let slide = b.slide(Direction::Up);
        assert!(slide.compacted && slide.merged && slide.closed);
        assert_eq!(
            *b.grid().cells(),
            [[8, 4, 8, 16], [8, 2, 16, 8], [0, 8, 0, 16], [0, 0, 0, 2]]
        );
        assert_eq!(b.score(), 2 * SLIDE_POINTS + MOVE_POINTS);
    }

    #[test]
    fn merge_leaving_no_gap_scores_five() {
        let mut b = board([[2, 2, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]]);
        let slide = b.slide(Direction::Left);
        assert!(!slide.compacted && !slide.closed);
        assert_eq!(b.grid().cells()[0], [4, 0, 0, 0]);
        assert_eq!(b.score(), MOVE_POINTS);
    }

    #[test]
    fn each_cell_merges_once_per_swipe() {
        let mut b = board([[2, 2, 2, 2], [4, 4, 8, 8], [0, 0, 0, 0], [0, 0, 0, 0]]);
        b.swipe(Direction::Left);
        assert_eq!(b.grid().cells()[0], [4, 4, 0, 0]);
        assert_eq!(b.grid().cells()[1], [8, 16, 0, 0]);
    }

    #[test]
    fn merge_favours_cells_nearest_the_edge() {
        let mut b = board([[0, 2, 2, 2], [0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]]);
        b.swipe(Direction::Right);
        assert_eq!(b.grid().cells()[0], [0, 0, 2, 4]);

        let mut b = board([[0, 2, 2, 2], [0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]]);
        b.swipe(Direction::Left);
        assert_eq!(b.grid().cells()[0], [4, 2, 0, 0]);
    }

    #[test]
    fn vertical_swipes_move_columns() {
        let mut b = board([[2, 0, 0, 0], [0, 0, 0, 0], [2, 0, 0, 0], [4, 0, 0, 8]]);
        assert!(b.swipe(Direction::Up));
        assert_eq!(
            *b.grid().cells(),
            [[4, 0, 0, 8], [4, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]]
        );

        let mut b = board([[2, 0, 0, 0], [0, 0, 0, 0], [2, 0, 0, 0], [4, 0, 0, 8]]);
        assert!(b.swipe(Direction::Down));
        assert_eq!(
            *b.grid().cells(),
            [[0, 0, 0, 0], [0, 0, 0, 0], [4, 0, 0, 0], [4, 0, 0, 8]]
        );
    }

    #[test]
    fn blocked_swipe_changes_nothing_and_scores_nothing() {
        let mut b = board([[2, 4, 0, 0], [8, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]]);
        let before = *b.grid();
        assert!(!b.swipe(Direction::Left));
        assert_eq!(*b.grid(), before);
        assert_eq!(b.score(), 0);
    }

    #[test]
    fn compaction_crosses_the_whole_line() {
        let mut g = Grid::new([[0, 0, 0, 8], [0, 4, 2, 8], [0, 0, 0, 0], [0, 0, 0, 0]]);
        assert!(g.compact(Direction::Left));
        assert_eq!(g.cells()[0], [8, 0, 0, 0]);
        assert_eq!(g.cells()[1], [4, 2, 8, 0]);
    }

    // ── swipe: invariants ──

    #[test]
    fn swipe_preserves_tile_sum() {
        for grid in all_grids() {
            for dir in Direction::ALL {
                let mut b = Board::from_grid(grid);
                b.swipe(dir);
                assert_eq!(b.grid().tile_sum(), grid.tile_sum(), "{:?} on\n{}", dir, grid);
            }
        }
    }

    #[test]
    fn swipe_never_adds_tiles() {
        for grid in all_grids() {
            for dir in Direction::ALL {
                let mut g = grid;
                let slide = g.slide(dir);
                assert!(tile_count(&g) <= tile_count(&grid));
                assert_eq!(slide.merged, tile_count(&g) < tile_count(&grid));
            }
        }
    }

    #[test]
    fn repeat_swipe_without_merge_is_a_no_op() {
        for grid in all_grids() {
            for dir in Direction::ALL {
                let mut g = grid;
                if g.slide(dir).merged { continue; }
                let settled = g;
                assert!(!g.slide(dir).changed, "{:?} on\n{}", dir, settled);
                assert_eq!(g, settled);
            }
        }
    }

    #[test]
    fn swipe_scores_only_whole_steps() {
        for grid in all_grids() {
            for dir in Direction::ALL {
                let mut b = Board::from_grid(grid);
                let changed = b.swipe(dir);
                let expected: &[u32] = if changed { &[5, 15, 25] } else { &[0] };
                assert!(expected.contains(&b.score()), "{} for {:?} on\n{}", b.score(), dir, grid);
            }
        }
    }

    #[test]
    fn checkerboard_cannot_move_anywhere() {
        for dir in Direction::ALL {
            let mut b = board(CHECKER);
            assert!(!b.swipe(dir));
            assert_eq!(b.score(), 0);
        }
    }

    // ── defeat ──

    #[test]
    fn full_board_without_pairs_is_defeated() {
        assert!(Grid::new(CHECKER).is_defeated());
    }

    #[test]
    fn empty_cell_is_never_defeat() {
        let mut cells = CHECKER;
        cells[2][1] = 0;
        assert!(!Grid::new(cells).is_defeated());
        assert!(!Grid::default().is_defeated());
    }

    #[test]
    fn horizontal_pair_prevents_defeat() {
        let mut cells = CHECKER;
        cells[3][3] = 4;
        assert!(!Grid::new(cells).is_defeated());
    }

    #[test]
    fn vertical_pair_prevents_defeat() {
        let mut cells = CHECKER;
        cells[0][0] = 4;
        assert!(!Grid::new(cells).is_defeated());
    }

    #[test]
    fn defeat_matches_neighbour_scan() {
        let mut grids = all_grids();
        // Few tile values so full boards land on both sides.
        grids.extend(random_grids(16, RANDOM_BOARDS, 3));
        let mut defeats = 0;
        for grid in &grids {
            assert_eq!(grid.is_defeated(), stuck(grid), "\n{}", grid);
            if grid.is_defeated() { defeats += 1; }
        }
        assert!(defeats > 0);
        assert!(defeats < grids.len());
    }

    #[test]
    fn defeated_board_blocks_every_swipe() {
        for grid in all_grids().into_iter().filter(Grid::is_defeated) {
            for dir in Direction::ALL {
                let mut g = grid;
                assert!(!g.slide(dir).changed, "{:?} on\n{}", dir, grid);
            }
        }
    }

    // ── spawn ──

    #[test]
    fn spawn_fills_an_empty_cell_with_two() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut g = Grid::new([[2, 4, 8, 16], [0, 4, 8, 16], [2, 4, 0, 16], [2, 4, 8, 16]]);
        let before = g.tile_sum();
        let (r, c) = g.spawn_tile(&mut rng).unwrap();
        assert!((r, c) == (1, 0) || (r, c) == (2, 2));
        assert_eq!(g.get(r, c), SPAWN_VALUE);
        assert_eq!(g.tile_sum(), before + 2);
    }

    #[test]
    fn spawn_is_reproducible_with_a_seed() {
        let spawn_all = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut g = Grid::default();
            (0..16).map(|_| g.spawn_tile(&mut rng).unwrap()).collect::<Vec<_>>()
        };
        assert_eq!(spawn_all(42), spawn_all(42));
    }

    #[test]
    fn spawn_on_full_board_reports_no_space() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut g = Grid::new(CHECKER);
        assert_eq!(g.spawn_tile(&mut rng), None);
        assert_eq!(g, Grid::new(CHECKER));
    }

    #[test]
    fn sixteen_spawns_fill_the_board() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut g = Grid::default();
        for _ in 0..16 {
            assert!(g.spawn_tile(&mut rng).is_some());
        }
        assert!(!g.has_empty());
        assert_eq!(g.tile_sum(), 32);
    }

    // ── misc ──

    #[test]
    fn restore_keeps_score() {
        let mut b = board([[0, 2, 2, 0], [0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]]);
        let before = *b.grid();
        b.swipe(Direction::Left);
        b.restore(before);
        assert_eq!(*b.grid(), before);
        assert_eq!(b.score(), 15);
    }

    #[test]
    fn display_pads_columns() {
        let g = Grid::new([[2, 0, 16, 0], [0, 0, 0, 0], [0, 0, 0, 0], [1024, 2, 0, 4]]);
        let text = g.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "2   0   16  0");
        assert_eq!(lines[3], "10242   0   4");
    }
}
