/// Swipe directions and the line geometry they induce on the grid.
///
/// Every direction is an (axis, edge) pair. A *line* is one row for
/// horizontal swipes or one column for vertical swipes. Position `k`
/// along a line counts cells away from the edge the tiles travel toward,
/// so `k == 0` is always the destination cell. Compaction and merging are
/// written once against this numbering and work for all four directions.

/// Board side length. The board is always `SIZE x SIZE`.
pub const SIZE: usize = 4;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Which grid dimension a line runs along.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Axis {
    /// Lines are rows; tiles travel left or right.
    Row,
    /// Lines are columns; tiles travel up or down.
    Column,
}

/// Which end of the line tiles are pushed toward.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Edge {
    /// Index 0 (left column / top row).
    Low,
    /// Index `SIZE - 1` (right column / bottom row).
    High,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn axis(self) -> Axis {
        match self {
            Direction::Left | Direction::Right => Axis::Row,
            Direction::Up | Direction::Down => Axis::Column,
        }
    }

    pub fn edge(self) -> Edge {
        match self {
            Direction::Left | Direction::Up => Edge::Low,
            Direction::Right | Direction::Down => Edge::High,
        }
    }

    /// Grid `(row, col)` of the cell `k` steps away from the target edge
    /// on line `line`.
    #[inline]
    pub fn cell(self, line: usize, k: usize) -> (usize, usize) {
        let along = match self.edge() {
            Edge::Low => k,
            Edge::High => SIZE - 1 - k,
        };
        match self.axis() {
            Axis::Row => (line, along),
            Axis::Column => (along, line),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }
}
