/// Pure game rules: no I/O, no terminal, no clock.

pub mod board;
pub mod direction;
