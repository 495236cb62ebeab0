//! Tic-tac-toe board engine.

pub mod rules;
mod types;

pub use rules::{check_win, check_winner, is_draw, is_full};
pub use types::{Board, BoardError, CellIndex, Mark, ParseCellIndexError, Square};
