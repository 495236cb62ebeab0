//! Win detection logic for tic-tac-toe.

use super::super::{Board, Mark, Square};
use tracing::instrument;

/// The eight winning lines: rows, columns, diagonals.
pub const LINES: [[usize; 3]; 8] = [
    // Rows
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    // Columns
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    // Diagonals
    [0, 4, 8],
    [2, 4, 6],
];

/// Returns true iff some line holds `mark` in all three cells.
#[instrument(skip(board), level = "trace")]
pub fn check_win(board: &Board, mark: Mark) -> bool {
    let squares = board.squares();
    LINES
        .iter()
        .any(|line| line.iter().all(|&i| squares[i] == Square::Occupied(mark)))
}

/// Returns the mark holding a complete line, if any.
#[instrument(skip(board), level = "trace")]
pub fn check_winner(board: &Board) -> Option<Mark> {
    <Mark as strum::IntoEnumIterator>::iter().find(|&mark| check_win(board, mark))
}
