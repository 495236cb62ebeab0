//! Core domain types for tic-tac-toe.

use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::instrument;

/// Symbol written into board cells.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, strum::EnumIter,
)]
pub enum Mark {
    /// Mark of the first seat (moves first).
    X,
    /// Mark of the second seat.
    O,
}

impl Mark {
    /// Wire spelling of the mark.
    pub fn as_str(self) -> &'static str {
        match self {
            Mark::X => "X",
            Mark::O => "O",
        }
    }
}

/// A square on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Square {
    /// Empty square.
    #[default]
    Empty,
    /// Square taken by a mark.
    Occupied(Mark),
}

impl Square {
    /// Wire spelling of the square: `""`, `"X"` or `"O"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Square::Empty => "",
            Square::Occupied(mark) => mark.as_str(),
        }
    }

    /// Parses the wire spelling of a square.
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "" => Some(Square::Empty),
            "X" => Some(Square::Occupied(Mark::X)),
            "O" => Some(Square::Occupied(Mark::O)),
            _ => None,
        }
    }
}

impl Serialize for Square {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Square {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Square::from_wire(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid square: {raw:?}")))
    }
}

/// Index of a cell on the board, guaranteed to be in `0..=8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display("{}", _0)]
pub struct CellIndex(usize);

impl CellIndex {
    /// All nine cells in row-major order.
    pub const ALL: [CellIndex; 9] = [
        CellIndex(0),
        CellIndex(1),
        CellIndex(2),
        CellIndex(3),
        CellIndex(4),
        CellIndex(5),
        CellIndex(6),
        CellIndex(7),
        CellIndex(8),
    ];

    /// Creates an index, or `None` when out of range.
    pub fn new(index: usize) -> Option<Self> {
        (index < 9).then_some(Self(index))
    }

    /// Raw row-major position.
    pub fn get(self) -> usize {
        self.0
    }
}

/// Error returned when text is not a cell index.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
#[display("not a cell index (0-8): {:?}", input)]
pub struct ParseCellIndexError {
    /// The rejected input.
    pub input: String,
}

impl FromStr for CellIndex {
    type Err = ParseCellIndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<usize>()
            .ok()
            .and_then(CellIndex::new)
            .ok_or_else(|| ParseCellIndexError {
                input: s.to_string(),
            })
    }
}

/// Board operation failure.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum BoardError {
    /// Target cell already holds a mark.
    #[display("cell {} is already occupied", _0)]
    Occupied(#[error(not(source))] CellIndex),
}

/// 3x3 tic-tac-toe board.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board {
    /// Squares in row-major order (0-8).
    squares: [Square; 9],
}

impl Board {
    /// Creates a new empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the square at the given cell.
    pub fn get(&self, index: CellIndex) -> Square {
        self.squares[index.get()]
    }

    /// Checks if a cell is empty.
    pub fn is_empty(&self, index: CellIndex) -> bool {
        self.get(index) == Square::Empty
    }

    /// Writes `mark` into an empty cell.
    #[instrument(skip(self))]
    pub fn place(&mut self, index: CellIndex, mark: Mark) -> Result<(), BoardError> {
        if !self.is_empty(index) {
            return Err(BoardError::Occupied(index));
        }
        self.squares[index.get()] = Square::Occupied(mark);
        Ok(())
    }

    /// Returns all squares.
    pub fn squares(&self) -> &[Square; 9] {
        &self.squares
    }

    /// Formats the board as a human-readable string.
    pub fn display(&self) -> String {
        let mut result = String::new();
        for row in 0..3 {
            for col in 0..3 {
                let pos = row * 3 + col;
                match self.squares[pos] {
                    Square::Empty => result.push('.'),
                    Square::Occupied(mark) => result.push_str(mark.as_str()),
                }
                if col < 2 {
                    result.push('|');
                }
            }
            if row < 2 {
                result.push_str("\n-+-+-\n");
            }
        }
        result
    }
}

impl From<[Square; 9]> for Board {
    fn from(squares: [Square; 9]) -> Self {
        Self { squares }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_index_parsing() {
        assert_eq!("0".parse::<CellIndex>().map(CellIndex::get), Ok(0));
        assert_eq!(" 8 ".parse::<CellIndex>().map(CellIndex::get), Ok(8));
        assert!("9".parse::<CellIndex>().is_err());
        assert!("-1".parse::<CellIndex>().is_err());
        assert!("".parse::<CellIndex>().is_err());
        assert!("four".parse::<CellIndex>().is_err());
    }

    #[test]
    fn test_place_refuses_occupied_cell() {
        let mut board = Board::new();
        let center = CellIndex::ALL[4];
        board.place(center, Mark::X).expect("empty cell");
        assert_eq!(board.place(center, Mark::O), Err(BoardError::Occupied(center)));
        assert_eq!(board.get(center), Square::Occupied(Mark::X));
    }

    #[test]
    fn test_board_serializes_as_cells() {
        let mut board = Board::new();
        board.place(CellIndex::ALL[0], Mark::X).expect("empty cell");
        board.place(CellIndex::ALL[8], Mark::O).expect("empty cell");
        let json = serde_json::to_string(&board).expect("serializable");
        assert_eq!(json, r#"["X","","","","","","","","O"]"#);
    }

    #[test]
    fn test_display() {
        let mut board = Board::new();
        board.place(CellIndex::ALL[4], Mark::O).expect("empty cell");
        assert_eq!(board.display(), ".|.|.\n-+-+-\n.|O|.\n-+-+-\n.|.|.");
    }
}
