//! Wire messages exchanged with browser clients.
//!
//! Every frame is a JSON object tagged by `"type"`. Server and client
//! messages are separate sum types, so each kind carries exactly the fields
//! that mean something for it.

use crate::games::tictactoe::{Board, Mark};
use derive_more::{Display, Error};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Literal sent as the winner of a drawn game.
pub const DRAW: &str = "draw";

/// Result of a finished game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Winner {
    /// A mark completed a line.
    #[display("{}", _0)]
    Mark(Mark),
    /// The board filled up without a line.
    #[display("draw")]
    Draw,
}

impl Serialize for Winner {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Winner::Mark(mark) => serializer.serialize_str(mark.as_str()),
            Winner::Draw => serializer.serialize_str(DRAW),
        }
    }
}

impl<'de> Deserialize<'de> for Winner {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match raw.as_str() {
            "X" => Ok(Winner::Mark(Mark::X)),
            "O" => Ok(Winner::Mark(Mark::O)),
            DRAW => Ok(Winner::Draw),
            other => Err(serde::de::Error::custom(format!("invalid winner: {other:?}"))),
        }
    }
}

/// Messages the server sends to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Seat assigned; tells the client its symbol.
    Start {
        /// Symbol of the recipient's seat.
        symbol: Mark,
    },
    /// Current board and whether the recipient moves next.
    Update {
        /// Board snapshot.
        board: Board,
        /// True iff the recipient holds the turn.
        #[serde(rename = "myTurn")]
        my_turn: bool,
    },
    /// A game finished.
    End {
        /// Final board, before the reset.
        board: Board,
        /// Winning symbol or the draw marker.
        winner: Winner,
    },
    /// Both seats are taken.
    Full,
}

/// Messages a client sends to the server.
///
/// Decoding is lenient about shape: a missing or null `type` is an
/// [`Unknown`](ClientMessage::Unknown) message and a missing or null `index`
/// is empty. Invalid JSON and wrongly typed fields are still errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    /// Place the sender's symbol on a cell.
    Move {
        /// Target cell as text; validated by the session.
        index: String,
    },
    /// Reset the board and hand the turn to the first seat.
    Restart,
    /// Any kind the server does not know, including none at all. Ignored.
    Unknown,
}

/// Inbound frame as it appears on the wire, before the kind is resolved.
#[derive(Deserialize)]
struct RawClientMessage {
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    index: Option<String>,
}

impl From<RawClientMessage> for ClientMessage {
    fn from(raw: RawClientMessage) -> Self {
        match raw.kind.as_deref() {
            Some("move") => ClientMessage::Move {
                index: raw.index.unwrap_or_default(),
            },
            Some("restart") => ClientMessage::Restart,
            _ => ClientMessage::Unknown,
        }
    }
}

impl<'de> Deserialize<'de> for ClientMessage {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        RawClientMessage::deserialize(deserializer).map(ClientMessage::from)
    }
}

impl ClientMessage {
    /// Convenience constructor for a move on `index`.
    pub fn move_to(index: usize) -> Self {
        ClientMessage::Move {
            index: index.to_string(),
        }
    }
}

/// A frame could not be encoded or decoded.
#[derive(Debug, Clone, Display, Error)]
#[display("Codec error: {} at {}:{}", message, file, line)]
pub struct CodecError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl CodecError {
    /// Creates a new codec error with caller location tracking.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

impl From<serde_json::Error> for CodecError {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        Self::new(format!("JSON error: {}", err))
    }
}

/// Encodes a message as a text frame.
#[instrument(skip(message), level = "trace")]
pub fn encode<T: Serialize>(message: &T) -> Result<String, CodecError> {
    Ok(serde_json::to_string(message)?)
}

/// Decodes a text frame.
#[instrument(skip(frame), level = "trace", fields(len = frame.len()))]
pub fn decode<T: DeserializeOwned>(frame: &str) -> Result<T, CodecError> {
    Ok(serde_json::from_str(frame)?)
}
