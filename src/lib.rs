//! Strictly Duel - two-player tic-tac-toe over WebSockets
//!
//! One shared match, two seats. Browsers connect to `/ws`; the first two
//! connections are seated as `X` and `O`, any further connection is told the
//! game is full. Moves and restarts are validated and applied under the
//! session lock, and the resulting state is pushed to both players.
//!
//! # Architecture
//!
//! - **Games**: pure tic-tac-toe board and rules
//! - **Protocol**: JSON wire messages
//! - **Session**: seats, board and turn behind one lock
//! - **Registry**: get-or-create holder of the live session
//! - **Connection**: per-connection task relaying between channel and session
//! - **Server**: axum router serving the page, assets and the WebSocket
//!
//! # Example
//!
//! ```no_run
//! use strictly_duel::{ServerConfig, serve};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ServerConfig::default().with_port(8080);
//! serve(&config).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod channel;
mod config;
mod connection;
mod games;
mod protocol;
mod registry;
mod server;
mod session;

// Crate-level exports - Board engine
pub use games::tictactoe::{
    Board, BoardError, CellIndex, Mark, ParseCellIndexError, Square, check_win, check_winner,
    is_draw, is_full,
};

// Crate-level exports - Wire protocol
pub use protocol::{ClientMessage, CodecError, DRAW, ServerMessage, Winner, decode, encode};

// Crate-level exports - Session management
pub use registry::Registry;
pub use session::{Admission, ConnectionId, MoveOutcome, MoveRejection, Outbox, SeatId, Session};

// Crate-level exports - Connections
pub use channel::{ChannelError, MemoryChannel, MemoryClient, MessageChannel, WebSocketChannel};
pub use connection::handle_connection;

// Crate-level exports - Server and configuration
pub use config::{ConfigError, ServerConfig};
pub use server::{AppState, router, serve, serve_on};
