//! The shared match: two seats, one board, one turn indicator.
//!
//! All mutable state lives behind a single mutex. Every operation that
//! changes it also queues the resulting notifications before the lock is
//! released, so two mutations can never interleave their broadcasts.

use crate::games::tictactoe::{Board, CellIndex, Mark, check_win, is_draw};
use crate::protocol::{ServerMessage, Winner};
use derive_more::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

/// Queue feeding one connection's write side.
pub type Outbox = mpsc::UnboundedSender<ServerMessage>;

/// Process-unique identifier of an accepted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display("conn-{}", _0)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Allocates the next identifier.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// One of the two player slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display)]
pub enum SeatId {
    /// Plays `X` and moves first.
    #[default]
    #[display("first")]
    First,
    /// Plays `O`.
    #[display("second")]
    Second,
}

impl SeatId {
    /// Both seats in admission order.
    pub const ALL: [SeatId; 2] = [SeatId::First, SeatId::Second];

    /// Symbol played from this seat.
    pub fn mark(self) -> Mark {
        match self {
            SeatId::First => Mark::X,
            SeatId::Second => Mark::O,
        }
    }

    /// The opposite seat.
    pub fn other(self) -> Self {
        match self {
            SeatId::First => SeatId::Second,
            SeatId::Second => SeatId::First,
        }
    }

    fn slot(self) -> usize {
        match self {
            SeatId::First => 0,
            SeatId::Second => 1,
        }
    }
}

/// Result of asking for a seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The connection now owns `seat`.
    Seated {
        /// Seat assigned.
        seat: SeatId,
        /// Symbol of that seat.
        mark: Mark,
        /// Whether the other seat was already owned.
        opponent_present: bool,
    },
    /// Both seats are owned.
    Full,
}

/// Why a move was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum MoveRejection {
    /// Index text is not an integer in 0..=8.
    #[display("invalid cell index {:?}", _0)]
    InvalidIndex(String),
    /// The connection owns no seat.
    #[display("connection holds no seat")]
    NotSeated,
    /// The sender's seat does not hold the turn.
    #[display("not the {} seat's turn", _0)]
    NotYourTurn(SeatId),
    /// Target cell already holds a mark.
    #[display("cell {} is occupied", _0)]
    Occupied(CellIndex),
}

/// Result of a move request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Move applied; the turn passed to the other seat.
    Continue,
    /// Move applied and finished the game; the board has been reset.
    Ended(Winner),
    /// Move ignored. No state changed and nothing was sent.
    Rejected(MoveRejection),
}

#[derive(Debug)]
struct Occupant {
    connection: ConnectionId,
    outbox: Outbox,
}

#[derive(Debug, Default)]
struct SessionState {
    seats: [Option<Occupant>; 2],
    board: Board,
    turn: SeatId,
}

impl SessionState {
    fn occupant(&self, seat: SeatId) -> Option<&Occupant> {
        self.seats[seat.slot()].as_ref()
    }

    fn seat_of(&self, connection: ConnectionId) -> Option<SeatId> {
        SeatId::ALL.into_iter().find(|&seat| {
            self.occupant(seat)
                .is_some_and(|occupant| occupant.connection == connection)
        })
    }

    fn send(&self, seat: SeatId, message: ServerMessage) {
        if let Some(occupant) = self.occupant(seat)
            && occupant.outbox.send(message).is_err()
        {
            debug!(%seat, connection = %occupant.connection, "Outbox closed, dropping message");
        }
    }

    fn broadcast_update(&self) {
        for seat in SeatId::ALL {
            self.send(
                seat,
                ServerMessage::Update {
                    board: self.board.clone(),
                    my_turn: seat == self.turn,
                },
            );
        }
    }

    fn broadcast_end(&self, board: &Board, winner: Winner) {
        for seat in SeatId::ALL {
            self.send(
                seat,
                ServerMessage::End {
                    board: board.clone(),
                    winner,
                },
            );
        }
    }
}

/// The single live match.
#[derive(Debug, Default)]
pub struct Session {
    state: Mutex<SessionState>,
}

impl Session {
    /// Creates a session with empty seats and an empty board.
    #[instrument]
    pub fn new() -> Self {
        info!("Creating game session");
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned: PoisonError<_>| {
            warn!("Session lock poisoned, recovering state");
            poisoned.into_inner()
        })
    }

    /// Assigns the first free seat to `connection` and queues the admission
    /// notifications.
    #[instrument(skip(self, outbox))]
    pub fn try_admit(&self, connection: ConnectionId, outbox: Outbox) -> Admission {
        let mut state = self.lock();

        let Some(seat) = SeatId::ALL
            .into_iter()
            .find(|&seat| state.occupant(seat).is_none())
        else {
            warn!("Both seats taken, refusing connection");
            return Admission::Full;
        };

        let opponent_present = state.occupant(seat.other()).is_some();
        state.seats[seat.slot()] = Some(Occupant { connection, outbox });
        info!(%seat, mark = %seat.mark(), opponent_present, "Connection seated");

        state.send(seat, ServerMessage::Start { symbol: seat.mark() });
        if opponent_present {
            if seat == SeatId::First {
                // The second seat outlived a previous first player.
                state.send(
                    SeatId::Second,
                    ServerMessage::Start {
                        symbol: SeatId::Second.mark(),
                    },
                );
            }
            state.broadcast_update();
        }

        Admission::Seated {
            seat,
            mark: seat.mark(),
            opponent_present,
        }
    }

    /// Applies a move from `connection` on the cell named by `index`.
    ///
    /// Illegal moves are dropped without changing state or sending anything.
    #[instrument(skip(self))]
    pub fn apply_move(&self, connection: ConnectionId, index: &str) -> MoveOutcome {
        let Ok(cell) = index.parse::<CellIndex>() else {
            return Self::reject(MoveRejection::InvalidIndex(index.to_string()));
        };

        let mut state = self.lock();

        let Some(seat) = state.seat_of(connection) else {
            return Self::reject(MoveRejection::NotSeated);
        };
        if seat != state.turn {
            return Self::reject(MoveRejection::NotYourTurn(seat));
        }
        let mark = seat.mark();
        if state.board.place(cell, mark).is_err() {
            return Self::reject(MoveRejection::Occupied(cell));
        }
        debug!(%seat, %cell, %mark, "Move accepted");

        let winner = if check_win(&state.board, mark) {
            Some(Winner::Mark(mark))
        } else if is_draw(&state.board) {
            Some(Winner::Draw)
        } else {
            None
        };

        match winner {
            Some(winner) => {
                let final_board = std::mem::take(&mut state.board);
                info!(%winner, board = %final_board.display(), "Game over, board reset");
                state.broadcast_end(&final_board, winner);
                MoveOutcome::Ended(winner)
            }
            None => {
                state.turn = seat.other();
                state.broadcast_update();
                MoveOutcome::Continue
            }
        }
    }

    fn reject(reason: MoveRejection) -> MoveOutcome {
        debug!(%reason, "Move rejected");
        MoveOutcome::Rejected(reason)
    }

    /// Clears the board and hands the turn to the first seat.
    #[instrument(skip(self))]
    pub fn restart(&self) {
        let mut state = self.lock();
        state.board = Board::new();
        state.turn = SeatId::First;
        info!("Game restarted");
        state.broadcast_update();
    }

    /// Frees the seat owned by `connection`, if any. Board and turn are left
    /// untouched and the remaining player is not notified.
    #[instrument(skip(self))]
    pub fn release(&self, connection: ConnectionId) -> Option<SeatId> {
        let mut state = self.lock();
        let seat = state.seat_of(connection)?;
        state.seats[seat.slot()] = None;
        info!(%seat, "Seat released");
        Some(seat)
    }

    /// Snapshot of the board.
    pub fn board(&self) -> Board {
        self.lock().board.clone()
    }

    /// Seat that moves next.
    pub fn turn(&self) -> SeatId {
        self.lock().turn
    }

    /// Connection owning `seat`, if any.
    pub fn occupant(&self, seat: SeatId) -> Option<ConnectionId> {
        self.lock().occupant(seat).map(|occupant| occupant.connection)
    }

    /// Seat owned by `connection`, if any.
    pub fn seat_of(&self, connection: ConnectionId) -> Option<SeatId> {
        self.lock().seat_of(connection)
    }

    /// Whether both seats are owned.
    pub fn is_full(&self) -> bool {
        let state = self.lock();
        SeatId::ALL
            .into_iter()
            .all(|seat| state.occupant(seat).is_some())
    }
}
