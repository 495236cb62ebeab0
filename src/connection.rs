//! Per-connection task: seat admission, receive loop, cleanup.

use crate::channel::MessageChannel;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::registry::Registry;
use crate::session::{Admission, ConnectionId, MoveOutcome, Session};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

/// Why a seated connection's loop ended.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
enum Disconnect {
    /// The client closed the channel.
    #[display("closed by client")]
    Closed,
    /// Receiving or decoding failed.
    #[display("receive failed: {}", _0)]
    ReceiveFailed(String),
    /// Writing a queued message failed.
    #[display("send failed: {}", _0)]
    SendFailed(String),
}

/// Clears the seat when the connection task ends, whichever way it ends.
#[derive(derive_new::new)]
struct SeatGuard {
    session: Arc<Session>,
    connection: ConnectionId,
}

impl Drop for SeatGuard {
    fn drop(&mut self) {
        self.session.release(self.connection);
    }
}

/// Runs one client connection to completion.
///
/// Seats the client in the registry's session, then relays session
/// notifications to the client and client requests to the session until the
/// channel fails or closes. The seat is released on every exit path.
#[instrument(skip_all, fields(connection))]
pub async fn handle_connection<C: MessageChannel>(mut channel: C, registry: Registry) {
    let connection = ConnectionId::next();
    tracing::Span::current().record("connection", tracing::field::display(connection));

    let session = registry.session();
    let (outbox, mut queued) = mpsc::unbounded_channel();

    match session.try_admit(connection, outbox) {
        Admission::Full => {
            info!("Session full, turning connection away");
            if let Err(e) = channel.send(&ServerMessage::Full).await {
                warn!(error = %e, "Failed to send full notice");
            }
            channel.close().await;
            return;
        }
        Admission::Seated { seat, mark, .. } => {
            info!(%seat, %mark, "Player joined");
        }
    }

    let guard = SeatGuard::new(Arc::clone(&session), connection);

    let reason = loop {
        tokio::select! {
            Some(message) = queued.recv() => {
                if let Err(e) = channel.send(&message).await {
                    break Disconnect::SendFailed(e.message);
                }
            }
            received = channel.receive() => match received {
                Ok(Some(message)) => dispatch(&session, connection, message),
                Ok(None) => break Disconnect::Closed,
                Err(e) => break Disconnect::ReceiveFailed(e.message),
            },
        }
    };

    match &reason {
        Disconnect::Closed => info!("Player left"),
        other => warn!(reason = %other, "Connection dropped"),
    }
    drop(guard);
    channel.close().await;
}

/// Forwards one client request into the session.
fn dispatch(session: &Session, connection: ConnectionId, message: ClientMessage) {
    match message {
        ClientMessage::Move { index } => match session.apply_move(connection, &index) {
            MoveOutcome::Ended(winner) => info!(%winner, "Game finished"),
            MoveOutcome::Continue | MoveOutcome::Rejected(_) => {}
        },
        ClientMessage::Restart => session.restart(),
        ClientMessage::Unknown => debug!("Ignoring unknown message kind"),
    }
}
