//! Bidirectional message channel between the server and one client.

use crate::protocol::{ClientMessage, CodecError, ServerMessage, decode, encode};
use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use derive_more::{Display, Error};
use tokio::sync::mpsc;
use tracing::{debug, instrument, trace};

/// Transport or decode failure on a channel.
#[derive(Debug, Clone, Display, Error)]
#[display("Channel error: {} at {}:{}", message, file, line)]
pub struct ChannelError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ChannelError {
    /// Creates a new channel error with caller location tracking.
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

impl From<CodecError> for ChannelError {
    #[track_caller]
    fn from(err: CodecError) -> Self {
        Self::new(format!("Decode failed: {}", err.message))
    }
}

impl From<axum::Error> for ChannelError {
    #[track_caller]
    fn from(err: axum::Error) -> Self {
        Self::new(format!("WebSocket error: {}", err))
    }
}

/// Message-level view of a client connection.
#[async_trait]
pub trait MessageChannel: Send {
    /// Sends one message.
    async fn send(&mut self, message: &ServerMessage) -> Result<(), ChannelError>;

    /// Waits for the next message. `Ok(None)` means the peer closed the
    /// channel. Cancel-safe: dropping the future loses no message.
    async fn receive(&mut self) -> Result<Option<ClientMessage>, ChannelError>;

    /// Closes the channel. Errors are ignored.
    async fn close(&mut self);
}

/// [`MessageChannel`] over an upgraded axum WebSocket.
#[derive(Debug, derive_new::new)]
pub struct WebSocketChannel {
    socket: WebSocket,
}

#[async_trait]
impl MessageChannel for WebSocketChannel {
    #[instrument(skip_all, level = "trace")]
    async fn send(&mut self, message: &ServerMessage) -> Result<(), ChannelError> {
        let text = encode(message)?;
        self.socket.send(Message::Text(text.into())).await?;
        Ok(())
    }

    async fn receive(&mut self) -> Result<Option<ClientMessage>, ChannelError> {
        loop {
            let frame = match self.socket.recv().await {
                None => return Ok(None),
                Some(frame) => frame?,
            };
            match frame {
                Message::Text(text) => return Ok(Some(decode(text.as_str())?)),
                Message::Binary(bytes) => {
                    let text = std::str::from_utf8(&bytes).map_err(|e| {
                        ChannelError::new(format!("Binary frame is not UTF-8: {}", e))
                    })?;
                    return Ok(Some(decode(text)?));
                }
                Message::Close(frame) => {
                    debug!(?frame, "Client sent close frame");
                    return Ok(None);
                }
                Message::Ping(_) | Message::Pong(_) => trace!("Control frame"),
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.socket.send(Message::Close(None)).await {
            debug!(error = %e, "Close frame not delivered");
        }
    }
}

/// In-memory [`MessageChannel`] carrying raw text frames.
///
/// Frames go through the same codec as the WebSocket channel, so tests can
/// feed malformed input.
#[derive(Debug)]
pub struct MemoryChannel {
    inbound: mpsc::UnboundedReceiver<String>,
    outbound: Option<mpsc::UnboundedSender<String>>,
}

/// Client end of a [`MemoryChannel`].
#[derive(Debug)]
pub struct MemoryClient {
    outbound: Option<mpsc::UnboundedSender<String>>,
    inbound: mpsc::UnboundedReceiver<String>,
}

impl MemoryChannel {
    /// Creates a connected server/client pair.
    pub fn pair() -> (MemoryChannel, MemoryClient) {
        let (to_server, from_client) = mpsc::unbounded_channel();
        let (to_client, from_server) = mpsc::unbounded_channel();
        (
            MemoryChannel {
                inbound: from_client,
                outbound: Some(to_client),
            },
            MemoryClient {
                outbound: Some(to_server),
                inbound: from_server,
            },
        )
    }
}

#[async_trait]
impl MessageChannel for MemoryChannel {
    async fn send(&mut self, message: &ServerMessage) -> Result<(), ChannelError> {
        let text = encode(message)?;
        self.outbound
            .as_ref()
            .ok_or_else(|| ChannelError::new("Channel closed"))?
            .send(text)
            .map_err(|_| ChannelError::new("Client went away"))
    }

    async fn receive(&mut self) -> Result<Option<ClientMessage>, ChannelError> {
        match self.inbound.recv().await {
            Some(text) => Ok(Some(decode(&text)?)),
            None => Ok(None),
        }
    }

    async fn close(&mut self) {
        self.outbound = None;
    }
}

impl MemoryClient {
    /// Sends a client message.
    pub fn send(&self, message: &ClientMessage) -> Result<(), ChannelError> {
        self.send_raw(&encode(message)?)
    }

    /// Sends a raw text frame.
    pub fn send_raw(&self, frame: &str) -> Result<(), ChannelError> {
        self.outbound
            .as_ref()
            .ok_or_else(|| ChannelError::new("Channel closed"))?
            .send(frame.to_string())
            .map_err(|_| ChannelError::new("Server went away"))
    }

    /// Waits for the next server message; `None` once the server closed.
    pub async fn recv(&mut self) -> Option<ServerMessage> {
        let text = self.inbound.recv().await?;
        decode(&text).ok()
    }

    /// Returns a server message if one is already queued.
    pub fn try_recv(&mut self) -> Option<ServerMessage> {
        let text = self.inbound.try_recv().ok()?;
        decode(&text).ok()
    }

    /// Hangs up; the server sees a clean close.
    pub fn close(&mut self) {
        self.outbound = None;
    }
}
