//! Connection manager for the editor's WebSocket command API.

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::action::Action;
use crate::error::{NotationError, Result};
use crate::protocol::{CommandFrame, CommandResponse};

/// Host the editor listens on by default.
pub const DEFAULT_EDITOR_HOST: &str = "localhost";
/// Port the editor listens on by default.
pub const DEFAULT_EDITOR_PORT: u16 = 8765;

type EditorSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Client for the editor's command channel.
///
/// The client holds at most one WebSocket connection, established lazily on
/// the first command and re-established after any fault. The protocol has no
/// correlation ids, so replies are matched to commands purely by alternation;
/// the connection slot's lock is held across the whole send/receive exchange
/// to keep that alternation intact under concurrent callers.
///
/// Commands never surface transport problems to the caller: every fault is
/// absorbed into a `success: false` [`CommandResponse`] carrying the fault as
/// its error message.
pub struct EditorClient {
    uri: String,
    socket: Mutex<Option<EditorSocket>>,
}

impl EditorClient {
    /// Create a client for an editor at `host:port`. No I/O happens until the
    /// first command or an explicit [`connect`](Self::connect).
    pub fn new(host: impl AsRef<str>, port: u16) -> Self {
        Self {
            uri: format!("ws://{}:{}", host.as_ref(), port),
            socket: Mutex::new(None),
        }
    }

    /// The WebSocket URI this client dials.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Establish the connection up front. A no-op when already connected.
    pub async fn connect(&self) -> Result<()> {
        let mut slot = self.socket.lock().await;
        if slot.is_none() {
            *slot = Some(self.open_socket().await?);
        }
        Ok(())
    }

    /// Whether a connection is currently held.
    pub async fn is_connected(&self) -> bool {
        self.socket.lock().await.is_some()
    }

    /// Drop the connection, sending a close frame on a best-effort basis.
    /// The next command reconnects.
    pub async fn close(&self) {
        let socket = self.socket.lock().await.take();
        if let Some(mut socket) = socket {
            if let Err(err) = socket.close(None).await {
                debug!(error = %err, "close handshake failed");
            }
            info!("disconnected from the editor");
        }
    }

    /// Send a command by operation name and raw params object.
    ///
    /// Prefer [`send`](Self::send) with a typed [`Action`]; this path exists
    /// for callers that assemble commands dynamically.
    pub async fn call(&self, action: &str, params: Value) -> CommandResponse {
        let frame = CommandFrame {
            action,
            params: &params,
        };
        let text = match serde_json::to_string(&frame) {
            Ok(text) => text,
            Err(err) => {
                return CommandResponse::failure(format!("failed to encode command: {err}"));
            }
        };
        self.dispatch(action, text).await
    }

    /// Send a typed command and return the editor's reply.
    pub async fn send(&self, action: &Action) -> CommandResponse {
        let text = match serde_json::to_string(action) {
            Ok(text) => text,
            Err(err) => {
                return CommandResponse::failure(format!("failed to encode command: {err}"));
            }
        };
        self.dispatch(action.name(), text).await
    }

    async fn dispatch(&self, action: &str, frame: String) -> CommandResponse {
        debug!(action, "sending command");
        match self.exchange(frame).await {
            Ok(response) => {
                if !response.success {
                    debug!(
                        action,
                        error = response.error.as_deref().unwrap_or("unspecified"),
                        "editor rejected command"
                    );
                }
                response
            }
            Err(err) => {
                warn!(action, error = %err, "command failed");
                CommandResponse::failure(err.to_string())
            }
        }
    }

    /// One request/reply exchange, connecting first if needed. Holds the slot
    /// lock for the whole exchange so commands from concurrent tasks cannot
    /// interleave on the channel.
    async fn exchange(&self, frame: String) -> Result<CommandResponse> {
        let mut slot = self.socket.lock().await;
        if slot.is_none() {
            *slot = Some(self.open_socket().await?);
        }
        let socket = match slot.as_mut() {
            Some(socket) => socket,
            None => return Err(NotationError::Connect("connection slot empty".into())),
        };

        let outcome = Self::roundtrip(socket, frame).await;
        if outcome.is_err() {
            // The channel is out of alternation after any fault; drop it so
            // the next command reconnects.
            *slot = None;
        }
        outcome
    }

    async fn roundtrip(socket: &mut EditorSocket, frame: String) -> Result<CommandResponse> {
        socket.send(Message::Text(frame.into())).await?;
        loop {
            match socket.next().await {
                Some(Ok(Message::Text(text))) => return Ok(serde_json::from_str(&text)?),
                Some(Ok(Message::Close(_))) | None => return Err(NotationError::ConnectionClosed),
                // Ping/pong and other control frames between request and reply.
                Some(Ok(_)) => continue,
                Some(Err(err)) => return Err(err.into()),
            }
        }
    }

    async fn open_socket(&self) -> Result<EditorSocket> {
        match connect_async(&self.uri).await {
            Ok((socket, _)) => {
                info!(uri = %self.uri, "connected to the editor");
                Ok(socket)
            }
            Err(err) => {
                warn!(uri = %self.uri, error = %err, "connection failed");
                Err(NotationError::Connect(format!("{}: {err}", self.uri)))
            }
        }
    }
}
