//! Faults on the path between this client and the editor.
//!
//! These cover connection establishment, the transport itself, and replies
//! that do not parse. A well-formed reply with `success: false` is the editor
//! rejecting a command, and is not an error at this layer.

use thiserror::Error;
use tokio_tungstenite::tungstenite;

#[derive(Debug, Error)]
pub enum NotationError {
    /// The editor could not be reached at all.
    #[error("failed to connect to the editor: {0}")]
    Connect(String),

    /// The channel broke while a command was in flight.
    #[error("websocket transport error: {0}")]
    Transport(#[from] tungstenite::Error),

    /// The editor sent something that is not a reply frame.
    #[error("malformed response from the editor: {0}")]
    MalformedResponse(#[from] serde_json::Error),

    /// The editor closed the channel before replying.
    #[error("connection closed by the editor")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, NotationError>;
