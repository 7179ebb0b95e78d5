//! Client library for a notation editor's WebSocket command API.
//!
//! The editor is a remote, stateful application that owns the score; this
//! crate turns typed [`Action`]s into request/response exchanges over one
//! persistent channel and hands back the editor's structured replies. No
//! document state is kept on this side.

pub mod action;
pub mod client;
pub mod error;
pub mod protocol;
pub mod sequence;

pub use action::{Action, Fraction};
pub use client::{EditorClient, DEFAULT_EDITOR_HOST, DEFAULT_EDITOR_PORT};
pub use error::{NotationError, Result};
pub use protocol::CommandResponse;
pub use sequence::SequenceOutcome;
