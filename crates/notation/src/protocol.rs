//! Request and response frames for the editor's WebSocket API.
//!
//! The editor speaks single-exchange JSON: one text frame out, one text frame
//! back, no correlation ids. Requests are `{"action", "params"}` and replies
//! are `{"success", "data"?, "error"?}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An outgoing command frame assembled from an operation name and a params
/// object. [`Action`](crate::Action) serializes to this shape directly; this
/// type exists for the untyped [`call`](crate::EditorClient::call) path.
#[derive(Debug, Serialize)]
pub(crate) struct CommandFrame<'a> {
    pub action: &'a str,
    pub params: &'a Value,
}

/// The editor's reply to a single command.
///
/// `success` defaults to `false` when absent: a reply that does not say it
/// succeeded is treated as a rejection, not trusted because it lacks an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CommandResponse {
    /// A locally synthesized failure reply, used when a command never reached
    /// the editor or its reply never made it back.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}
