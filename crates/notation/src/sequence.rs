//! Batch execution of ordered command sequences.
//!
//! The editor's `processSequence` operation takes a list of commands and runs
//! them in order on its side, which keeps multi-step edits in one exchange.
//! [`run_sequence`](EditorClient::run_sequence) delivers the list verbatim;
//! [`run_sequence_stepwise`](EditorClient::run_sequence_stepwise) is the
//! client-side fallback that sends commands one at a time and stops at the
//! first rejection.

use serde::Serialize;
use serde_json::json;

use crate::action::Action;
use crate::client::EditorClient;
use crate::protocol::CommandResponse;

/// Result of a stepwise sequence run.
///
/// `steps` holds one reply per command sent, in order. When the run stopped
/// early, `failed_step` is the index of the command whose reply it stopped
/// on, and `steps` ends with that reply.
#[derive(Debug, Clone, Serialize)]
pub struct SequenceOutcome {
    pub steps: Vec<CommandResponse>,
    pub failed_step: Option<usize>,
}

impl SequenceOutcome {
    pub fn succeeded(&self) -> bool {
        self.failed_step.is_none()
    }
}

impl EditorClient {
    /// Hand the whole sequence to the editor in one `processSequence` command.
    ///
    /// The steps go out exactly as given, in order, including an empty list;
    /// the editor decides how a mid-sequence failure is reported.
    pub async fn run_sequence(&self, sequence: &[Action]) -> CommandResponse {
        self.call("processSequence", json!({ "sequence": sequence }))
            .await
    }

    /// Run the sequence one command at a time, stopping at the first reply
    /// that is not a success. Commands after the failed step are never sent.
    pub async fn run_sequence_stepwise(&self, sequence: &[Action]) -> SequenceOutcome {
        let mut steps = Vec::with_capacity(sequence.len());
        for (index, action) in sequence.iter().enumerate() {
            let response = self.send(action).await;
            let failed = !response.success;
            steps.push(response);
            if failed {
                return SequenceOutcome {
                    steps,
                    failed_step: Some(index),
                };
            }
        }
        SequenceOutcome {
            steps,
            failed_step: None,
        }
    }
}
