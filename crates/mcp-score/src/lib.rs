//! MCP Server for a Notation Editor
//!
//! This crate provides an MCP (Model Context Protocol) server that lets AI
//! models drive a notation editor over its WebSocket command API: navigate
//! the score, enter notes and rests, manage instruments, and run multi-step
//! edits as one batch.
//!
//! The server exposes tools like:
//! - `add_note` / `add_rest` / `add_tuplet` - Enter music at the cursor
//! - `go_to_measure` / `next_element` - Move the cursor around the score
//! - `process_sequence` - Run an ordered list of commands in one exchange
//! - `get_score` / `get_cursor_info` - Inspect the open score
//!
//! Editor rejections and connection faults surface as error tool results,
//! never as MCP protocol errors, so a model can read what went wrong and
//! decide what to do next.

use notation::{
    Action, CommandResponse, EditorClient, Fraction, DEFAULT_EDITOR_HOST, DEFAULT_EDITOR_PORT,
};
use rmcp::{
    handler::server::{router::tool::ToolRouter, tool::Parameters},
    model::{ErrorData as McpError, *},
    tool, tool_handler, tool_router, ServerHandler,
};
use serde::Deserialize;
use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;
use tracing::info;

/// MIDI pitch entered when a note request leaves it out (E4).
const DEFAULT_PITCH: u8 = 64;
/// Quarter note.
const DEFAULT_DURATION: Fraction = Fraction::new(1, 4);
/// Triplet: three played in the time of two written.
const DEFAULT_TUPLET_RATIO: Fraction = Fraction::new(3, 2);

/// Request to move the cursor to a measure
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GoToMeasureRequest {
    /// The measure number to move to
    #[schemars(description = "Measure number to move the cursor to (1-based)")]
    pub measure: u32,
}

/// Request to enter a note at the cursor
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddNoteRequest {
    /// MIDI pitch of the note (default: 64, E4)
    #[schemars(description = "MIDI pitch 0-127 (default: 64, which is E4)")]
    pub pitch: Option<u8>,

    /// Duration as a fraction of a whole note (default: 1/4)
    #[schemars(description = "Note duration as a fraction of a whole note (default: 1/4)")]
    pub duration: Option<Fraction>,

    /// Whether to advance the cursor afterwards (default: true)
    #[schemars(description = "Advance the cursor past the new note (default: true)")]
    pub advance_cursor_after_action: Option<bool>,
}

/// Request to enter a rest at the cursor
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddRestRequest {
    /// Duration as a fraction of a whole note (default: 1/4)
    #[schemars(description = "Rest duration as a fraction of a whole note (default: 1/4)")]
    pub duration: Option<Fraction>,

    /// Whether to advance the cursor afterwards (default: true)
    #[schemars(description = "Advance the cursor past the new rest (default: true)")]
    pub advance_cursor_after_action: Option<bool>,
}

/// Request to enter a tuplet at the cursor
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddTupletRequest {
    /// Total duration of the tuplet (default: 1/4)
    #[schemars(description = "Total tuplet duration as a fraction of a whole note (default: 1/4)")]
    pub duration: Option<Fraction>,

    /// Played-over-written ratio (default: 3/2, a triplet)
    #[schemars(description = "Played notes over written notes (default: 3/2, a triplet)")]
    pub ratio: Option<Fraction>,

    /// Whether to advance the cursor afterwards (default: true)
    #[schemars(description = "Advance the cursor past the tuplet (default: true)")]
    pub advance_cursor_after_action: Option<bool>,
}

/// Request to attach lyrics starting at the cursor
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddLyricsRequest {
    /// One syllable per note, in order
    #[schemars(description = "Syllables to attach, one per note starting at the cursor")]
    pub lyrics: Vec<String>,

    /// Verse to place the syllables in (default: 0)
    #[schemars(description = "Verse number for the syllables (default: 0, the first verse)")]
    pub verse: Option<u32>,
}

/// Request to append measures at the end of the score
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AppendMeasureRequest {
    /// How many measures to append (default: 1)
    #[schemars(description = "Number of measures to append (default: 1)")]
    pub count: Option<u32>,
}

/// Request to delete the selection or a specific measure
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DeleteSelectionRequest {
    /// Measure to delete; omit to delete the current selection
    #[schemars(description = "Measure number to delete; omit to delete the current selection")]
    pub measure: Option<u32>,
}

/// Request to add an instrument to the score
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddInstrumentRequest {
    /// Editor instrument identifier (e.g. "violin")
    #[schemars(description = "Instrument identifier as the editor knows it (e.g. 'violin')")]
    pub instrument_id: String,
}

/// Request to mute or unmute a staff
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetStaffMuteRequest {
    /// Staff index, top staff is 0
    #[schemars(description = "Staff index, counting from 0 at the top of the score")]
    pub staff: u32,

    /// True to mute, false to unmute
    #[schemars(description = "True to mute the staff, false to unmute it")]
    pub mute: bool,
}

/// Request to change the playback sound of a staff
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetInstrumentSoundRequest {
    /// Staff index, top staff is 0
    #[schemars(description = "Staff index, counting from 0 at the top of the score")]
    pub staff: u32,

    /// Editor instrument identifier to switch the sound to
    #[schemars(description = "Instrument identifier to use for playback (e.g. 'flute')")]
    pub instrument_id: String,
}

/// Request to change the time signature
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetTimeSignatureRequest {
    /// Beats per measure (default: 4)
    #[schemars(description = "Beats per measure (default: 4)")]
    pub numerator: Option<u32>,

    /// Beat unit (default: 4)
    #[schemars(description = "Beat unit as a power of two (default: 4)")]
    pub denominator: Option<u32>,
}

/// Request to run an ordered list of commands
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ProcessSequenceRequest {
    /// The commands to run, in order
    #[schemars(description = "Commands to run in order, each {action, params}")]
    pub sequence: Vec<Action>,

    /// Run commands one at a time, stopping at the first failure (default: false)
    #[schemars(
        description = "Send commands one at a time and stop at the first failure instead of handing the whole batch to the editor (default: false)"
    )]
    pub stepwise: Option<bool>,
}

/// Score MCP Service
#[derive(Clone)]
pub struct ScoreService {
    client: Arc<EditorClient>,
    tool_router: ToolRouter<ScoreService>,
}

impl ScoreService {
    /// Create a new ScoreService talking to the given editor
    pub fn new(client: EditorClient) -> Self {
        Self {
            client: Arc::new(client),
            tool_router: Self::tool_router(),
        }
    }

    /// Send a typed command and turn the editor's reply into a tool result
    async fn forward(&self, action: Action) -> Result<CallToolResult, McpError> {
        let response = self.client.send(&action).await;
        Self::render(response)
    }

    /// Render a reply as JSON text; rejections become error results, not
    /// protocol errors, so the model can read them and react.
    fn render(response: CommandResponse) -> Result<CallToolResult, McpError> {
        let text = serde_json::to_string_pretty(&response).map_err(|e| McpError {
            code: ErrorCode(-32603),
            message: Cow::from(format!("Failed to render editor reply: {}", e)),
            data: None,
        })?;
        if response.success {
            Ok(CallToolResult::success(vec![Content::text(text)]))
        } else {
            Ok(CallToolResult::error(vec![Content::text(text)]))
        }
    }
}

#[tool_router]
impl ScoreService {
    #[tool(
        description = "Connect to the notation editor. Optional: every other tool connects on demand, but this verifies the editor is reachable before a longer session."
    )]
    async fn connect_to_editor(&self) -> Result<CallToolResult, McpError> {
        match self.client.connect().await {
            Ok(()) => Ok(CallToolResult::success(vec![Content::text(format!(
                "Connected to the editor at {}",
                self.client.uri()
            ))])),
            Err(e) => Ok(CallToolResult::error(vec![Content::text(format!(
                "Failed to connect to the editor at {}: {}",
                self.client.uri(),
                e
            ))])),
        }
    }

    #[tool(description = "Ping the editor to check it is responding.")]
    async fn ping_editor(&self) -> Result<CallToolResult, McpError> {
        self.forward(Action::Ping {}).await
    }

    #[tool(
        description = "Get information about the currently open score: title, instruments, measure count."
    )]
    async fn get_score(&self) -> Result<CallToolResult, McpError> {
        self.forward(Action::GetScore {}).await
    }

    #[tool(description = "Get the current cursor position: staff, measure, and beat.")]
    async fn get_cursor_info(&self) -> Result<CallToolResult, McpError> {
        self.forward(Action::GetCursorInfo {}).await
    }

    #[tool(description = "Move the cursor to a specific measure.")]
    async fn go_to_measure(
        &self,
        Parameters(request): Parameters<GoToMeasureRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.forward(Action::GoToMeasure {
            measure: request.measure,
        })
        .await
    }

    #[tool(description = "Move the cursor to the final measure of the score.")]
    async fn go_to_final_measure(&self) -> Result<CallToolResult, McpError> {
        self.forward(Action::GoToFinalMeasure {}).await
    }

    #[tool(description = "Move the cursor to the beginning of the score.")]
    async fn go_to_beginning_of_score(&self) -> Result<CallToolResult, McpError> {
        self.forward(Action::GoToBeginningOfScore {}).await
    }

    #[tool(description = "Move the cursor to the next element (note, rest, or chord).")]
    async fn next_element(&self) -> Result<CallToolResult, McpError> {
        self.forward(Action::NextElement {}).await
    }

    #[tool(description = "Move the cursor to the previous element (note, rest, or chord).")]
    async fn prev_element(&self) -> Result<CallToolResult, McpError> {
        self.forward(Action::PrevElement {}).await
    }

    #[tool(description = "Move the cursor down to the next staff.")]
    async fn next_staff(&self) -> Result<CallToolResult, McpError> {
        self.forward(Action::NextStaff {}).await
    }

    #[tool(description = "Move the cursor up to the previous staff.")]
    async fn prev_staff(&self) -> Result<CallToolResult, McpError> {
        self.forward(Action::PrevStaff {}).await
    }

    #[tool(description = "Select the whole measure under the cursor.")]
    async fn select_current_measure(&self) -> Result<CallToolResult, McpError> {
        self.forward(Action::SelectCurrentMeasure {}).await
    }

    #[tool(
        description = "Enter a note at the cursor. Defaults: pitch 64 (E4), duration 1/4, cursor advances afterwards."
    )]
    async fn add_note(
        &self,
        Parameters(request): Parameters<AddNoteRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.forward(Action::AddNote {
            pitch: request.pitch.unwrap_or(DEFAULT_PITCH),
            duration: request.duration.unwrap_or(DEFAULT_DURATION),
            advance_cursor_after_action: request.advance_cursor_after_action.unwrap_or(true),
        })
        .await
    }

    #[tool(
        description = "Enter a rest at the cursor. Defaults: duration 1/4, cursor advances afterwards."
    )]
    async fn add_rest(
        &self,
        Parameters(request): Parameters<AddRestRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.forward(Action::AddRest {
            duration: request.duration.unwrap_or(DEFAULT_DURATION),
            advance_cursor_after_action: request.advance_cursor_after_action.unwrap_or(true),
        })
        .await
    }

    #[tool(
        description = "Enter a tuplet at the cursor. Defaults: duration 1/4, ratio 3/2 (a triplet), cursor advances afterwards."
    )]
    async fn add_tuplet(
        &self,
        Parameters(request): Parameters<AddTupletRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.forward(Action::AddTuplet {
            duration: request.duration.unwrap_or(DEFAULT_DURATION),
            ratio: request.ratio.unwrap_or(DEFAULT_TUPLET_RATIO),
            advance_cursor_after_action: request.advance_cursor_after_action.unwrap_or(true),
        })
        .await
    }

    #[tool(
        description = "Attach lyrics starting at the cursor, one syllable per note. Defaults to verse 0."
    )]
    async fn add_lyrics(
        &self,
        Parameters(request): Parameters<AddLyricsRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.forward(Action::AddLyrics {
            lyrics: request.lyrics,
            verse: request.verse.unwrap_or(0),
        })
        .await
    }

    #[tool(description = "Insert a measure before the one under the cursor.")]
    async fn insert_measure(&self) -> Result<CallToolResult, McpError> {
        self.forward(Action::InsertMeasure {}).await
    }

    #[tool(description = "Append measures at the end of the score. Defaults to one measure.")]
    async fn append_measure(
        &self,
        Parameters(request): Parameters<AppendMeasureRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.forward(Action::AppendMeasure {
            count: request.count.unwrap_or(1),
        })
        .await
    }

    #[tool(
        description = "Delete the current selection, or a specific measure when a measure number is given."
    )]
    async fn delete_selection(
        &self,
        Parameters(request): Parameters<DeleteSelectionRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.forward(Action::DeleteSelection {
            measure: request.measure,
        })
        .await
    }

    #[tool(description = "Undo the last edit in the editor.")]
    async fn undo(&self) -> Result<CallToolResult, McpError> {
        self.forward(Action::Undo {}).await
    }

    #[tool(description = "Add an instrument to the score by its editor identifier.")]
    async fn add_instrument(
        &self,
        Parameters(request): Parameters<AddInstrumentRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.forward(Action::AddInstrument {
            instrument_id: request.instrument_id,
        })
        .await
    }

    #[tool(description = "Mute or unmute a staff for playback.")]
    async fn set_staff_mute(
        &self,
        Parameters(request): Parameters<SetStaffMuteRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.forward(Action::SetStaffMute {
            staff: request.staff,
            mute: request.mute,
        })
        .await
    }

    #[tool(description = "Change the playback sound of a staff to another instrument.")]
    async fn set_instrument_sound(
        &self,
        Parameters(request): Parameters<SetInstrumentSoundRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.forward(Action::SetInstrumentSound {
            staff: request.staff,
            instrument_id: request.instrument_id,
        })
        .await
    }

    #[tool(description = "Change the time signature at the cursor. Defaults to 4/4.")]
    async fn set_time_signature(
        &self,
        Parameters(request): Parameters<SetTimeSignatureRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.forward(Action::SetTimeSignature {
            numerator: request.numerator.unwrap_or(4),
            denominator: request.denominator.unwrap_or(4),
        })
        .await
    }

    #[tool(
        description = "Run an ordered list of commands. By default the whole batch is handed to the editor in one exchange; set stepwise to send commands one at a time and stop at the first failure."
    )]
    async fn process_sequence(
        &self,
        Parameters(request): Parameters<ProcessSequenceRequest>,
    ) -> Result<CallToolResult, McpError> {
        info!(
            steps = request.sequence.len(),
            stepwise = request.stepwise.unwrap_or(false),
            "Running command sequence"
        );

        if request.stepwise.unwrap_or(false) {
            let outcome = self.client.run_sequence_stepwise(&request.sequence).await;
            let text = serde_json::to_string_pretty(&outcome).map_err(|e| McpError {
                code: ErrorCode(-32603),
                message: Cow::from(format!("Failed to render sequence outcome: {}", e)),
                data: None,
            })?;
            if outcome.succeeded() {
                Ok(CallToolResult::success(vec![Content::text(text)]))
            } else {
                Ok(CallToolResult::error(vec![Content::text(text)]))
            }
        } else {
            let response = self.client.run_sequence(&request.sequence).await;
            Self::render(response)
        }
    }
}

#[tool_handler]
impl ServerHandler for ScoreService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "scorebridge".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            instructions: Some(
                "Use this server to drive a notation editor: navigate the score, \
                 enter notes, and manage instruments.\n\n\
                 Typical flow:\n\
                 - get_score / get_cursor_info: See what is open and where the cursor is\n\
                 - go_to_measure, next_element, next_staff: Move the cursor\n\
                 - add_note, add_rest, add_tuplet, add_lyrics: Enter music at the cursor\n\
                 - process_sequence: Run several commands in order in one exchange\n\n\
                 The editor must be running with its WebSocket API enabled. Rejected \
                 commands come back as error results with the editor's reason."
                    .to_string(),
            ),
        }
    }
}

/// Configuration from environment variables
pub struct ScoreServiceConfig {
    pub host: String,
    pub port: u16,
}

impl ScoreServiceConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        use anyhow::Context;

        let host = std::env::var("SCOREBRIDGE_EDITOR_HOST")
            .unwrap_or_else(|_| DEFAULT_EDITOR_HOST.to_string());

        let port = match std::env::var("SCOREBRIDGE_EDITOR_PORT") {
            Ok(value) => value
                .parse()
                .context("SCOREBRIDGE_EDITOR_PORT is not a valid port number")?,
            Err(_) => DEFAULT_EDITOR_PORT,
        };

        Ok(Self { host, port })
    }
}
