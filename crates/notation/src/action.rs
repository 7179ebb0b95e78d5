//! Typed editor operations and their wire encoding.
//!
//! Every command the editor understands is one [`Action`] variant, and the
//! serde representation of a variant is exactly the request frame the editor
//! expects: `{"action": <name>, "params": <object>}`. Unrecognized operation
//! names are unrepresentable locally, and parameter shapes are checked when a
//! sequence is deserialized, before anything goes out on the wire.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A duration or ratio as a numerator/denominator pair.
///
/// Durations are fractions of a whole note (1/4 is a quarter note); tuplet
/// ratios are played-notes over written-notes (3/2 is a triplet).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Fraction {
    pub numerator: u32,
    pub denominator: u32,
}

impl Fraction {
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }
}

/// One editor command with its parameters.
///
/// The variants are the closed set of operations the editor's WebSocket API
/// recognizes. Parameterless commands still carry an empty `params` object on
/// the wire, which is why every variant uses struct syntax.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(
    tag = "action",
    content = "params",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum Action {
    /// Liveness check; the editor echoes back.
    Ping {},
    /// Information about the currently open score.
    GetScore {},
    /// Current cursor position (staff, measure, beat).
    GetCursorInfo {},
    /// Move the cursor to a specific measure.
    GoToMeasure { measure: u32 },
    GoToFinalMeasure {},
    GoToBeginningOfScore {},
    NextElement {},
    PrevElement {},
    NextStaff {},
    PrevStaff {},
    SelectCurrentMeasure {},
    /// Enter a note at the cursor.
    AddNote {
        /// MIDI pitch, 0-127.
        pitch: u8,
        duration: Fraction,
        advance_cursor_after_action: bool,
    },
    AddRest {
        duration: Fraction,
        advance_cursor_after_action: bool,
    },
    AddTuplet {
        duration: Fraction,
        ratio: Fraction,
        advance_cursor_after_action: bool,
    },
    /// Attach one syllable per note, starting at the cursor.
    AddLyrics { lyrics: Vec<String>, verse: u32 },
    InsertMeasure {},
    AppendMeasure { count: u32 },
    /// Delete the current selection, or a specific measure when given.
    DeleteSelection {
        #[serde(skip_serializing_if = "Option::is_none")]
        measure: Option<u32>,
    },
    Undo {},
    AddInstrument { instrument_id: String },
    SetStaffMute { staff: u32, mute: bool },
    SetInstrumentSound { staff: u32, instrument_id: String },
    SetTimeSignature { numerator: u32, denominator: u32 },
}

impl Action {
    /// Wire name of the operation.
    pub fn name(&self) -> &'static str {
        match self {
            Action::Ping { .. } => "ping",
            Action::GetScore { .. } => "getScore",
            Action::GetCursorInfo { .. } => "getCursorInfo",
            Action::GoToMeasure { .. } => "goToMeasure",
            Action::GoToFinalMeasure { .. } => "goToFinalMeasure",
            Action::GoToBeginningOfScore { .. } => "goToBeginningOfScore",
            Action::NextElement { .. } => "nextElement",
            Action::PrevElement { .. } => "prevElement",
            Action::NextStaff { .. } => "nextStaff",
            Action::PrevStaff { .. } => "prevStaff",
            Action::SelectCurrentMeasure { .. } => "selectCurrentMeasure",
            Action::AddNote { .. } => "addNote",
            Action::AddRest { .. } => "addRest",
            Action::AddTuplet { .. } => "addTuplet",
            Action::AddLyrics { .. } => "addLyrics",
            Action::InsertMeasure { .. } => "insertMeasure",
            Action::AppendMeasure { .. } => "appendMeasure",
            Action::DeleteSelection { .. } => "deleteSelection",
            Action::Undo { .. } => "undo",
            Action::AddInstrument { .. } => "addInstrument",
            Action::SetStaffMute { .. } => "setStaffMute",
            Action::SetInstrumentSound { .. } => "setInstrumentSound",
            Action::SetTimeSignature { .. } => "setTimeSignature",
        }
    }
}
