//! Messages into and out of the engine.

use cyrano_types::{
    AdvanceMode, Controls, Generation, GroupId, InstructionId, InstructionKind, InstructionRef,
    MAX_BRANCHES, ScriptSummary,
};
use serde_json::Value;

use crate::playback::CompletionTag;
use crate::source::FetchError;

/// A request from the user interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Load a script and show its first instruction.
    StartScript(GroupId),
    /// Next button: advance by one if the instruction allows it.
    Next,
    /// Previous button: go back by one if the instruction allows it.
    Previous,
    /// Move relative to the current item number. Not gated.
    Advance(i64),
    /// Show the instruction at a 1-based position. Not gated.
    Goto(i64),
    /// Follow branch slot `0..MAX_BRANCHES`.
    Branch(usize),
    Pause,
    Resume,
    /// Stop button: abandon the script if the instruction allows it.
    Stop,
    /// Back action: always abandons the script.
    Exit,
    /// Fetch the list of available scripts.
    RefreshCatalog,
    /// Leave [`crate::NavigationEngine::run`].
    Shutdown,
}

/// What a sequence fetch was asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchRequest {
    /// A whole group, opened at 1-based position `requested`.
    Group { group: GroupId, requested: i64 },
    /// Whichever group the server resolves this instruction to, opened at it.
    Containing(InstructionId),
}

impl FetchRequest {
    #[must_use]
    pub const fn start_of(group: GroupId) -> Self {
        Self::Group {
            group,
            requested: 1,
        }
    }
}

/// Everything that may change engine state, funneled through one inbox.
#[derive(Debug)]
pub enum EngineEvent {
    Command(Command),
    SequenceLoaded {
        generation: Generation,
        request: FetchRequest,
        result: Result<Vec<Value>, FetchError>,
    },
    TimerFired {
        generation: Generation,
    },
    PlaybackCompleted(CompletionTag),
    CatalogLoaded {
        generation: Generation,
        result: Result<Vec<Value>, FetchError>,
    },
}

impl From<Command> for EngineEvent {
    fn from(command: Command) -> Self {
        Self::Command(command)
    }
}

/// Owned copy of what is on screen, taken after a transition completes.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplaySnapshot {
    pub group_id: GroupId,
    pub group_name: String,
    /// 1-based position inside the sequence.
    pub position: i64,
    pub len: usize,
    pub item_number: i64,
    pub name: String,
    pub description: String,
    pub kind: InstructionKind,
    pub filename: String,
    pub url: String,
    pub advance: AdvanceMode,
    pub controls: Controls,
    pub branch_labels: [Option<String>; MAX_BRANCHES],
}

impl DisplaySnapshot {
    #[must_use]
    pub fn capture(instruction: InstructionRef<'_>, len: usize) -> Self {
        Self {
            group_id: instruction.group().group_id(),
            group_name: instruction.group().name().to_string(),
            position: instruction.position(),
            len,
            item_number: instruction.item_number(),
            name: instruction.name().to_string(),
            description: instruction.description().to_string(),
            kind: instruction.kind(),
            filename: instruction.filename().to_string(),
            url: instruction.url().to_string(),
            advance: instruction.advance_mode(),
            controls: instruction.controls(),
            branch_labels: instruction.branch_labels(),
        }
    }

    #[must_use]
    pub fn has_branches(&self) -> bool {
        self.branch_labels.iter().any(Option::is_some)
    }
}

/// Notifications for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum PresentationEvent {
    ScriptLoading(FetchRequest),
    InstructionDisplayed(DisplaySnapshot),
    PauseChanged { paused: bool },
    /// The script ended or was abandoned; show the script picker.
    ScriptFinished,
    CatalogLoaded(Vec<ScriptSummary>),
}
