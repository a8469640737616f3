//! Navigation state machine types.

use cyrano_types::{InstructionRef, Sequence};
use futures_util::future::AbortHandle;

use crate::events::FetchRequest;

/// The trigger that may move past the displayed instruction unprompted.
///
/// One value, so a timer and a completion wiring can never coexist.
#[derive(Debug)]
pub(crate) enum ArmedTrigger {
    None,
    Timer(AbortHandle),
    Completion,
}

impl ArmedTrigger {
    /// Abort a pending timer and leave nothing armed.
    pub(crate) fn disarm(&mut self) {
        if let Self::Timer(handle) = std::mem::replace(self, Self::None) {
            handle.abort();
        }
    }

    /// Abort a pending timer; a completion wiring stays armed.
    pub(crate) fn cancel_timer(&mut self) {
        if matches!(self, Self::Timer(_)) {
            self.disarm();
        }
    }

    pub(crate) const fn kind(&self) -> TriggerKind {
        match self {
            Self::None => TriggerKind::None,
            Self::Timer(_) => TriggerKind::Timer,
            Self::Completion => TriggerKind::Completion,
        }
    }
}

/// Observable shape of [`ArmedTrigger`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    None,
    Timer,
    Completion,
}

#[derive(Debug)]
pub(crate) struct PendingLoad {
    pub(crate) request: FetchRequest,
    pub(crate) abort: AbortHandle,
}

#[derive(Debug)]
pub(crate) struct Display {
    pub(crate) sequence: Sequence,
    pub(crate) position: i64,
    pub(crate) trigger: ArmedTrigger,
    pub(crate) paused: bool,
}

impl Display {
    /// The displayed instruction. `position` is kept in range by every
    /// transition that writes it.
    pub(crate) fn current(&self) -> Option<InstructionRef<'_>> {
        self.sequence.get(self.position)
    }
}

#[derive(Debug, Default)]
pub(crate) enum NavState {
    #[default]
    Idle,
    Loading(PendingLoad),
    Displaying(Display),
}

impl NavState {
    pub(crate) const fn tag(&self) -> NavTag {
        match self {
            Self::Idle => NavTag::Idle,
            Self::Loading(_) => NavTag::Loading,
            Self::Displaying(_) => NavTag::Displaying,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavTag {
    Idle,
    Loading,
    Displaying,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NavEdge {
    StartLoad,
    ShowInstruction,
    Finish,
}

impl NavEdge {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::StartLoad => "start_load",
            Self::ShowInstruction => "show_instruction",
            Self::Finish => "finish",
        }
    }
}
