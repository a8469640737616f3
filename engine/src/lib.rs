//! Navigation and playback engine for Cyrano troubleshooting scripts.
//!
//! # Architecture
//!
//! - [`NavigationEngine`] owns the loaded [`cyrano_types::Sequence`] and the
//!   displayed position. All changes go through its inbox.
//! - [`PlaybackCoordinator`] maps instruction kinds onto an [`AudioOutput`]
//!   and wires completion notifications back to the inbox.
//! - [`SequenceSource`] fetches raw records; [`cyrano_providers::ScriptServer`]
//!   is the HTTP implementation.
//!
//! # States
//!
//! | State | Meaning |
//! |-------|---------|
//! | `Idle` | No script active |
//! | `Loading` | One fetch outstanding |
//! | `Displaying` | One instruction shown, at most one advance trigger armed |
//!
//! Failures never surface as errors: an unusable fetch finishes the script,
//! and out-of-range navigation is ignored.

mod events;
mod navigation;
mod operation;
mod playback;
mod source;
mod state;

pub use events::{Command, DisplaySnapshot, EngineEvent, FetchRequest, PresentationEvent};
pub use navigation::{EngineHandle, EngineSettings, NavigationEngine};
pub use playback::{AudioOutput, CompletionNotifier, CompletionTag, PlaybackCoordinator};
pub use source::{FetchError, SequenceSource, SourceFut};
pub use state::{NavTag, TriggerKind};
