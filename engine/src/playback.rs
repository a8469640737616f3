//! Playback dispatch per instruction kind.
//!
//! [`PlaybackCoordinator`] is the only code that talks to the audio
//! capability. Completion is reported through a [`CompletionNotifier`], which
//! posts onto the engine inbox; audio backends never see engine state.

use cyrano_types::{AdvanceMode, Generation, GroupId, InstructionKind, InstructionRef};
use tokio::sync::mpsc;

use crate::events::EngineEvent;

/// Identity of one playback request, checked when its completion arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompletionTag {
    pub generation: Generation,
    pub group: GroupId,
    pub item_number: i64,
}

/// One-shot completion callback handed to an [`AudioOutput`].
#[derive(Debug)]
pub struct CompletionNotifier {
    tag: CompletionTag,
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl CompletionNotifier {
    pub(crate) fn new(tag: CompletionTag, tx: mpsc::UnboundedSender<EngineEvent>) -> Self {
        Self { tag, tx }
    }

    #[must_use]
    pub const fn tag(&self) -> CompletionTag {
        self.tag
    }

    /// Report that playback finished. A closed engine is ignored.
    pub fn notify(self) {
        if self.tx.send(EngineEvent::PlaybackCompleted(self.tag)).is_err() {
            tracing::debug!(tag = ?self.tag, "Playback completed after engine shut down");
        }
    }
}

/// Speech and media capability.
///
/// Calls must return promptly; long-running work belongs on the backend's
/// own thread or task.
pub trait AudioOutput: Send {
    /// Read `text` aloud, firing `done` when the utterance ends.
    fn speak(&mut self, text: &str, done: Option<CompletionNotifier>);

    fn stop_speech(&mut self);

    /// Stream the clip at `uri`, firing `done` when it ends.
    fn stream(&mut self, uri: &str, done: Option<CompletionNotifier>);

    fn pause_media(&mut self);

    fn resume_media(&mut self);

    /// Stop the clip and free the player.
    fn release_media(&mut self);
}

/// Drives an [`AudioOutput`] for the displayed instruction.
pub struct PlaybackCoordinator {
    output: Box<dyn AudioOutput>,
    enabled: bool,
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl std::fmt::Debug for PlaybackCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackCoordinator")
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

impl PlaybackCoordinator {
    pub(crate) fn new(
        output: Box<dyn AudioOutput>,
        enabled: bool,
        tx: mpsc::UnboundedSender<EngineEvent>,
    ) -> Self {
        Self {
            output,
            enabled,
            tx,
        }
    }

    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.enabled
    }

    /// Start playback for `instruction`. Returns whether a completion
    /// notification was requested.
    pub fn play(&mut self, instruction: InstructionRef<'_>, generation: Generation) -> bool {
        if !self.enabled {
            return false;
        }
        let done = self.notifier_for(instruction, generation);
        let armed = done.is_some();
        match instruction.kind() {
            InstructionKind::Speech => self.output.speak(instruction.description(), done),
            InstructionKind::StreamedAudio => {
                let Some(uri) = stream_uri(instruction) else {
                    tracing::debug!(
                        item = instruction.item_number(),
                        "Streamed instruction has no clip"
                    );
                    return false;
                };
                self.output.stream(uri, done);
            }
            InstructionKind::Silent(_) => return false,
        }
        armed
    }

    /// Stop whatever `instruction` started and release the player.
    pub fn stop(&mut self, instruction: InstructionRef<'_>) {
        match instruction.kind() {
            InstructionKind::Speech => self.output.stop_speech(),
            InstructionKind::StreamedAudio => self.output.release_media(),
            InstructionKind::Silent(_) => {}
        }
    }

    /// Speech cannot be paused; only streamed clips react.
    pub fn pause(&mut self, instruction: InstructionRef<'_>) {
        match instruction.kind() {
            InstructionKind::StreamedAudio if self.enabled => self.output.pause_media(),
            InstructionKind::Speech => {
                tracing::debug!(item = instruction.item_number(), "Pause ignored for speech");
            }
            _ => {}
        }
    }

    /// Resume after [`Self::pause`]. Streamed clips continue under their
    /// original tag; speech restarts from the beginning under `generation`.
    /// Returns whether a fresh completion notification was requested.
    pub fn resume(&mut self, instruction: InstructionRef<'_>, generation: Generation) -> bool {
        if !self.enabled {
            return false;
        }
        match instruction.kind() {
            InstructionKind::Speech => {
                self.output.stop_speech();
                let done = self.notifier_for(instruction, generation);
                let armed = done.is_some();
                self.output.speak(instruction.description(), done);
                armed
            }
            InstructionKind::StreamedAudio => {
                if stream_uri(instruction).is_some() {
                    self.output.resume_media();
                }
                false
            }
            InstructionKind::Silent(_) => false,
        }
    }

    fn notifier_for(
        &self,
        instruction: InstructionRef<'_>,
        generation: Generation,
    ) -> Option<CompletionNotifier> {
        (instruction.advance_mode() == AdvanceMode::OnCompletion
            && instruction.kind().signals_completion())
        .then(|| {
            CompletionNotifier::new(
                CompletionTag {
                    generation,
                    group: instruction.group().group_id(),
                    item_number: instruction.item_number(),
                },
                self.tx.clone(),
            )
        })
    }
}

/// Clip location: `filename`, else `url`.
fn stream_uri<'a>(instruction: InstructionRef<'a>) -> Option<&'a str> {
    [instruction.instruction().filename(), instruction.instruction().url()]
        .into_iter()
        .find(|uri| !uri.is_empty())
}
