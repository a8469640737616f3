//! The navigation engine: one owner of the loaded script and its position.
//!
//! Every state change happens inside [`NavigationEngine::handle`]. Fetches,
//! timers and playback run elsewhere and report back by posting an
//! [`EngineEvent`] onto the engine inbox, so two transitions never overlap.
//!
//! Staleness is decided by a [`Generation`] counter. It moves on every
//! transition that changes the displayed instruction or leaves it, and on
//! every resume that re-arms a trigger. Background tasks are also aborted
//! when superseded, but a result that was already queued is still caught by
//! the generation check.

use std::ops::ControlFlow;
use std::panic::Location;
use std::sync::Arc;
use std::time::Duration;

use cyrano_types::{
    AdvanceMode, Branch, BranchTarget, Capability, Generation, InstructionKind, InstructionRef,
    LoadError, ScriptSummary, Sequence,
};
use futures_util::future::{AbortHandle, Abortable};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::events::{Command, DisplaySnapshot, EngineEvent, FetchRequest, PresentationEvent};
use crate::operation;
use crate::playback::{AudioOutput, CompletionTag, PlaybackCoordinator};
use crate::source::{FetchError, SequenceSource};
use crate::state::{ArmedTrigger, Display, NavState, NavTag, PendingLoad, TriggerKind};

/// Engine-wide switches read once at construction.
#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    /// Global audio toggle. When off, nothing is ever played, so
    /// completion-driven instructions wait for the user.
    pub audio_enabled: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            audio_enabled: true,
        }
    }
}

/// Cloneable sender for posting [`Command`]s from a user interface.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl EngineHandle {
    /// Queue `command`. Returns `false` once the engine is gone.
    pub fn send(&self, command: Command) -> bool {
        self.tx.send(EngineEvent::Command(command)).is_ok()
    }
}

#[derive(Debug, Default)]
struct CatalogFetch {
    generation: Generation,
    abort: Option<AbortHandle>,
}

pub struct NavigationEngine {
    source: Arc<dyn SequenceSource>,
    playback: PlaybackCoordinator,
    tx: mpsc::UnboundedSender<EngineEvent>,
    inbox: mpsc::UnboundedReceiver<EngineEvent>,
    presentation: mpsc::UnboundedSender<PresentationEvent>,
    state: NavState,
    generation: Generation,
    catalog: CatalogFetch,
}

impl NavigationEngine {
    #[must_use]
    pub fn new(
        source: Arc<dyn SequenceSource>,
        audio: Box<dyn AudioOutput>,
        settings: EngineSettings,
        presentation: mpsc::UnboundedSender<PresentationEvent>,
    ) -> Self {
        let (tx, inbox) = mpsc::unbounded_channel();
        Self {
            source,
            playback: PlaybackCoordinator::new(audio, settings.audio_enabled, tx.clone()),
            tx,
            inbox,
            presentation,
            state: NavState::Idle,
            generation: Generation::default(),
            catalog: CatalogFetch::default(),
        }
    }

    #[must_use]
    pub fn engine_handle(&self) -> EngineHandle {
        EngineHandle {
            tx: self.tx.clone(),
        }
    }

    #[must_use]
    pub const fn tag(&self) -> NavTag {
        self.state.tag()
    }

    #[must_use]
    pub const fn generation(&self) -> Generation {
        self.generation
    }

    /// The displayed instruction, if any.
    #[must_use]
    pub fn current(&self) -> Option<InstructionRef<'_>> {
        match &self.state {
            NavState::Displaying(display) => display.current(),
            NavState::Idle | NavState::Loading(_) => None,
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> Option<DisplaySnapshot> {
        let NavState::Displaying(display) = &self.state else {
            return None;
        };
        display
            .current()
            .map(|instruction| DisplaySnapshot::capture(instruction, display.sequence.len()))
    }

    /// Which advance trigger is armed for the displayed instruction.
    #[must_use]
    pub fn trigger(&self) -> Option<TriggerKind> {
        match &self.state {
            NavState::Displaying(display) => Some(display.trigger.kind()),
            NavState::Idle | NavState::Loading(_) => None,
        }
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        matches!(&self.state, NavState::Displaying(display) if display.paused)
    }

    /// The outstanding fetch while loading.
    #[must_use]
    pub fn pending_request(&self) -> Option<FetchRequest> {
        match &self.state {
            NavState::Loading(pending) => Some(pending.request),
            NavState::Idle | NavState::Displaying(_) => None,
        }
    }

    /// Process events until [`Command::Shutdown`].
    pub async fn run(&mut self) {
        while self.step().await.is_continue() {}
    }

    /// Wait for and process one event.
    pub async fn step(&mut self) -> ControlFlow<()> {
        // The engine holds a sender, so the inbox never closes.
        match self.inbox.recv().await {
            Some(event) => self.handle(event),
            None => ControlFlow::Break(()),
        }
    }

    /// Process one already-queued event, if there is one.
    pub fn try_step(&mut self) -> Option<ControlFlow<()>> {
        self.inbox.try_recv().ok().map(|event| self.handle(event))
    }

    /// Apply one event. This is the only place engine state changes.
    pub fn handle(&mut self, event: EngineEvent) -> ControlFlow<()> {
        match event {
            EngineEvent::Command(Command::Shutdown) => {
                self.shutdown();
                return ControlFlow::Break(());
            }
            EngineEvent::Command(command) => self.on_command(command),
            EngineEvent::SequenceLoaded {
                generation,
                request,
                result,
            } => self.on_sequence_loaded(generation, request, result),
            EngineEvent::TimerFired { generation } => self.on_timer_fired(generation),
            EngineEvent::PlaybackCompleted(tag) => self.on_playback_completed(tag),
            EngineEvent::CatalogLoaded { generation, result } => {
                self.on_catalog_loaded(generation, result);
            }
        }
        ControlFlow::Continue(())
    }

    fn on_command(&mut self, command: Command) {
        tracing::debug!(?command, state = ?self.tag(), "Command");
        match command {
            Command::StartScript(group) => self.start_load(FetchRequest::start_of(group)),
            Command::Next => {
                if self.current_allows(Capability::CanAdvance) {
                    self.advance(1);
                }
            }
            Command::Previous => {
                if self.current_allows(Capability::CanGoBack) {
                    self.advance(-1);
                }
            }
            Command::Advance(offset) => self.advance(offset),
            Command::Goto(index) => self.display_item_at(index),
            Command::Branch(slot) => self.branch(slot),
            Command::Pause => {
                if self.current_allows(Capability::Pausable) {
                    self.pause();
                }
            }
            Command::Resume => {
                if self.current_allows(Capability::Pausable) {
                    self.resume();
                }
            }
            Command::Stop => {
                if self.current_allows(Capability::Stoppable) {
                    self.finish_script();
                }
            }
            Command::Exit => self.finish_script(),
            Command::RefreshCatalog => self.refresh_catalog(),
            Command::Shutdown => self.shutdown(),
        }
    }

    fn current_allows(&self, capability: Capability) -> bool {
        let allowed = self
            .current()
            .is_some_and(|instruction| instruction.allows(capability));
        if !allowed {
            tracing::debug!(?capability, "Control not available");
        }
        allowed
    }

    fn bump_generation(&mut self) -> Generation {
        self.generation = self.generation.next();
        self.generation
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    fn start_load(&mut self, request: FetchRequest) {
        self.release_current();
        let generation = self.bump_generation();

        let (abort, registration) = AbortHandle::new_pair();
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let fetch = async {
                match request {
                    FetchRequest::Group { group, .. } => source.fetch_group(group).await,
                    FetchRequest::Containing(instruction) => {
                        source.fetch_containing(instruction).await
                    }
                }
            };
            if let Ok(result) = Abortable::new(fetch, registration).await {
                let _ = tx.send(EngineEvent::SequenceLoaded {
                    generation,
                    request,
                    result,
                });
            }
        });

        tracing::info!(?request, %generation, "Loading script");
        self.transition(NavState::Loading(PendingLoad { request, abort }));
        self.emit(PresentationEvent::ScriptLoading(request));
    }

    fn on_sequence_loaded(
        &mut self,
        generation: Generation,
        request: FetchRequest,
        result: Result<Vec<Value>, FetchError>,
    ) {
        let expected = matches!(&self.state, NavState::Loading(pending) if pending.request == request);
        if generation != self.generation || !expected {
            tracing::debug!(%generation, current = %self.generation, "Discarding stale sequence");
            return;
        }

        let records = result.unwrap_or_else(|err| {
            tracing::warn!(?request, "Sequence fetch failed: {err}");
            Vec::new()
        });
        let sequence = match Sequence::load(&records) {
            Ok(sequence) => sequence,
            Err(LoadError::TooShort(len)) => {
                tracing::info!(?request, records = len, "Script is empty");
                self.finish_script();
                return;
            }
            Err(err) => {
                tracing::warn!(?request, "Sequence could not be decoded: {err}");
                self.finish_script();
                return;
            }
        };

        let requested = match request {
            FetchRequest::Group { requested, .. } => requested,
            FetchRequest::Containing(instruction) => {
                sequence.position_of(instruction).unwrap_or(1)
            }
        };
        let position = if sequence.contains_position(requested) {
            requested
        } else {
            tracing::debug!(requested, len = sequence.len(), "Requested position out of range");
            1
        };

        tracing::info!(
            group = %sequence.group().group_id(),
            name = sequence.group().name(),
            instructions = sequence.len(),
            "Script loaded"
        );
        self.present(NavTag::Loading, sequence, position);
    }

    // ------------------------------------------------------------------
    // Display
    // ------------------------------------------------------------------

    /// Show `currentSequence[index - 1]`. Out of range is a silent no-op.
    fn display_item_at(&mut self, index: i64) {
        let NavState::Displaying(display) = &self.state else {
            tracing::debug!(index, "No script displayed");
            return;
        };
        if !display.sequence.contains_position(index) {
            let len = display.sequence.len();
            tracing::debug!(index, len, "Position out of range");
            return;
        }
        let NavState::Displaying(mut display) = std::mem::take(&mut self.state) else {
            return;
        };
        self.release_display(&mut display);
        self.present(NavTag::Displaying, display.sequence, index);
    }

    /// Move relative to the displayed item number.
    fn advance(&mut self, offset: i64) {
        let Some(target) = self
            .current()
            .and_then(|instruction| instruction.item_number().checked_add(offset))
        else {
            return;
        };
        self.display_item_at(target);
    }

    #[track_caller]
    fn present(&mut self, from: NavTag, sequence: Sequence, position: i64) {
        let generation = self.bump_generation();
        let mut display = Display {
            sequence,
            position,
            trigger: ArmedTrigger::None,
            paused: false,
        };
        display.trigger = self.start_instruction(&display, generation);
        let snapshot = display
            .current()
            .map(|instruction| DisplaySnapshot::capture(instruction, display.sequence.len()));
        if let Some(snapshot) = &snapshot {
            let armed = display.trigger.kind();
            tracing::debug!(
                position = snapshot.position,
                name = %snapshot.name,
                trigger = ?armed,
                %generation,
                "Instruction displayed"
            );
        }
        self.transition_from(from, NavState::Displaying(display));
        if let Some(snapshot) = snapshot {
            self.emit(PresentationEvent::InstructionDisplayed(snapshot));
        }
    }

    /// Play the instruction and arm at most one advance trigger.
    fn start_instruction(&mut self, display: &Display, generation: Generation) -> ArmedTrigger {
        let Some(instruction) = display.current() else {
            return ArmedTrigger::None;
        };
        let completion = self.playback.play(instruction, generation);
        match instruction.advance_mode() {
            AdvanceMode::After(delay) => {
                ArmedTrigger::Timer(spawn_timer(self.tx.clone(), delay, generation))
            }
            AdvanceMode::OnCompletion if completion => ArmedTrigger::Completion,
            AdvanceMode::OnCompletion | AdvanceMode::Manual => ArmedTrigger::None,
        }
    }

    fn release_display(&mut self, display: &mut Display) {
        display.trigger.disarm();
        if let Some(instruction) = display.current() {
            self.playback.stop(instruction);
        }
    }

    /// Cancel whatever the current state has in flight.
    fn release_current(&mut self) {
        match &mut self.state {
            NavState::Idle => {}
            NavState::Loading(pending) => pending.abort.abort(),
            NavState::Displaying(display) => {
                display.trigger.disarm();
                if let Some(instruction) = display.current() {
                    self.playback.stop(instruction);
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Branching
    // ------------------------------------------------------------------

    fn branch(&mut self, slot: usize) {
        let Some(target) = self
            .current()
            .and_then(|instruction| instruction.instruction().branch(slot))
            .map(Branch::target)
        else {
            tracing::debug!(slot, "No branch in slot");
            return;
        };
        tracing::debug!(slot, ?target, "Following branch");
        match target {
            BranchTarget::Group { group, instruction } => self.start_load(FetchRequest::Group {
                group,
                requested: instruction.value(),
            }),
            BranchTarget::Lookup(instruction) if instruction.value() > 0 => {
                self.start_load(FetchRequest::Containing(instruction));
            }
            BranchTarget::Lookup(instruction) => {
                tracing::debug!(%instruction, "Branch has no instruction to look up");
            }
        }
    }

    // ------------------------------------------------------------------
    // Advance triggers
    // ------------------------------------------------------------------

    fn on_timer_fired(&mut self, generation: Generation) {
        let NavState::Displaying(display) = &mut self.state else {
            tracing::debug!(%generation, "Timer fired with nothing displayed");
            return;
        };
        if generation != self.generation || display.trigger.kind() != TriggerKind::Timer {
            tracing::debug!(%generation, current = %self.generation, "Discarding stale timer");
            return;
        }
        display.trigger = ArmedTrigger::None;
        let Some(instruction) = display.current() else {
            return;
        };
        let item = instruction.item_number();
        let (is_last, can_advance) = (instruction.is_last(), instruction.can_advance());

        if is_last {
            self.finish_script();
        } else if can_advance {
            self.advance(1);
        } else {
            tracing::debug!(item, "Timer fired but advancing is disabled");
        }
    }

    fn on_playback_completed(&mut self, tag: CompletionTag) {
        let current_generation = self.generation;
        let NavState::Displaying(display) = &mut self.state else {
            tracing::debug!(?tag, "Playback completed with nothing displayed");
            return;
        };
        let matches_display = display.current().is_some_and(|instruction| {
            instruction.group().group_id() == tag.group
                && instruction.item_number() == tag.item_number
        });
        if tag.generation != current_generation
            || display.trigger.kind() != TriggerKind::Completion
            || !matches_display
        {
            tracing::debug!(?tag, current = %current_generation, "Discarding stale completion");
            return;
        }
        display.trigger = ArmedTrigger::None;
        if display.current().is_some_and(|instruction| instruction.is_last()) {
            self.finish_script();
        } else {
            self.advance(1);
        }
    }

    // ------------------------------------------------------------------
    // Pause / resume
    // ------------------------------------------------------------------

    fn pause(&mut self) {
        let NavState::Displaying(display) = &mut self.state else {
            return;
        };
        if display.paused {
            return;
        }
        display.paused = true;
        display.trigger.cancel_timer();
        if let Some(instruction) = display.sequence.get(display.position) {
            self.playback.pause(instruction);
        }
        self.emit(PresentationEvent::PauseChanged { paused: true });
    }

    /// Restart playback and re-arm the full delay.
    fn resume(&mut self) {
        let NavState::Displaying(display) = &mut self.state else {
            return;
        };
        if !display.paused {
            return;
        }
        display.paused = false;

        if let Some(instruction) = display.sequence.get(display.position) {
            let mode = instruction.advance_mode();
            let is_speech = instruction.kind() == InstructionKind::Speech;
            if is_speech || matches!(mode, AdvanceMode::After(_)) {
                self.generation = self.generation.next();
            }
            let generation = self.generation;
            let completion = self.playback.resume(instruction, generation);
            match mode {
                AdvanceMode::After(delay) => {
                    display.trigger =
                        ArmedTrigger::Timer(spawn_timer(self.tx.clone(), delay, generation));
                }
                AdvanceMode::OnCompletion if is_speech => {
                    display.trigger = if completion {
                        ArmedTrigger::Completion
                    } else {
                        ArmedTrigger::None
                    };
                }
                AdvanceMode::OnCompletion | AdvanceMode::Manual => {}
            }
        }
        self.emit(PresentationEvent::PauseChanged { paused: false });
    }

    // ------------------------------------------------------------------
    // Finish
    // ------------------------------------------------------------------

    /// Stop everything, drop the script and return to the picker.
    fn finish_script(&mut self) {
        if matches!(self.state, NavState::Idle) {
            tracing::debug!("No script to finish");
            return;
        }
        self.release_current();
        self.bump_generation();
        self.transition(NavState::Idle);
        tracing::info!("Script finished");
        self.emit(PresentationEvent::ScriptFinished);
    }

    fn shutdown(&mut self) {
        self.release_current();
        if let Some(abort) = self.catalog.abort.take() {
            abort.abort();
        }
        self.bump_generation();
        if !matches!(self.state, NavState::Idle) {
            self.transition(NavState::Idle);
        }
        tracing::debug!("Engine shut down");
    }

    // ------------------------------------------------------------------
    // Catalog
    // ------------------------------------------------------------------

    fn refresh_catalog(&mut self) {
        if let Some(abort) = self.catalog.abort.take() {
            abort.abort();
        }
        self.catalog.generation = self.catalog.generation.next();
        let generation = self.catalog.generation;

        let (abort, registration) = AbortHandle::new_pair();
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let fetch = async { source.fetch_catalog().await };
            if let Ok(result) = Abortable::new(fetch, registration).await {
                let _ = tx.send(EngineEvent::CatalogLoaded { generation, result });
            }
        });
        self.catalog.abort = Some(abort);
    }

    fn on_catalog_loaded(&mut self, generation: Generation, result: Result<Vec<Value>, FetchError>) {
        if generation != self.catalog.generation {
            tracing::debug!(%generation, "Discarding stale script list");
            return;
        }
        self.catalog.abort = None;
        let records = result.unwrap_or_else(|err| {
            tracing::warn!("Script list fetch failed: {err}");
            Vec::new()
        });
        let scripts = ScriptSummary::parse_catalog(&records);
        tracing::debug!(scripts = scripts.len(), "Script list loaded");
        self.emit(PresentationEvent::CatalogLoaded(scripts));
    }

    // ------------------------------------------------------------------
    // Plumbing
    // ------------------------------------------------------------------

    fn emit(&self, event: PresentationEvent) {
        if self.presentation.send(event).is_err() {
            tracing::trace!("Presentation receiver dropped");
        }
    }

    /// Authoritative state change point.
    #[track_caller]
    fn transition(&mut self, next: NavState) {
        let from = self.state.tag();
        self.transition_from(from, next);
    }

    /// Like [`Self::transition`], for callers that already took the state
    /// out with `mem::take` and would otherwise read as `Idle -> X`.
    #[track_caller]
    fn transition_from(&mut self, from: NavTag, next: NavState) {
        let to = next.tag();
        if let Some(receipt) = operation::transition_receipt(from, to) {
            let legal = operation::receipt_is_legal(receipt);
            if !legal {
                let loc = Location::caller();
                tracing::warn!(
                    ?from,
                    ?to,
                    edge = receipt.edge().as_str(),
                    file = loc.file(),
                    line = loc.line(),
                    "Illegal navigation transition",
                );
                debug_assert!(
                    legal,
                    "Illegal navigation transition: {from:?} --{:?}--> {to:?} at {}:{}",
                    receipt.edge(),
                    loc.file(),
                    loc.line()
                );
            }
            tracing::trace!(?from, ?to, edge = receipt.edge().as_str(), "Navigation edge");
        }
        self.state = next;
    }
}

fn spawn_timer(
    tx: mpsc::UnboundedSender<EngineEvent>,
    delay: Duration,
    generation: Generation,
) -> AbortHandle {
    let (handle, registration) = AbortHandle::new_pair();
    tokio::spawn(async move {
        let timer = async {
            tokio::time::sleep(delay).await;
            let _ = tx.send(EngineEvent::TimerFired { generation });
        };
        let _ = Abortable::new(timer, registration).await;
    });
    handle
}
