//! Terminal stand-in for the speech and media capability.
//!
//! Speech is printed instead of synthesized and "finishes" after a reading
//! time estimate. Streamed clips are announced and run for a fixed length.
//! Both report completion through the engine's notifier like a real backend.

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cyrano_engine::{AudioOutput, CompletionNotifier};
use futures_util::future::{AbortHandle, Abortable};
use tokio::time::Instant;

const WORD_DURATION: Duration = Duration::from_millis(350);
const MIN_UTTERANCE: Duration = Duration::from_secs(1);
pub(crate) const CLIP_LENGTH: Duration = Duration::from_secs(8);

type Slot = Arc<Mutex<Option<CompletionNotifier>>>;

#[derive(Debug)]
struct Running {
    abort: AbortHandle,
    slot: Slot,
    ends_at: Instant,
}

impl Running {
    fn start(length: Duration, done: Option<CompletionNotifier>) -> Self {
        let slot: Slot = Arc::new(Mutex::new(done));
        Self {
            abort: spawn_completion(length, Arc::clone(&slot)),
            slot,
            ends_at: Instant::now() + length,
        }
    }

    /// Cancel without reporting completion.
    fn cancel(self) {
        self.abort.abort();
    }
}

#[derive(Debug, Default)]
enum Clip {
    #[default]
    Stopped,
    Playing(Running),
    Paused {
        slot: Slot,
        remaining: Duration,
    },
}

#[derive(Debug, Default)]
pub struct ConsoleAudio {
    speech: Option<Running>,
    clip: Clip,
}

/// How long reading `text` aloud would take.
pub(crate) fn reading_time(text: &str) -> Duration {
    let words = u32::try_from(text.split_whitespace().count()).unwrap_or(u32::MAX);
    (WORD_DURATION * words).max(MIN_UTTERANCE)
}

fn spawn_completion(length: Duration, slot: Slot) -> AbortHandle {
    let (handle, registration) = AbortHandle::new_pair();
    tokio::spawn(async move {
        let finish = async {
            tokio::time::sleep(length).await;
            let done = slot.lock().ok().and_then(|mut slot| slot.take());
            if let Some(done) = done {
                done.notify();
            }
        };
        let _ = Abortable::new(finish, registration).await;
    });
    handle
}

fn say(line: &str) {
    let mut out = std::io::stdout().lock();
    let _ = writeln!(out, "{line}");
}

impl AudioOutput for ConsoleAudio {
    fn speak(&mut self, text: &str, done: Option<CompletionNotifier>) {
        self.stop_speech();
        say(&format!("  (speaking) {text}"));
        self.speech = Some(Running::start(reading_time(text), done));
    }

    fn stop_speech(&mut self) {
        if let Some(running) = self.speech.take() {
            running.cancel();
        }
    }

    fn stream(&mut self, uri: &str, done: Option<CompletionNotifier>) {
        self.release_media();
        say(&format!("  (playing) {uri}"));
        self.clip = Clip::Playing(Running::start(CLIP_LENGTH, done));
    }

    fn pause_media(&mut self) {
        self.clip = match std::mem::take(&mut self.clip) {
            Clip::Playing(running) => {
                running.abort.abort();
                let remaining = running.ends_at.saturating_duration_since(Instant::now());
                tracing::debug!(?remaining, "Clip paused");
                Clip::Paused {
                    slot: running.slot,
                    remaining,
                }
            }
            other => other,
        };
    }

    fn resume_media(&mut self) {
        self.clip = match std::mem::take(&mut self.clip) {
            Clip::Paused { slot, remaining } => Clip::Playing(Running {
                abort: spawn_completion(remaining, Arc::clone(&slot)),
                slot,
                ends_at: Instant::now() + remaining,
            }),
            other => other,
        };
    }

    fn release_media(&mut self) {
        if let Clip::Playing(running) = std::mem::take(&mut self.clip) {
            running.cancel();
        }
    }
}
