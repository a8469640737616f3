//! Shared test utilities and fixtures
//!
//! A mock script server plus an audio backend the tests drive by hand.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use cyrano_engine::{
    AudioOutput, CompletionNotifier, EngineHandle, EngineSettings, NavigationEngine,
    PresentationEvent,
};
use cyrano_providers::ScriptServer;
use cyrano_types::SessionContext;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN: &str = "tok";
pub const USER: &str = "u1";

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

pub fn group_record(group: i64, name: &str) -> Value {
    json!({
        "groupID": group,
        "name": name,
        "description": format!("{name} script"),
        "filename": "",
        "cfStop": 1,
        "cfPause": 1,
        "cfNext": 1,
        "cfPrevious": 1
    })
}

/// An instruction record. `kind` 1 is speech, 2 a streamed clip, 0 silent.
pub fn instruction(number: i64, kind: i64, delay: f64) -> Value {
    json!({
        "instructionNumber": number.to_string(),
        "commandID": 500 + number,
        "name": format!("Step {number}"),
        "description": format!("Do step {number}"),
        "type": kind,
        "filename": null,
        "url": "",
        "delay": delay.to_string(),
        "cfStop": "-1",
        "cfPause": -1,
        "cfNext": -1,
        "cfPrevious": -1,
        "branching": []
    })
}

pub fn with(mut record: Value, key: &str, value: Value) -> Value {
    record[key] = value;
    record
}

pub fn branch(label: &str, record: &str) -> Value {
    json!({ "label": label, "record": record })
}

pub fn sequence(group: Value, instructions: Vec<Value>) -> Value {
    let mut body = vec![group];
    body.extend(instructions);
    json!({ "body": body })
}

/// Serve `body` for `GET {root}/{resource}/tok/u1[/{id}]`.
pub async fn mount(server: &MockServer, resource: &str, id: Option<i64>, body: Value) {
    let route = match id {
        Some(id) => format!("/REST/index.php/{resource}/{TOKEN}/{USER}/{id}"),
        None => format!("/REST/index.php/{resource}/{TOKEN}/{USER}"),
    };
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

pub async fn mount_group(server: &MockServer, group: i64, body: Value) {
    mount(server, "commands", Some(group), body).await;
}

pub async fn mount_lookup(server: &MockServer, instruction: i64, body: Value) {
    mount(server, "branchcommand", Some(instruction), body).await;
}

pub async fn mount_catalog(server: &MockServer, body: Value) {
    mount(server, "commandgroups", None, body).await;
}

pub fn script_server(mock: &MockServer) -> ScriptServer {
    ScriptServer::new(
        &format!("{}/REST/index.php", mock.uri()),
        Duration::from_secs(5),
        SessionContext::new(TOKEN, USER),
    )
    .unwrap()
}

// ---------------------------------------------------------------------------
// Audio
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Played {
    Speech(String),
    Clip(String),
    Paused,
    Resumed,
}

/// Records what the engine asked for and holds completion notifiers until
/// a test fires them.
#[derive(Default, Clone)]
pub struct ManualAudio {
    played: Arc<Mutex<Vec<Played>>>,
    pending: Arc<Mutex<Vec<CompletionNotifier>>>,
}

impl ManualAudio {
    pub fn played(&self) -> Vec<Played> {
        self.played.lock().unwrap().clone()
    }

    pub fn pending(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    /// Report the most recent playback as finished.
    pub fn finish_latest(&self) {
        let done = self.pending.lock().unwrap().pop().expect("nothing playing");
        done.notify();
    }

    /// Report the oldest outstanding playback as finished.
    pub fn finish_oldest(&self) {
        let done = self.pending.lock().unwrap().remove(0);
        done.notify();
    }

    /// Report every outstanding playback as finished, oldest first.
    pub fn finish_all(&self) {
        let drained: Vec<_> = self.pending.lock().unwrap().drain(..).collect();
        for done in drained {
            done.notify();
        }
    }

    fn record(&self, played: Played, done: Option<CompletionNotifier>) {
        self.played.lock().unwrap().push(played);
        if let Some(done) = done {
            self.pending.lock().unwrap().push(done);
        }
    }
}

impl AudioOutput for ManualAudio {
    fn speak(&mut self, text: &str, done: Option<CompletionNotifier>) {
        self.record(Played::Speech(text.to_string()), done);
    }

    fn stop_speech(&mut self) {}

    fn stream(&mut self, uri: &str, done: Option<CompletionNotifier>) {
        self.record(Played::Clip(uri.to_string()), done);
    }

    fn pause_media(&mut self) {
        self.played.lock().unwrap().push(Played::Paused);
    }

    fn resume_media(&mut self) {
        self.played.lock().unwrap().push(Played::Resumed);
    }

    fn release_media(&mut self) {}
}

// ---------------------------------------------------------------------------
// Running engine
// ---------------------------------------------------------------------------

/// An engine running on its own task, talking to a mock server.
pub struct Player {
    pub handle: EngineHandle,
    pub audio: ManualAudio,
    events: mpsc::UnboundedReceiver<PresentationEvent>,
    task: JoinHandle<()>,
}

impl Player {
    pub fn start(mock: &MockServer) -> Self {
        Self::start_with(mock, EngineSettings::default())
    }

    pub fn start_with(mock: &MockServer, settings: EngineSettings) -> Self {
        let audio = ManualAudio::default();
        let (tx, events) = mpsc::unbounded_channel();
        let mut engine = NavigationEngine::new(
            Arc::new(script_server(mock)),
            Box::new(audio.clone()),
            settings,
            tx,
        );
        let handle = engine.engine_handle();
        let task = tokio::spawn(async move { engine.run().await });
        Self {
            handle,
            audio,
            events,
            task,
        }
    }

    pub fn send(&self, command: cyrano_engine::Command) {
        assert!(self.handle.send(command), "engine stopped");
    }

    pub async fn next_event(&mut self) -> PresentationEvent {
        tokio::time::timeout(EVENT_TIMEOUT, self.events.recv())
            .await
            .expect("timed out waiting for a presentation event")
            .expect("engine dropped its presentation channel")
    }

    /// Skip loading notices and return the next event of substance.
    pub async fn next_change(&mut self) -> PresentationEvent {
        loop {
            match self.next_event().await {
                PresentationEvent::ScriptLoading(_) => {}
                other => return other,
            }
        }
    }

    /// Wait for the next displayed instruction and return `(group, position)`.
    pub async fn displayed(&mut self) -> (i64, i64) {
        match self.next_change().await {
            PresentationEvent::InstructionDisplayed(snapshot) => {
                (snapshot.group_id.value(), snapshot.position)
            }
            other => panic!("expected an instruction, got {other:?}"),
        }
    }

    pub async fn finished(&mut self) {
        let event = self.next_change().await;
        assert_eq!(event, PresentationEvent::ScriptFinished);
    }

    pub async fn shutdown(self) {
        self.send(cyrano_engine::Command::Shutdown);
        tokio::time::timeout(EVENT_TIMEOUT, self.task)
            .await
            .expect("engine did not stop")
            .unwrap();
    }
}
