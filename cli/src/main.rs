//! Cyrano CLI - binary entry point.
//!
//! # Architecture
//!
//! ```text
//! stdin lines -> commands::parse_line -> EngineHandle -> NavigationEngine (own task)
//!                                                             |
//!              stdout <- render::render <- PresentationEvent -+
//! ```
//!
//! The engine runs on its own task and never blocks on the terminal. Audio
//! is simulated by [`console::ConsoleAudio`].

mod commands;
mod console;
mod render;

use std::{
    fs::{self, OpenOptions},
    io::{Write, stdout},
    path::PathBuf,
    sync::{Arc, Mutex},
};

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use cyrano_config::{CyranoConfig, PlayerSettings};
use cyrano_engine::{
    Command, EngineHandle, EngineSettings, NavigationEngine, PresentationEvent,
};
use cyrano_providers::ScriptServer;

use commands::{HELP, Input, parse_line};
use console::ConsoleAudio;

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (log_file, init_warnings) = open_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // No log file: stay silent rather than interleave logs with the prompt.
    tracing_subscriber::registry().with(env_filter).init();
}

fn open_log_file() -> (Option<(PathBuf, fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new().create(true).append(true).open(&candidate) {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    // Primary: ~/.cyrano/logs/cyrano.log
    if let Some(config_path) = CyranoConfig::path()
        && let Some(config_dir) = config_path.parent()
    {
        candidates.push(config_dir.join("logs").join("cyrano.log"));
    }

    // Fallback: ./.cyrano/logs/cyrano.log
    candidates.push(PathBuf::from(".cyrano").join("logs").join("cyrano.log"));

    candidates
}

fn load_config() -> CyranoConfig {
    match CyranoConfig::load() {
        Ok(Some(config)) => config,
        Ok(None) => CyranoConfig::default(),
        Err(err) => {
            eprintln!("Ignoring unreadable config: {err}");
            CyranoConfig::default()
        }
    }
}

/// Print presentation events until the engine goes away. A finished script
/// returns to the script list.
async fn present(
    mut events: mpsc::UnboundedReceiver<PresentationEvent>,
    player: PlayerSettings,
    handle: EngineHandle,
) -> Result<()> {
    while let Some(event) = events.recv().await {
        {
            let mut out = stdout().lock();
            render::render(&event, &player, &mut out)?;
            out.flush()?;
        }
        if event == PresentationEvent::ScriptFinished {
            handle.send(Command::RefreshCatalog);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = load_config();
    if config.session.access_token().is_empty() {
        eprintln!("No access token configured; the server may refuse requests.");
    }

    let server = ScriptServer::new(
        &config.server.root,
        config.server.timeout,
        config.session.clone(),
    )
    .context("Cannot reach script server")?;

    let (presentation_tx, presentation_rx) = mpsc::unbounded_channel();
    let mut engine = NavigationEngine::new(
        Arc::new(server),
        Box::new(ConsoleAudio::default()),
        EngineSettings {
            audio_enabled: config.player.audio_enabled,
        },
        presentation_tx,
    );
    let handle = engine.engine_handle();

    let engine_task = tokio::spawn(async move { engine.run().await });
    let presenter = tokio::spawn(present(presentation_rx, config.player, handle.clone()));

    println!("cyrano - type `help` for commands");
    handle.send(Command::RefreshCatalog);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };

        match parse_line(&line) {
            Ok(Some(Input::Engine(command))) => {
                if !handle.send(command) {
                    break;
                }
            }
            Ok(Some(Input::Help)) => println!("{HELP}"),
            Ok(Some(Input::Quit)) => break,
            Ok(None) => {}
            Err(err) => println!("{err:#}"),
        }
    }

    handle.send(Command::Shutdown);
    engine_task.await.context("Engine task failed")?;
    drop(handle);
    presenter.await.context("Presenter task failed")??;
    Ok(())
}
