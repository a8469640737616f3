//! Text rendering of presentation events.

use std::io::{self, Write};

use cyrano_config::PlayerSettings;
use cyrano_engine::{DisplaySnapshot, FetchRequest, PresentationEvent};
use cyrano_types::ScriptSummary;

pub(crate) fn render(
    event: &PresentationEvent,
    player: &PlayerSettings,
    out: &mut impl Write,
) -> io::Result<()> {
    match event {
        PresentationEvent::ScriptLoading(FetchRequest::Group { group, .. }) => {
            writeln!(out, "Loading script {group}...")
        }
        PresentationEvent::ScriptLoading(FetchRequest::Containing(instruction)) => {
            writeln!(out, "Loading script for instruction {instruction}...")
        }
        PresentationEvent::InstructionDisplayed(snapshot) => instruction(snapshot, player, out),
        PresentationEvent::PauseChanged { paused: true } => writeln!(out, "Paused."),
        PresentationEvent::PauseChanged { paused: false } => writeln!(out, "Resumed."),
        PresentationEvent::ScriptFinished => writeln!(out, "Script finished."),
        PresentationEvent::CatalogLoaded(scripts) => catalog(scripts, out),
    }
}

fn instruction(
    snapshot: &DisplaySnapshot,
    player: &PlayerSettings,
    out: &mut impl Write,
) -> io::Result<()> {
    writeln!(out)?;
    writeln!(
        out,
        "[{}] {}/{}  {}",
        snapshot.group_name, snapshot.position, snapshot.len, snapshot.name
    )?;
    if !player.terse && !snapshot.description.is_empty() {
        writeln!(out, "  {}", snapshot.description)?;
    }
    if player.graphical && !snapshot.url.is_empty() {
        writeln!(out, "  image: {}", snapshot.url)?;
    }

    let controls = &snapshot.controls;
    let offered: Vec<&str> = [
        (controls.can_go_back, "prev"),
        (controls.can_advance, "next"),
        (controls.pausable, "pause/resume"),
        (controls.stoppable, "stop"),
    ]
    .into_iter()
    .filter_map(|(on, name)| on.then_some(name))
    .collect();
    if !offered.is_empty() {
        writeln!(out, "  controls: {}", offered.join(" "))?;
    }

    for (slot, label) in snapshot.branch_labels.iter().enumerate() {
        if let Some(label) = label {
            writeln!(out, "  branch {}: {label}", slot + 1)?;
        }
    }
    Ok(())
}

fn catalog(scripts: &[ScriptSummary], out: &mut impl Write) -> io::Result<()> {
    if scripts.is_empty() {
        return writeln!(out, "No scripts available.");
    }
    writeln!(out, "Scripts:")?;
    for script in scripts {
        if script.description.is_empty() {
            writeln!(out, "  {:>4}  {}", script.group_id.value(), script.name)?;
        } else {
            writeln!(
                out,
                "  {:>4}  {} - {}",
                script.group_id.value(),
                script.name,
                script.description
            )?;
        }
    }
    Ok(())
}
