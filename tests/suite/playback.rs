//! Automatic advancement driven by playback and timers

use cyrano_engine::{Command, EngineSettings, PresentationEvent};
use cyrano_types::GroupId;
use serde_json::json;
use wiremock::MockServer;

use crate::common::{Played, Player, group_record, instruction, mount_group, sequence, with};

fn spoken(number: i64) -> serde_json::Value {
    instruction(number, 1, 0.0)
}

#[tokio::test]
async fn spoken_script_plays_through_to_the_end() {
    let mock = MockServer::start().await;
    mount_group(
        &mock,
        3,
        sequence(group_record(3, "Modem"), vec![spoken(1), spoken(2)]),
    )
    .await;
    let mut player = Player::start(&mock);

    player.send(Command::StartScript(GroupId::new(3)));
    assert_eq!(player.displayed().await, (3, 1));
    assert_eq!(player.audio.played(), [Played::Speech("Do step 1".into())]);

    player.audio.finish_latest();
    assert_eq!(player.displayed().await, (3, 2));
    player.audio.finish_latest();
    player.finished().await;

    player.shutdown().await;
}

#[tokio::test]
async fn completion_from_a_previous_instruction_is_ignored() {
    let mock = MockServer::start().await;
    mount_group(
        &mock,
        3,
        sequence(
            group_record(3, "Modem"),
            vec![spoken(1), spoken(2), spoken(3)],
        ),
    )
    .await;
    let mut player = Player::start(&mock);

    player.send(Command::StartScript(GroupId::new(3)));
    assert_eq!(player.displayed().await, (3, 1));
    player.send(Command::Next);
    assert_eq!(player.displayed().await, (3, 2));

    // Step 1's speech finishing late must not move the player.
    player.audio.finish_oldest();
    player.send(Command::Goto(2));
    assert_eq!(player.displayed().await, (3, 2));

    player.shutdown().await;
}

#[tokio::test]
async fn positive_delay_advances_on_a_timer() {
    let mock = MockServer::start().await;
    mount_group(
        &mock,
        5,
        sequence(
            group_record(5, "Cable"),
            vec![instruction(1, 0, 0.05), instruction(2, 0, 0.05)],
        ),
    )
    .await;
    let mut player = Player::start(&mock);

    player.send(Command::StartScript(GroupId::new(5)));
    assert_eq!(player.displayed().await, (5, 1));
    assert_eq!(player.displayed().await, (5, 2));
    player.finished().await;

    player.shutdown().await;
}

#[tokio::test]
async fn clip_streams_and_pauses_with_the_script() {
    let mock = MockServer::start().await;
    let clip = with(instruction(1, 2, 0.0), "filename", json!("http://media.test/reset.mp3"));
    mount_group(
        &mock,
        6,
        sequence(group_record(6, "Reset"), vec![clip, spoken(2)]),
    )
    .await;
    let mut player = Player::start(&mock);

    player.send(Command::StartScript(GroupId::new(6)));
    assert_eq!(player.displayed().await, (6, 1));

    player.send(Command::Pause);
    assert_eq!(
        player.next_change().await,
        PresentationEvent::PauseChanged { paused: true }
    );
    player.send(Command::Resume);
    assert_eq!(
        player.next_change().await,
        PresentationEvent::PauseChanged { paused: false }
    );
    assert_eq!(
        player.audio.played(),
        [
            Played::Clip("http://media.test/reset.mp3".into()),
            Played::Paused,
            Played::Resumed,
        ]
    );

    // The clip keeps its completion across the pause.
    player.audio.finish_latest();
    assert_eq!(player.displayed().await, (6, 2));

    player.shutdown().await;
}

#[tokio::test]
async fn disabled_audio_waits_for_the_user() {
    let mock = MockServer::start().await;
    mount_group(
        &mock,
        3,
        sequence(group_record(3, "Modem"), vec![spoken(1), spoken(2)]),
    )
    .await;
    let mut player = Player::start_with(
        &mock,
        EngineSettings {
            audio_enabled: false,
        },
    );

    player.send(Command::StartScript(GroupId::new(3)));
    assert_eq!(player.displayed().await, (3, 1));
    assert!(player.audio.played().is_empty());
    assert_eq!(player.audio.pending(), 0);

    player.send(Command::Next);
    assert_eq!(player.displayed().await, (3, 2));

    player.shutdown().await;
}
