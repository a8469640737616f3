//! User navigation and branching against a mock server

use cyrano_engine::{Command, PresentationEvent};
use cyrano_types::GroupId;
use serde_json::json;
use wiremock::MockServer;

use crate::common::{
    Player, branch, group_record, instruction, mount_group, mount_lookup, sequence, with,
};

fn silent(number: i64) -> serde_json::Value {
    instruction(number, 0, 0.0)
}

async fn three_step_script(mock: &MockServer) {
    mount_group(
        mock,
        1,
        sequence(
            group_record(1, "Router"),
            vec![silent(1), silent(2), silent(3)],
        ),
    )
    .await;
}

#[tokio::test]
async fn next_previous_and_goto_walk_the_script() {
    let mock = MockServer::start().await;
    three_step_script(&mock).await;
    let mut player = Player::start(&mock);

    player.send(Command::StartScript(GroupId::new(1)));
    assert_eq!(player.displayed().await, (1, 1));

    player.send(Command::Next);
    assert_eq!(player.displayed().await, (1, 2));
    player.send(Command::Next);
    assert_eq!(player.displayed().await, (1, 3));
    player.send(Command::Previous);
    assert_eq!(player.displayed().await, (1, 2));
    player.send(Command::Goto(1));
    assert_eq!(player.displayed().await, (1, 1));

    // Past the end: nothing changes, so the next event is the following goto.
    player.send(Command::Goto(7));
    player.send(Command::Goto(3));
    assert_eq!(player.displayed().await, (1, 3));

    player.shutdown().await;
}

#[tokio::test]
async fn disabled_controls_are_refused() {
    let mock = MockServer::start().await;
    let locked = with(
        with(with(silent(2), "cfNext", json!(0)), "cfPrevious", json!(0)),
        "cfStop",
        json!(0),
    );
    mount_group(
        &mock,
        1,
        sequence(group_record(1, "Router"), vec![silent(1), locked, silent(3)]),
    )
    .await;
    let mut player = Player::start(&mock);

    player.send(Command::StartScript(GroupId::new(1)));
    assert_eq!(player.displayed().await, (1, 1));
    player.send(Command::Next);
    assert_eq!(player.displayed().await, (1, 2));

    player.send(Command::Next);
    player.send(Command::Previous);
    player.send(Command::Stop);
    // Advance ignores the controls; it is how automatic advancement moves.
    player.send(Command::Advance(1));
    assert_eq!(player.displayed().await, (1, 3));

    player.shutdown().await;
}

#[tokio::test]
async fn exit_leaves_and_a_new_start_begins_again() {
    let mock = MockServer::start().await;
    three_step_script(&mock).await;
    let mut player = Player::start(&mock);

    player.send(Command::StartScript(GroupId::new(1)));
    assert_eq!(player.displayed().await, (1, 1));
    player.send(Command::Next);
    assert_eq!(player.displayed().await, (1, 2));

    player.send(Command::Exit);
    player.finished().await;

    // Commands with nothing displayed are ignored.
    player.send(Command::Next);
    player.send(Command::StartScript(GroupId::new(1)));
    assert_eq!(player.displayed().await, (1, 1));

    player.shutdown().await;
}

#[tokio::test]
async fn group_branch_opens_the_named_instruction() {
    let mock = MockServer::start().await;
    let fork = with(
        silent(1),
        "branching",
        json!([
            { "label": null, "record": null },
            branch("Lights are off", "2,3")
        ]),
    );
    mount_group(&mock, 1, sequence(group_record(1, "Router"), vec![fork, silent(2)])).await;
    mount_group(
        &mock,
        2,
        sequence(
            group_record(2, "Power"),
            vec![silent(1), silent(2), silent(3)],
        ),
    )
    .await;
    let mut player = Player::start(&mock);

    player.send(Command::StartScript(GroupId::new(1)));
    match player.next_change().await {
        PresentationEvent::InstructionDisplayed(snapshot) => {
            assert!(snapshot.has_branches());
            assert_eq!(snapshot.branch_labels[0], None);
            assert_eq!(snapshot.branch_labels[1].as_deref(), Some("Lights are off"));
        }
        other => panic!("expected the fork, got {other:?}"),
    }

    // The empty slot does nothing; the goto after it proves no load started.
    player.send(Command::Branch(0));
    player.send(Command::Goto(2));
    assert_eq!(player.displayed().await, (1, 2));

    player.send(Command::Goto(1));
    assert_eq!(player.displayed().await, (1, 1));
    player.send(Command::Branch(1));
    assert_eq!(player.displayed().await, (2, 3));

    player.shutdown().await;
}

#[tokio::test]
async fn lookup_branch_lands_on_the_instruction_with_that_id() {
    let mock = MockServer::start().await;
    let fork = with(silent(1), "branching", json!([branch("Elsewhere", "502")]));
    mount_group(&mock, 1, sequence(group_record(1, "Router"), vec![fork, silent(2)])).await;
    mount_lookup(
        &mock,
        502,
        sequence(
            group_record(8, "Modem"),
            vec![silent(1), silent(2), silent(3)],
        ),
    )
    .await;
    let mut player = Player::start(&mock);

    player.send(Command::StartScript(GroupId::new(1)));
    assert_eq!(player.displayed().await, (1, 1));
    player.send(Command::Branch(0));
    assert_eq!(player.displayed().await, (8, 2));

    player.shutdown().await;
}

#[tokio::test]
async fn lookup_branch_without_a_match_opens_the_first_instruction() {
    let mock = MockServer::start().await;
    let fork = with(silent(1), "branching", json!([branch("Elsewhere", "999")]));
    mount_group(&mock, 1, sequence(group_record(1, "Router"), vec![fork])).await;
    mount_lookup(
        &mock,
        999,
        sequence(group_record(8, "Modem"), vec![silent(1), silent(2)]),
    )
    .await;
    let mut player = Player::start(&mock);

    player.send(Command::StartScript(GroupId::new(1)));
    assert_eq!(player.displayed().await, (1, 1));
    player.send(Command::Branch(0));
    assert_eq!(player.displayed().await, (8, 1));

    player.shutdown().await;
}
