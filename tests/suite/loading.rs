//! Fetching scripts and the script list from a live (mock) server

use cyrano_engine::{Command, FetchRequest, PresentationEvent};
use cyrano_types::GroupId;
use serde_json::json;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{Player, group_record, instruction, mount_catalog, mount_group, sequence};

#[tokio::test]
async fn start_announces_loading_then_shows_first_instruction() {
    let mock = MockServer::start().await;
    mount_group(
        &mock,
        4,
        sequence(
            group_record(4, "Router"),
            vec![instruction(1, 0, 0.0), instruction(2, 0, 0.0)],
        ),
    )
    .await;
    let mut player = Player::start(&mock);

    player.send(Command::StartScript(GroupId::new(4)));
    assert_eq!(
        player.next_event().await,
        PresentationEvent::ScriptLoading(FetchRequest::start_of(GroupId::new(4)))
    );
    match player.next_event().await {
        PresentationEvent::InstructionDisplayed(snapshot) => {
            assert_eq!(snapshot.group_name, "Router");
            assert_eq!(snapshot.position, 1);
            assert_eq!(snapshot.len, 2);
            assert_eq!(snapshot.name, "Step 1");
        }
        other => panic!("expected the first instruction, got {other:?}"),
    }

    player.shutdown().await;
}

#[tokio::test]
async fn server_error_finishes_the_script() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock)
        .await;
    let mut player = Player::start(&mock);

    player.send(Command::StartScript(GroupId::new(9)));
    player.finished().await;

    player.shutdown().await;
}

#[tokio::test]
async fn group_without_instructions_finishes_the_script() {
    let mock = MockServer::start().await;
    mount_group(&mock, 2, sequence(group_record(2, "Empty"), Vec::new())).await;
    let mut player = Player::start(&mock);

    player.send(Command::StartScript(GroupId::new(2)));
    player.finished().await;

    player.shutdown().await;
}

#[tokio::test]
async fn missing_body_finishes_the_script() {
    let mock = MockServer::start().await;
    mount_group(&mock, 2, json!({ "status": "ok" })).await;
    let mut player = Player::start(&mock);

    player.send(Command::StartScript(GroupId::new(2)));
    player.finished().await;

    player.shutdown().await;
}

#[tokio::test]
async fn catalog_lists_scripts_and_skips_bad_entries() {
    let mock = MockServer::start().await;
    mount_catalog(
        &mock,
        json!({ "body": [
            group_record(1, "Router"),
            { "name": "no id" },
            group_record(2, "Printer")
        ]}),
    )
    .await;
    let mut player = Player::start(&mock);

    player.send(Command::RefreshCatalog);
    match player.next_event().await {
        PresentationEvent::CatalogLoaded(scripts) => {
            let names: Vec<_> = scripts.iter().map(|s| s.name.as_str()).collect();
            assert_eq!(names, ["Router", "Printer"]);
            assert_eq!(scripts[1].group_id, GroupId::new(2));
            assert_eq!(scripts[0].description, "Router script");
        }
        other => panic!("expected the catalog, got {other:?}"),
    }

    player.shutdown().await;
}

#[tokio::test]
async fn unreachable_catalog_is_empty() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock)
        .await;
    let mut player = Player::start(&mock);

    player.send(Command::RefreshCatalog);
    assert_eq!(
        player.next_event().await,
        PresentationEvent::CatalogLoaded(Vec::new())
    );

    player.shutdown().await;
}
