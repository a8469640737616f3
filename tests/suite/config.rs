//! A config file is enough to reach the script server

use std::fs;

use cyrano_config::CyranoConfig;
use cyrano_providers::ScriptServer;
use serde_json::json;
use tempfile::tempdir;
use wiremock::MockServer;

use crate::common::{group_record, mount_catalog};

#[tokio::test]
async fn configured_session_reaches_the_catalog() {
    let mock = MockServer::start().await;
    mount_catalog(&mock, json!({ "body": [group_record(1, "Router")] })).await;

    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        format!(
            "[server]\nroot = \"{}/REST/index.php/\"\ntimeout_seconds = 5\n\n\
             [session]\naccess_token = \"tok\"\nuser_id = \"u1\"\n\n\
             [player]\nterse = true\n",
            mock.uri()
        ),
    )
    .unwrap();

    let config = CyranoConfig::load_from(&path).unwrap();
    assert!(config.player.terse);
    assert!(config.player.audio_enabled);

    let server = ScriptServer::new(
        &config.server.root,
        config.server.timeout,
        config.session.clone(),
    )
    .unwrap();
    let records = server.fetch_catalog().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["name"], "Router");
}

#[test]
fn unreadable_config_reports_its_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing.toml");
    let err = CyranoConfig::load_from(&path).unwrap_err();
    assert_eq!(err.path(), path.as_path());
}
