//! End-to-end CLI tests for the episode-dl binary.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Binary command isolated from the user's config and pins database.
fn episode_dl(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("episode-dl").unwrap();
    cmd.env("XDG_CONFIG_HOME", home.path())
        .env("HOME", home.path())
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_binary_help_displays_usage() {
    let home = TempDir::new().unwrap();
    episode_dl(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Batch-download anime episodes"));
}

#[test]
fn test_binary_version_displays_version() {
    let home = TempDir::new().unwrap();
    episode_dl(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("episode-dl"));
}

#[test]
fn test_binary_without_subcommand_fails() {
    let home = TempDir::new().unwrap();
    episode_dl(&home).assert().failure();
}

#[test]
fn test_binary_invalid_flag_returns_error() {
    let home = TempDir::new().unwrap();
    episode_dl(&home)
        .arg("--invalid-flag")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_download_rejects_unknown_quality() {
    let home = TempDir::new().unwrap();
    episode_dl(&home)
        .args(["download", "-n", "Show", "--quality", "4k"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("4k"));
}

#[test]
fn test_message_hello_prints_json_response() {
    let home = TempDir::new().unwrap();
    episode_dl(&home)
        .args(["-q", "message", r#"{"intent":"hello"}"#])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            r#"{"result":"Background page is working properly."}"#,
        ));
}

#[test]
fn test_message_unknown_intent_fails_softly() {
    let home = TempDir::new().unwrap();
    episode_dl(&home)
        .args(["-q", "message", r#"{"intent":"dance"}"#])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""result":"fail""#));
}

#[test]
fn test_message_extract_id_from_stdin() {
    let home = TempDir::new().unwrap();
    episode_dl(&home)
        .args(["-q", "message"])
        .write_stdin(r#"{"intent":"extractIdFromUrl","anime_url":"https://9anime.to/watch/one-piece.ov8/p8n4qz"}"#)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""data":"ov8""#));
}

#[test]
fn test_pin_add_then_list() {
    let home = TempDir::new().unwrap();
    let db = home.path().join("pins.db");
    let db = db.to_str().unwrap();

    episode_dl(&home)
        .args(["-q", "--pins-db", db, "pin", "add", "Cowboy Bebop"])
        .arg("https://9anime.to/watch/cowboy-bebop.x1")
        .assert()
        .success()
        .stdout(predicate::str::contains("success (1 pinned)"));

    episode_dl(&home)
        .args(["-q", "--pins-db", db, "pin", "add", "Cowboy Bebop"])
        .arg("https://9anime.to/watch/cowboy-bebop.x1")
        .assert()
        .success()
        .stdout(predicate::str::contains("duplicate (1 pinned)"));

    episode_dl(&home)
        .args(["-q", "--pins-db", db, "pin", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Cowboy Bebop\thttps://9anime.to/watch/cowboy-bebop.x1",
        ));
}

#[test]
fn test_pin_add_rejects_non_http_url() {
    let home = TempDir::new().unwrap();
    let db = home.path().join("pins.db");
    episode_dl(&home)
        .arg("--pins-db")
        .arg(&db)
        .args(["pin", "add", "Show", "ftp://example.com/show"])
        .assert()
        .failure();
}

#[test]
fn test_config_file_with_invalid_interval_fails() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("config.toml");
    std::fs::write(&config, "request_interval_ms = 90000\n").unwrap();
    episode_dl(&home)
        .arg("--config")
        .arg(&config)
        .args(["message", r#"{"intent":"hello"}"#])
        .assert()
        .failure();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_download_external_prints_links() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ajax/episode/info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "grabber": "/grabber-api/",
            "params": {"id": "e1", "token": "t", "options": ""}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/grabber-api/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [
            {"label": "480p", "file": "http://cdn.test/e1.mp4", "type": "mp4"}
        ]})))
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let episodes = home.path().join("episodes.json");
    std::fs::write(&episodes, r#"[{"id": "e1", "number": 1}]"#).unwrap();

    let mut cmd = episode_dl(&home);
    cmd.args(["-q", "download", "-n", "Show", "--quality", "480p", "-m", "external", "-i", "0"])
        .arg("--base-url")
        .arg(server.uri())
        .arg("-e")
        .arg(&episodes);

    let assert = tokio::task::spawn_blocking(move || cmd.assert())
        .await
        .unwrap();
    assert
        .success()
        .stdout(predicate::str::contains(
            "http://cdn.test/e1.mp4&title=Show%20-%20E1%20(480p)",
        ));
}
