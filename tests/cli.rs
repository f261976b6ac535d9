use std::fs;

use assert_cmd::Command;
use predicates::str::contains;
use tempfile::{TempDir, tempdir};

/// Build a data directory with the given config.json body. None of these
/// scenarios reach the network: they all fail during configuration or
/// window resolution, which is exactly what the exit codes assert.
fn data_dir_with_config(config: &str) -> TempDir {
    let dir = tempdir().expect("temp dir");
    fs::write(dir.path().join("config.json"), config).expect("write config");
    fs::create_dir_all(dir.path().join("in")).expect("create in dir");
    dir
}

fn extractor(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tempo-extract").expect("binary exists");
    cmd.args(["--data-dir", dir.path().to_str().unwrap()]);
    cmd
}

#[test]
fn missing_config_file_exits_with_user_error() {
    let dir = tempdir().expect("temp dir");
    extractor(&dir)
        .assert()
        .failure()
        .code(1)
        .stderr(contains("configuration file"));
}

#[test]
fn malformed_config_exits_with_user_error() {
    let dir = data_dir_with_config("{\"parameters\": {\"endpoint\": \"worklogs\"}}");
    extractor(&dir)
        .assert()
        .failure()
        .code(1)
        .stderr(contains("Invalid configuration"));
}

#[test]
fn unknown_endpoint_exits_with_user_error() {
    let dir = data_dir_with_config(
        r##"{
            "parameters": {
                "#api_token": "secret",
                "endpoint": "timesheets",
                "destination": {"load_type": "full_load"}
            }
        }"##,
    );
    extractor(&dir).assert().failure().code(1);
}

#[test]
fn missing_sync_options_exits_before_any_fetch() {
    let dir = data_dir_with_config(
        r##"{
            "parameters": {
                "#api_token": "secret",
                "endpoint": "worklogs",
                "destination": {"load_type": "incremental_load"}
            }
        }"##,
    );
    extractor(&dir)
        .assert()
        .failure()
        .code(1)
        .stderr(contains("Sync Options must be defined."));
}

#[test]
fn unparseable_date_from_exits_before_any_fetch() {
    // The base_url points nowhere reachable; the run must fail on the date
    // expression before a request is ever attempted.
    let dir = data_dir_with_config(
        r##"{
            "parameters": {
                "#api_token": "secret",
                "endpoint": "worklogs",
                "destination": {"load_type": "full_load"},
                "base_url": "http://127.0.0.1:1/4",
                "sync_options": {
                    "date_from": "not-a-date",
                    "date_to": "2023-02-01"
                }
            }
        }"##,
    );
    extractor(&dir)
        .assert()
        .failure()
        .code(1)
        .stderr(contains("Date From"));
}

#[test]
fn unparseable_date_to_names_the_field() {
    let dir = data_dir_with_config(
        r##"{
            "parameters": {
                "#api_token": "secret",
                "endpoint": "worklogs",
                "destination": {"load_type": "full_load"},
                "base_url": "http://127.0.0.1:1/4",
                "sync_options": {
                    "date_from": "2023-01-01",
                    "date_to": "eventually"
                }
            }
        }"##,
    );
    extractor(&dir)
        .assert()
        .failure()
        .code(1)
        .stderr(contains("Date To"));
}

#[test]
fn unreachable_api_exits_with_user_error_and_no_state_written() {
    let dir = data_dir_with_config(
        r##"{
            "parameters": {
                "#api_token": "secret",
                "endpoint": "worklogs",
                "destination": {"load_type": "full_load"},
                "base_url": "http://127.0.0.1:1/4",
                "sync_options": {
                    "date_from": "2023-01-01",
                    "date_to": "2023-02-01"
                }
            }
        }"##,
    );
    extractor(&dir)
        .assert()
        .failure()
        .code(1)
        .stderr(contains("API request failed"));

    // Failed runs leave the on-disk checkpoint untouched.
    assert!(!dir.path().join("out").join("state.json").exists());
}
