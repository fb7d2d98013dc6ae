//! Smoke tests -- verify the binary runs and key subcommands parse.

use assert_cmd::Command;

#[test]
fn test_cli_help() {
    Command::cargo_bin("hazardhub")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicates::str::contains("Live hazard event aggregation"));
}

#[test]
fn test_cli_version() {
    Command::cargo_bin("hazardhub")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicates::str::contains("hazardhub"));
}

#[test]
fn test_serve_subcommand_exists() {
    Command::cargo_bin("hazardhub")
        .unwrap()
        .args(["serve", "--help"])
        .assert()
        .success()
        .stdout(predicates::str::contains("--bind"));
}

#[test]
fn test_events_subcommand_exists() {
    Command::cargo_bin("hazardhub")
        .unwrap()
        .args(["events", "--help"])
        .assert()
        .success()
        .stdout(predicates::str::contains("--min-severity"));
}

#[test]
fn test_events_rejects_out_of_range_limit() {
    Command::cargo_bin("hazardhub")
        .unwrap()
        .args(["events", "--limit", "500"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("limit must be between 1 and 200"));
}

#[test]
fn test_events_rejects_unknown_hazard() {
    Command::cargo_bin("hazardhub")
        .unwrap()
        .args(["events", "--hazard", "volcano"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("unknown hazard 'volcano'"));
}
