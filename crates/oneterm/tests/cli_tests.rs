use assert_cmd::Command;
use predicates::prelude::*;

fn oneterm() -> Command {
    Command::cargo_bin("oneterm").unwrap()
}

#[test]
fn test_help_prints_usage_and_bindings() {
    oneterm()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("oneterm"))
        .stdout(predicate::str::contains("--debug"))
        .stdout(predicate::str::contains("archive scrollback"));
}

#[test]
fn test_short_help() {
    oneterm()
        .arg("-h")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn test_version() {
    oneterm()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_help_after_unknown_flag() {
    oneterm()
        .args(["--no-such-flag", "-h"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"));
}
