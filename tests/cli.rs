use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("idea4gift").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: idea4gift <COMMAND>"))
        .stdout(predicate::str::contains("Commands:"))
        .stdout(predicate::str::contains("start"))
        .stdout(predicate::str::contains("chat"))
        .stdout(predicate::str::contains("--version"));
}

#[test]
fn test_cli_start_help() {
    let mut cmd = Command::cargo_bin("idea4gift").unwrap();
    cmd.arg("start")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: idea4gift start"))
        .stdout(predicate::str::contains("--port <PORT>"))
        .stdout(predicate::str::contains("--language <LANGUAGE>"));
}

#[test]
fn test_cli_chat_help() {
    let mut cmd = Command::cargo_bin("idea4gift").unwrap();
    cmd.arg("chat")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: idea4gift chat"))
        .stdout(predicate::str::contains("[possible values: en, ru]"));
}

#[test]
fn test_cli_rejects_unknown_language() {
    let mut cmd = Command::cargo_bin("idea4gift").unwrap();
    cmd.args(["chat", "--language", "de"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value 'de'"));
}

#[test]
fn test_cli_no_command() {
    let mut cmd = Command::cargo_bin("idea4gift").unwrap();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage: idea4gift <COMMAND>"));
}

#[test]
fn test_cli_chat_ends_on_closed_stdin() {
    let mut cmd = Command::cargo_bin("idea4gift").unwrap();
    cmd.arg("chat")
        .env("IDEA4GIFT_LANGUAGE", "en")
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::contains("What's the birthday person's name?"));
}
