use assert_cmd::Command;
use tempfile::{tempdir, TempDir};

fn encore(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("encore").unwrap();
    cmd.arg("--data-dir").arg(dir.path());
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.assert().success().get_output().stdout.clone();
    String::from_utf8(output).unwrap()
}

#[test]
fn list_shows_the_builtin_catalog() {
    let dir = tempdir().unwrap();
    let out = stdout_of(encore(&dir).arg("list"));
    assert!(out.contains("neon-nights"));
    assert!(out.contains("aurora"));
    assert_eq!(out.lines().count(), 5);
}

#[test]
fn list_filters_by_difficulty() {
    let dir = tempdir().unwrap();
    let out = stdout_of(encore(&dir).args(["list", "--difficulty", "hard"]));
    assert!(out.contains("midnight-run"));
    assert!(!out.contains("neon-nights"));
}

#[test]
fn manual_completion_is_persisted_once() {
    let dir = tempdir().unwrap();

    let out = stdout_of(encore(&dir).args(["complete", "neon-nights"]));
    assert!(out.contains("SONG COMPLETE!"));
    assert!(out.contains("+50 POINTS EARNED"));

    let out = stdout_of(encore(&dir).args(["complete", "neon-nights"]));
    assert!(out.contains("already completed"));

    let out = stdout_of(encore(&dir).arg("profile"));
    assert!(out.contains("Total points: 50"));
    assert!(out.contains("Completed: 1/5"));
    assert!(out.contains("MUSIC LOVER"));

    let out = stdout_of(encore(&dir).args(["history", "--csv"]));
    let mut lines = out.lines();
    assert_eq!(
        lines.next(),
        Some("challenge_id,title,points_awarded,trigger,completed_at")
    );
    assert!(lines.next().unwrap().starts_with("neon-nights,"));
    assert!(lines.next().is_none());
}

#[test]
fn play_runs_to_completion() {
    let dir = tempdir().unwrap();
    let out = stdout_of(
        encore(&dir)
            .args(["play", "neon-nights", "--speed", "1000"])
            .write_stdin(""),
    );
    assert!(out.contains("SONG COMPLETE!"));
    assert!(out.contains("+50 POINTS EARNED"));

    let out = stdout_of(encore(&dir).arg("profile"));
    assert!(out.contains("Total points: 50"));
}

#[test]
fn play_from_near_the_end_completes() {
    let dir = tempdir().unwrap();
    let out = stdout_of(
        encore(&dir)
            .args(["play", "neon-nights", "--from", "179.6"])
            .write_stdin(""),
    );
    assert!(out.contains("SONG COMPLETE!"));
}

#[test]
fn quit_leaves_the_challenge_incomplete() {
    let dir = tempdir().unwrap();
    stdout_of(
        encore(&dir)
            .args(["play", "aurora"])
            .write_stdin("q\n"),
    );
    let out = stdout_of(encore(&dir).arg("profile"));
    assert!(out.contains("Total points: 0"));
}

#[test]
fn unknown_challenge_fails() {
    let dir = tempdir().unwrap();
    encore(&dir)
        .args(["play", "no-such-song"])
        .write_stdin("")
        .assert()
        .failure();
}
