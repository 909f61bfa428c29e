//! Integration tests for the `gatetune` binary's top-level interface.

use assert_cmd::Command;
use predicates::prelude::*;

fn gatetune() -> Command {
    let mut cmd = Command::cargo_bin("gatetune").unwrap();
    cmd.env_remove("CLICKHOUSE_URL").env_remove("OPENAI_API_KEY").env_remove("OPENAI_BASE_URL");
    cmd
}

#[test]
fn test_help_lists_commands() {
    gatetune()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("prepare"))
        .stdout(predicate::str::contains("wait"))
        .stdout(predicate::str::contains("status"));
}

#[test]
fn test_missing_subcommand_fails() {
    gatetune().assert().failure();
}

#[test]
fn test_run_help_shows_recipe_flags() {
    gatetune()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--val-fraction"))
        .stdout(predicate::str::contains("--max-wait"))
        .stdout(predicate::str::contains("--provider-url"));
}
