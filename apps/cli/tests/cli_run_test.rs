//! Integration tests for the `gatetune run` command.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn gatetune(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("gatetune").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("CLICKHOUSE_URL")
        .env_remove("OPENAI_API_KEY")
        .env_remove("OPENAI_BASE_URL");
    cmd
}

#[test]
fn test_run_names_missing_warehouse_url() {
    let temp_dir = TempDir::new().unwrap();
    gatetune(&temp_dir)
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("CLICKHOUSE_URL"));
}

#[test]
fn test_run_names_missing_api_key() {
    let temp_dir = TempDir::new().unwrap();
    gatetune(&temp_dir)
        .env("CLICKHOUSE_URL", "http://127.0.0.1:1/gateway")
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("OPENAI_API_KEY"));
}

#[test]
fn test_run_rejects_bad_fraction_before_remote_calls() {
    let temp_dir = TempDir::new().unwrap();
    gatetune(&temp_dir)
        .env("CLICKHOUSE_URL", "http://127.0.0.1:1/gateway")
        .env("OPENAI_API_KEY", "sk-test")
        .args(["run", "--val-fraction", "1.5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("val_fraction"));
}

#[test]
fn test_run_requires_gateway_config() {
    let temp_dir = TempDir::new().unwrap();
    gatetune(&temp_dir)
        .env("CLICKHOUSE_URL", "http://127.0.0.1:1/gateway")
        .env("OPENAI_API_KEY", "sk-test")
        .args(["run", "--function", "f", "--metric", "m", "--variant", "v"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("gateway_config"));
}
