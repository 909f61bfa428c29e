//! Integration tests for the `gatetune prepare` command.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn write_recipe(temp_dir: &TempDir) {
    fs::write(
        temp_dir.path().join("gateway.toml"),
        r#"
[metrics.task_success]
type = "boolean"
level = "inference"
optimize = "max"

[functions.summarize]
type = "json"

[functions.summarize.variants.baseline]
type = "chat_completion"
model = "gpt-4o-mini"
"#,
    )
    .unwrap();

    fs::write(
        temp_dir.path().join("gatetune.toml"),
        r#"
gateway_config = "gateway.toml"
function_name = "summarize"
metric_name = "task_success"
variant_name = "baseline"
"#,
    )
    .unwrap();
}

fn rows(count: usize) -> String {
    (0..count)
        .map(|i| {
            let row = serde_json::json!({
                "variant_name": "baseline",
                "input": serde_json::json!({
                    "system": "Summarize in one sentence.",
                    "messages": [{"role": "user", "content": [{"type": "text", "value": format!("doc {i}")}]}]
                }).to_string(),
                "output": serde_json::json!({"raw": format!("{{\"summary\":\"s{i}\"}}"), "parsed": null}).to_string(),
                "value": true,
                "episode_id": format!("ep-{}", i % 5),
            });
            format!("{row}\n")
        })
        .collect()
}

#[test]
fn test_prepare_names_missing_warehouse_url() {
    let temp_dir = TempDir::new().unwrap();
    let mut cmd = Command::cargo_bin("gatetune").unwrap();
    cmd.current_dir(temp_dir.path())
        .env_remove("CLICKHOUSE_URL")
        .arg("prepare")
        .assert()
        .failure()
        .stderr(predicate::str::contains("CLICKHOUSE_URL"));
}

#[test]
fn test_prepare_does_not_need_api_key() {
    let temp_dir = TempDir::new().unwrap();
    write_recipe(&temp_dir);

    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/")
        .match_query(mockito::Matcher::UrlEncoded("param_metric_name".into(), "task_success".into()))
        .with_status(200)
        .with_body(rows(10))
        .create();

    let mut cmd = Command::cargo_bin("gatetune").unwrap();
    cmd.current_dir(temp_dir.path())
        .env("CLICKHOUSE_URL", format!("{}/gateway", server.url()))
        .env_remove("OPENAI_API_KEY")
        .args(["prepare", "--output-dir", "out", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"dataset_id\""));

    mock.assert();
    let train = fs::read_to_string(temp_dir.path().join("out/train.jsonl")).unwrap();
    let validation = fs::read_to_string(temp_dir.path().join("out/validation.jsonl")).unwrap();
    assert_eq!(train.lines().count() + validation.lines().count(), 10);
    assert_eq!(validation.lines().count(), 2);
    assert!(train.contains("Summarize in one sentence."));
    assert!(temp_dir.path().join("out/manifest.json").exists());
}

#[test]
fn test_prepare_fails_when_nothing_passes() {
    let temp_dir = TempDir::new().unwrap();
    write_recipe(&temp_dir);

    let mut server = mockito::Server::new();
    let _mock = server.mock("POST", "/").match_query(mockito::Matcher::Any).with_body("").create();

    let mut cmd = Command::cargo_bin("gatetune").unwrap();
    cmd.current_dir(temp_dir.path())
        .env("CLICKHOUSE_URL", server.url())
        .arg("prepare")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no samples"));
}
