#![cfg(feature = "cli")]

use std::path::PathBuf;
use std::process::{Command, Output};

fn correlink(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_correlink"))
        .args(["--log-level", "error", "--format", "json"])
        .args(args)
        .env_remove("CORRELINK_PROTOCOL_TAG")
        .output()
        .expect("correlink should run")
}

fn stdout_json(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(stdout.trim()).expect("stdout should be one JSON document")
}

fn unique_temp_file(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "correlink-{tag}-{}-{}.json",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ))
}

#[test]
fn bench_resolves_all_requests_and_compacts() {
    let output = correlink(&["bench", "-n", "200", "-w", "4", "--timeout", "10s"]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let report = stdout_json(&output);
    assert_eq!(report["resolved"], 200);
    assert_eq!(report["mismatched"], 0);
    assert_eq!(report["client"]["pending"], 0);
    assert_eq!(report["server"]["requests_received"], 200);
    assert!(report["client"]["compactions"].as_u64().unwrap_or(0) >= 1);
}

#[test]
fn bench_honours_custom_protocol_tag() {
    let output = correlink(&["bench", "-n", "10", "--protocol-tag", "acme"]);

    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["protocol_tag"], "acme");
}

#[test]
fn bench_rejects_zero_workers_with_usage_code() {
    let output = correlink(&["bench", "-w", "0"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn inspect_classifies_request() {
    let output = correlink(&[
        "inspect",
        r#"{"plugin":"correlink","requestId":7,"data":{"q":1}}"#,
    ]);

    assert!(output.status.success());
    let report = stdout_json(&output);
    assert_eq!(report["kind"], "request");
    assert_eq!(report["request_id"], "7");
    assert_eq!(report["data"]["q"], 1);
}

#[test]
fn inspect_classifies_response_from_file() {
    let path = unique_temp_file("inspect");
    std::fs::write(&path, r#"{"plugin":"correlink","responseId":"3","data":"ok"}"#)
        .expect("temp file should be writable");

    let output = correlink(&["inspect", "--file", path.to_str().expect("utf-8 path")]);
    let _ = std::fs::remove_file(&path);

    assert!(output.status.success());
    let report = stdout_json(&output);
    assert_eq!(report["kind"], "response");
    assert_eq!(report["request_id"], "3");
}

#[test]
fn inspect_reports_foreign_tag_as_passthrough() {
    let output = correlink(&["inspect", r#"{"plugin":"other","requestId":"1","data":1}"#]);

    assert!(output.status.success());
    let report = stdout_json(&output);
    assert_eq!(report["kind"], "passthrough");
    assert!(report.get("request_id").is_none());
}

#[test]
fn inspect_invalid_json_returns_60() {
    let output = correlink(&["inspect", "{not json"]);
    assert_eq!(output.status.code(), Some(60));
}

#[test]
fn inspect_missing_file_returns_failure() {
    let path = unique_temp_file("missing");
    let output = correlink(&["inspect", "--file", path.to_str().expect("utf-8 path")]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn version_prints_package_version() {
    let output = correlink(&["version"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}
