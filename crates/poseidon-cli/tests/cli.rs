use assert_cmd::Command;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use serde_json::Value;
use tempfile::TempDir;

fn cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("poseidon"));
    cmd.env_remove("RUST_LOG")
        .env_remove("TELEMETRY_TABLE_NAME")
        .env_remove("IOT_HUB_NAME")
        .env_remove("CONSUMER_GROUP");
    cmd
}

fn repo_root() -> std::path::PathBuf {
    let manifest = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest
        .parent()
        .and_then(|p| p.parent())
        .expect("repo root")
        .to_path_buf()
}

fn golden_input(case: &str) -> std::path::PathBuf {
    repo_root()
        .join("tests")
        .join("golden")
        .join(case)
        .join("input.jsonl")
}

#[test]
fn help_supports_ingest_and_process() {
    cmd()
        .arg("events")
        .arg("ingest")
        .arg("--help")
        .assert()
        .success();
    cmd()
        .arg("events")
        .arg("process")
        .arg("--help")
        .assert()
        .success();
}

#[test]
fn version_includes_build_commit() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(contains("poseidon").and(contains("(commit ")));
}

#[test]
fn missing_input_shows_error_and_hint() {
    let temp = TempDir::new().expect("tempdir");
    let missing = temp.path().join("missing.jsonl");

    cmd()
        .arg("events")
        .arg("ingest")
        .arg(missing)
        .arg("-o")
        .arg(temp.path().join("tables"))
        .assert()
        .failure()
        .code(2)
        .stderr(contains("error:").and(contains("hint:")));
}

#[test]
fn unsupported_extension_is_rejected() {
    let temp = TempDir::new().expect("tempdir");
    let input = temp.path().join("events.json");
    std::fs::write(&input, "").expect("write input");

    cmd()
        .arg("events")
        .arg("ingest")
        .arg(input)
        .arg("--stdout")
        .assert()
        .failure()
        .stderr(contains("unsupported input format").and(contains(".jsonl")));
}

#[test]
fn stdout_streams_rows_as_json_lines() {
    let assert = cmd()
        .arg("events")
        .arg("ingest")
        .arg(golden_input("mixed_topics"))
        .arg("--stdout")
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 stdout");
    let rows: Vec<Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("valid json line"))
        .collect();
    assert_eq!(rows.len(), 7);
    assert_eq!(rows[0]["topic"], "Outputs");
    assert_eq!(rows[0]["partitionKey"], "2024-03");
    assert_eq!(rows[1]["partitionKey"], "2024-04");
}

#[test]
fn stdout_and_out_conflict() {
    let temp = TempDir::new().expect("tempdir");

    cmd()
        .arg("events")
        .arg("ingest")
        .arg(golden_input("sensors_only"))
        .arg("--stdout")
        .arg("-o")
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(contains("error:"));
}

#[test]
fn pretty_and_compact_conflict() {
    let temp = TempDir::new().expect("tempdir");

    cmd()
        .arg("events")
        .arg("ingest")
        .arg(golden_input("sensors_only"))
        .arg("-o")
        .arg(temp.path())
        .arg("--pretty")
        .arg("--compact")
        .assert()
        .failure()
        .stderr(contains("error:"));
}

#[test]
fn out_writes_partition_files_and_report() {
    let temp = TempDir::new().expect("tempdir");
    let out = temp.path().join("tables");
    let report = temp.path().join("reports").join("report.json");

    cmd()
        .arg("events")
        .arg("ingest")
        .arg(golden_input("mixed_topics"))
        .arg("-o")
        .arg(&out)
        .arg("--report")
        .arg(&report)
        .arg("--pretty")
        .assert()
        .success()
        .stderr(contains("OK:"));

    let table = out.join("TelemetryTable");
    let march = std::fs::read_to_string(table.join("2024-03.jsonl")).expect("march partition");
    let april = std::fs::read_to_string(table.join("2024-04.jsonl")).expect("april partition");
    assert_eq!(march.lines().count(), 1);
    assert_eq!(april.lines().count(), 6);

    let report: Value =
        serde_json::from_str(&std::fs::read_to_string(&report).expect("report")).expect("json");
    assert_eq!(report["summary"]["rows_total"], 7);
    assert_eq!(report["table"], "TelemetryTable");
}

#[test]
fn table_name_comes_from_environment() {
    let temp = TempDir::new().expect("tempdir");

    cmd()
        .env("TELEMETRY_TABLE_NAME", "Readings")
        .arg("events")
        .arg("ingest")
        .arg(golden_input("sensors_only"))
        .arg("-o")
        .arg(temp.path())
        .arg("--quiet")
        .assert()
        .success();

    assert!(temp.path().join("Readings").join("2024-03.jsonl").is_file());
}

#[test]
fn invalid_table_name_is_rejected() {
    let temp = TempDir::new().expect("tempdir");

    cmd()
        .arg("events")
        .arg("ingest")
        .arg(golden_input("sensors_only"))
        .arg("-o")
        .arg(temp.path())
        .arg("--table")
        .arg("9-bad")
        .assert()
        .failure()
        .code(2)
        .stderr(contains("invalid table name").and(contains("hint:")));
}

#[test]
fn quiet_suppresses_ok_message() {
    let temp = TempDir::new().expect("tempdir");

    cmd()
        .arg("events")
        .arg("ingest")
        .arg(golden_input("sensors_only"))
        .arg("-o")
        .arg(temp.path())
        .arg("--quiet")
        .assert()
        .success()
        .stderr(contains("OK:").not());
}

#[test]
fn list_rejections_outputs_event_indexes() {
    let temp = TempDir::new().expect("tempdir");

    cmd()
        .arg("events")
        .arg("ingest")
        .arg(golden_input("malformed_body"))
        .arg("-o")
        .arg(temp.path())
        .arg("--list-rejections")
        .assert()
        .success()
        .stderr(
            contains("Rejected events:")
                .and(contains("#2 dev-5"))
                .and(contains("#5 -")),
        );
}

#[test]
fn strict_fails_when_events_rejected() {
    let temp = TempDir::new().expect("tempdir");

    cmd()
        .arg("events")
        .arg("ingest")
        .arg(golden_input("malformed_body"))
        .arg("-o")
        .arg(temp.path())
        .arg("--strict")
        .assert()
        .failure()
        .code(2)
        .stderr(contains("rejected event(s) detected"));
}

#[test]
fn strict_passes_on_clean_capture() {
    let temp = TempDir::new().expect("tempdir");

    cmd()
        .arg("events")
        .arg("ingest")
        .arg(golden_input("sensors_only"))
        .arg("-o")
        .arg(temp.path())
        .arg("--strict")
        .assert()
        .success();
}

#[test]
fn glob_matching_one_file_is_accepted() {
    let pattern = repo_root()
        .join("tests")
        .join("golden")
        .join("sensors_*")
        .join("*.jsonl");

    cmd()
        .arg("events")
        .arg("ingest")
        .arg(pattern)
        .arg("--stdout")
        .assert()
        .success()
        .stdout(contains("\"sensorId\":7"));
}

#[test]
fn glob_matching_many_files_is_rejected() {
    let pattern = repo_root()
        .join("tests")
        .join("golden")
        .join("*")
        .join("input.jsonl");

    cmd()
        .arg("events")
        .arg("ingest")
        .arg(pattern)
        .arg("--stdout")
        .assert()
        .failure()
        .stderr(contains("multiple files match pattern"));
}

#[test]
fn malformed_envelope_fails_with_hint() {
    let temp = TempDir::new().expect("tempdir");
    let input = temp.path().join("events.jsonl");
    std::fs::write(&input, "{\"body\":\"{}\"}\n").expect("write input");

    cmd()
        .arg("events")
        .arg("ingest")
        .arg(input)
        .arg("--stdout")
        .assert()
        .failure()
        .stderr(contains("invalid event envelope at line 1").and(contains("hint:")));
}

#[test]
fn json_logs_emit_structured_lines() {
    let temp = TempDir::new().expect("tempdir");

    cmd()
        .arg("events")
        .arg("ingest")
        .arg(golden_input("sensors_only"))
        .arg("-o")
        .arg(temp.path())
        .arg("--json-logs")
        .assert()
        .success()
        .stderr(contains("\"message\":\"persisted device readings\""));
}

#[test]
fn json_logs_report_decode_failures_at_error_level() {
    let temp = TempDir::new().expect("tempdir");

    cmd()
        .arg("events")
        .arg("ingest")
        .arg(golden_input("malformed_body"))
        .arg("-o")
        .arg(temp.path())
        .arg("--json-logs")
        .assert()
        .success()
        .stderr(
            contains("\"level\":\"ERROR\"")
                .and(contains("failed to decode device message"))
                .and(contains("invalid JSON payload")),
        );
}

#[test]
fn log_payloads_emits_message_bodies() {
    let temp = TempDir::new().expect("tempdir");

    cmd()
        .arg("events")
        .arg("ingest")
        .arg(golden_input("sensors_only"))
        .arg("-o")
        .arg(temp.path().join("with"))
        .arg("--json-logs")
        .arg("--log-payloads")
        .assert()
        .success()
        .stderr(
            contains("\"level\":\"DEBUG\"")
                .and(contains("\"message\":\"message body\""))
                .and(contains("\\\"sensors\\\"")),
        );

    cmd()
        .arg("events")
        .arg("ingest")
        .arg(golden_input("sensors_only"))
        .arg("-o")
        .arg(temp.path().join("without"))
        .arg("--json-logs")
        .assert()
        .success()
        .stderr(contains("\"message\":\"message body\"").not());
}
