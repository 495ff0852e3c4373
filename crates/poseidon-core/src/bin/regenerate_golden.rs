use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use poseidon_core::{HandlerConfig, MemorySink, ingest_event_file};

fn main() -> ExitCode {
    if let Err(err) = run() {
        eprintln!("error: {}", err);
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn run() -> Result<(), String> {
    let root = PathBuf::from("tests").join("golden");
    let entries =
        fs::read_dir(&root).map_err(|err| format!("failed to read {}: {}", root.display(), err))?;

    for entry in entries {
        let entry = entry.map_err(|err| format!("failed to read entry: {}", err))?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let input = path.join("input.jsonl");
        if !input.exists() {
            continue;
        }
        regenerate_one(&input, &path)?;
    }

    Ok(())
}

// Row keys are random, so they are blanked in the expected rows.
fn regenerate_one(input: &Path, dir: &Path) -> Result<(), String> {
    let mut sink = MemorySink::new();
    let report = ingest_event_file(input, &HandlerConfig::default(), &mut sink)
        .map_err(|err| format!("ingest failed for {}: {}", input.display(), err))?;
    let rows: Vec<_> = sink
        .into_rows()
        .into_iter()
        .map(|mut row| {
            row.row_key.clear();
            row
        })
        .collect();

    write_json(&dir.join("expected_report.json"), &report)?;
    write_json(&dir.join("expected_rows.json"), &rows)
}

fn write_json<T: serde::Serialize>(output: &Path, value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|err| format!("JSON serialization failed: {}", err))?;
    fs::write(output, json)
        .map_err(|err| format!("failed to write {}: {}", output.display(), err))?;
    Ok(())
}
