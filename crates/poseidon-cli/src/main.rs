use std::fs;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use glob::glob;
use poseidon_core::{
    HandlerConfig, IngestError, IngestReport, JsonLinesSink, PartitionedTableSink, RowSink,
    SourceError,
};
use tracing_subscriber::EnvFilter;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (commit ",
    env!("POSEIDON_BUILD_COMMIT"),
    ", ",
    env!("POSEIDON_BUILD_DATE"),
    ")"
);

const EXAMPLES: &str = "Examples:\n  poseidon events ingest events.jsonl -o tables\n  poseidon events process events.jsonl --stdout\n  poseidon events ingest 'captures/*.jsonl' -o tables --report report.json";

#[derive(Parser, Debug)]
#[command(name = "poseidon")]
#[command(version, long_version = LONG_VERSION)]
#[command(
    about = "Ingests Poseidon device telemetry captures into a partitioned table store.",
    long_about = None,
    after_help = EXAMPLES
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Operations on device event captures (JSON lines).
    Events {
        #[command(subcommand)]
        command: EventsCommands,
    },
}

#[derive(Subcommand, Debug)]
enum EventsCommands {
    /// Decode every event of a capture and persist one row per reading.
    #[command(alias = "process")]
    #[command(after_help = EXAMPLES)]
    Ingest(IngestArgs),
}

#[derive(Args, Debug)]
struct IngestArgs {
    /// Path to a .jsonl event capture (a glob matching one file is accepted)
    input: PathBuf,

    /// Table store root directory
    #[arg(short = 'o', long, required_unless_present = "stdout")]
    out: Option<PathBuf>,

    /// Stream rows to stdout as JSON lines
    #[arg(long, conflicts_with = "out")]
    stdout: bool,

    /// Write the ingest report (JSON) to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Pretty-print the report
    #[arg(long, conflicts_with = "compact")]
    pretty: bool,

    /// Compact report output (default)
    #[arg(long)]
    compact: bool,

    /// Suppress non-error output
    #[arg(long)]
    quiet: bool,

    /// Exit with a non-zero code if any event was rejected
    #[arg(long)]
    strict: bool,

    /// List rejected events after ingestion
    #[arg(long)]
    list_rejections: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Destination table name
    #[arg(long, env = "TELEMETRY_TABLE_NAME", default_value = poseidon_core::DEFAULT_TABLE_NAME)]
    table: String,

    /// Event stream name (logged only)
    #[arg(long, env = "IOT_HUB_NAME")]
    event_hub: Option<String>,

    /// Event stream consumer group (logged only)
    #[arg(long, env = "CONSUMER_GROUP")]
    consumer_group: Option<String>,

    /// Log raw message bodies at debug level
    #[arg(long)]
    log_payloads: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Events { command } => match command {
            EventsCommands::Ingest(args) => {
                init_logging(&args);
                cmd_events_ingest(args)
            }
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint: {}", hint);
            }
            ExitCode::from(2)
        }
    }
}

fn init_logging(args: &IngestArgs) {
    let default_directives = if args.quiet {
        "error"
    } else if args.log_payloads {
        "poseidon_core=debug,poseidon=info"
    } else {
        "poseidon_core=info,poseidon=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

    if args.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_ansi(std::io::stderr().is_terminal())
            .with_target(false)
            .compact()
            .init();
    }
}

#[derive(Debug)]
struct CliError {
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(message: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            message: message.into(),
            hint,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::new(format!("{err:#}"), None)
    }
}

impl From<IngestError> for CliError {
    fn from(err: IngestError) -> Self {
        let hint = match &err {
            IngestError::Source(SourceError::Envelope { .. }) => Some(
                "each line must be a JSON object with body, properties and enqueuedTimeUtc"
                    .to_string(),
            ),
            IngestError::Sink(_) => Some("check the output directory is writable".to_string()),
            _ => None,
        };
        CliError::new(format!("ingestion failed: {err}"), hint)
    }
}

fn cmd_events_ingest(args: IngestArgs) -> Result<(), CliError> {
    let resolved_input = resolve_input_path(&args.input)?;
    validate_input_file(&resolved_input)?;

    let config = HandlerConfig {
        table_name: args.table.clone(),
        event_hub_name: args.event_hub.clone(),
        consumer_group: args.consumer_group.clone(),
        log_payloads: args.log_payloads,
        ..HandlerConfig::default()
    };
    config.validate().map_err(|err| {
        CliError::new(
            err.to_string(),
            Some("set --table or TELEMETRY_TABLE_NAME".to_string()),
        )
    })?;

    if let Some(report_path) = args.report.as_ref() {
        ensure_distinct_from_input(report_path, &resolved_input)?;
    }

    let report = if args.stdout {
        let stdout = std::io::stdout();
        let mut sink = JsonLinesSink::new(stdout.lock());
        let report = ingest(&resolved_input, &config, &mut sink)?;
        sink.flush().map_err(IngestError::from)?;
        report
    } else {
        let out = args.out.as_ref().ok_or_else(|| {
            CliError::new(
                "missing output directory",
                Some("use -o/--out or --stdout".to_string()),
            )
        })?;
        let mut sink = PartitionedTableSink::create(out, &config.table_name)
            .map_err(IngestError::from)?;
        let report = ingest(&resolved_input, &config, &mut sink)?;
        if !args.quiet {
            eprintln!(
                "OK: {} rows written -> {}",
                report.summary.rows_total,
                sink.table_dir().display()
            );
        }
        report
    };

    if let Some(report_path) = args.report.as_ref() {
        let json = serialize_report(&report, args.pretty, args.compact)?;
        write_report(report_path, &json)?;
        if !args.quiet {
            eprintln!("OK: report written -> {}", report_path.display());
        }
    }

    if args.list_rejections && !args.quiet {
        print_rejections(&report);
    }
    if args.strict && report.summary.events_rejected > 0 {
        return Err(CliError::new(
            format!(
                "{} rejected event(s) detected",
                report.summary.events_rejected
            ),
            Some("use --list-rejections to inspect".to_string()),
        ));
    }
    Ok(())
}

fn ingest<S: RowSink>(
    input: &Path,
    config: &HandlerConfig,
    sink: &mut S,
) -> Result<IngestReport, CliError> {
    let report = poseidon_core::ingest_event_file(input, config, sink)?;
    tracing::info!(
        events = report.summary.events_total,
        rows = report.summary.rows_total,
        rejected = report.summary.events_rejected,
        "ingestion finished"
    );
    Ok(report)
}

fn ensure_distinct_from_input(report_path: &Path, input: &Path) -> Result<(), CliError> {
    let input_abs = fs::canonicalize(input)
        .with_context(|| format!("Failed to resolve input path: {}", input.display()))?;
    let parent = match report_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    // A report whose directory does not exist yet cannot be the input.
    let Ok(report_dir) = fs::canonicalize(parent) else {
        return Ok(());
    };
    let file_name = report_path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("Invalid report path: {}", report_path.display()))?;
    if report_dir.join(file_name) == input_abs {
        return Err(CliError::new(
            format!(
                "report path must differ from input: {}",
                report_path.display()
            ),
            Some("choose a different report path".to_string()),
        ));
    }
    Ok(())
}

fn write_report(path: &Path, json: &str) -> Result<(), CliError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create output directory: {}", parent.display())
            })?;
        }
    }
    fs::write(path, json).with_context(|| format!("Failed to write report: {}", path.display()))?;
    Ok(())
}

fn serialize_report(report: &IngestReport, pretty: bool, compact: bool) -> Result<String, CliError> {
    if pretty && compact {
        return Err(CliError::new(
            "cannot use --pretty and --compact together",
            Some("choose one output format".to_string()),
        ));
    }
    let json = if pretty {
        serde_json::to_string_pretty(report)
    } else {
        serde_json::to_string(report)
    };
    json.context("JSON serialization failed").map_err(Into::into)
}

fn print_rejections(report: &IngestReport) {
    eprintln!("Rejected events:");
    for rejection in &report.rejections {
        eprintln!(
            "  #{} {}: {}",
            rejection.event_index,
            rejection.device_id.as_deref().unwrap_or("-"),
            rejection.message
        );
    }
}

fn validate_input_file(input: &Path) -> Result<(), CliError> {
    if !input.exists() {
        return Err(CliError::new(
            format!("input file not found: {}", input.display()),
            Some("use a .jsonl event capture".to_string()),
        ));
    }
    if !input.is_file() {
        return Err(CliError::new(
            format!("input is not a file: {}", input.display()),
            Some("use a .jsonl event capture".to_string()),
        ));
    }
    let ext = input
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    if ext != "jsonl" {
        return Err(CliError::new(
            format!("unsupported input format '{}'", input.display()),
            Some("expected a .jsonl file".to_string()),
        ));
    }
    Ok(())
}

fn resolve_input_path(input: &Path) -> Result<PathBuf, CliError> {
    let pattern = input.to_string_lossy();
    if !is_glob_pattern(&pattern) {
        return Ok(input.to_path_buf());
    }

    let paths = glob(&pattern).map_err(|err| {
        CliError::new(
            format!("invalid input pattern '{}'", pattern),
            Some(format!("pattern error: {}", err.msg)),
        )
    })?;
    let mut matches = Vec::new();
    for entry in paths {
        let path = entry.map_err(|err| {
            CliError::new(
                format!("invalid input pattern '{}'", pattern),
                Some(format!("pattern error: {}", err)),
            )
        })?;
        if path.is_file() {
            matches.push(path);
        }
    }

    match matches.len() {
        0 => Err(CliError::new(
            format!("no files match pattern '{}'", pattern),
            Some("check the path or quote the pattern; expected .jsonl".to_string()),
        )),
        1 => Ok(matches.remove(0)),
        count => {
            let mut listed = matches
                .iter()
                .take(3)
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ");
            if count > 3 {
                listed.push_str(", ...");
            }
            Err(CliError::new(
                format!(
                    "multiple files match pattern '{}' ({} matches); matches: {}",
                    pattern, count, listed
                ),
                Some("pass a single capture file, or run once per file".to_string()),
            ))
        }
    }
}

fn is_glob_pattern(input: &str) -> bool {
    input.contains('*') || input.contains('?') || input.contains('[')
}
