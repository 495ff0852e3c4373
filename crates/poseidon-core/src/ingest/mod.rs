use std::path::Path;

use thiserror::Error;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::config::HandlerConfig;
use crate::sink::{RowSink, SinkError};
use crate::source::{EventSource, JsonLinesEventSource, SourceError};
use crate::{DEFAULT_GENERATED_AT, IngestReport, IngestSummary, Rejection, make_stub_report};

mod handler;
mod projector;

pub use handler::{HandleOutcome, TelemetryHandler};
pub use projector::{RowMetadata, collect_rows, project_rows};

use projector::to_utc;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Source error: {0}")]
    Source(#[from] SourceError),
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),
}

/// Ingest every event of a JSON-lines capture into `sink`.
pub fn ingest_event_file<S: RowSink + ?Sized>(
    path: &Path,
    config: &HandlerConfig,
    sink: &mut S,
) -> Result<IngestReport, IngestError> {
    let source = JsonLinesEventSource::open(path)?;
    let handler = TelemetryHandler::new(config.clone());
    ingest_source(path, source, &handler, sink)
}

/// Drive `source` through `handler` until it is exhausted.
///
/// Rejected bodies are counted and listed in the report; source and sink
/// failures abort the run.
pub fn ingest_source<E: EventSource, S: RowSink + ?Sized>(
    path: &Path,
    mut source: E,
    handler: &TelemetryHandler,
    sink: &mut S,
) -> Result<IngestReport, IngestError> {
    let mut summary = IngestSummary::default();
    let mut rejections = Vec::new();
    let mut latest: Option<OffsetDateTime> = None;

    while let Some(event) = source.next_event()? {
        summary.events_total += 1;
        update_latest(&mut latest, to_utc(event.enqueued_time_utc));
        match handler.handle(&event, sink)? {
            HandleOutcome::Persisted { rows } => {
                summary.events_persisted += 1;
                summary.rows_by_topic.merge(rows);
            }
            HandleOutcome::EmptyPayload => summary.events_empty += 1,
            HandleOutcome::Rejected(err) => {
                summary.events_rejected += 1;
                rejections.push(Rejection {
                    event_index: summary.events_total,
                    device_id: handler.read_metadata(&event).device_id,
                    message: err.to_string(),
                });
            }
        }
    }
    summary.rows_total = summary.rows_by_topic.total();

    let mut report = make_stub_report(
        &path.display().to_string(),
        path.metadata()?.len(),
        &handler.config().table_name,
    );
    report.generated_at = latest
        .and_then(|ts| ts.format(&Rfc3339).ok())
        .unwrap_or_else(|| DEFAULT_GENERATED_AT.to_string());
    report.summary = summary;
    report.rejections = rejections;
    Ok(report)
}

fn update_latest(latest: &mut Option<OffsetDateTime>, ts: OffsetDateTime) {
    match latest {
        Some(existing) if *existing >= ts => {}
        _ => *latest = Some(ts),
    }
}
