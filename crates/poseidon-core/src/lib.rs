//! Poseidon core library for device telemetry ingestion.
//!
//! This crate turns device messages delivered by an event stream into rows of
//! a structured table store. Event sources feed the ingest layer, which drives
//! the Poseidon message decoder (layout/reader/parser) and projects every
//! non-null reading into one `DeviceNotification` row handed to a sink.
//! Decoding is side-effect free; all I/O is isolated in `source` and `sink`
//! modules.
//!
//! Invariants:
//! - One row per non-null reading, topics visited as Sensors, Inputs, Outputs.
//! - Row keys are fresh UUIDs, so re-processing a message yields new rows.
//! - Body decode failures are logged and reported, never propagated; sink
//!   failures are propagated.
//!
//! # Examples
//! ```no_run
//! use std::path::Path;
//!
//! use poseidon_core::{HandlerConfig, MemorySink, ingest_event_file};
//!
//! let mut sink = MemorySink::new();
//! let report = ingest_event_file(Path::new("events.jsonl"), &HandlerConfig::default(), &mut sink)?;
//! println!("rows written: {}", report.summary.rows_total);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

mod config;
mod ingest;
mod protocols;
mod sink;
mod source;

pub use config::{ConfigError, DEFAULT_TABLE_NAME, HandlerConfig};
pub use ingest::{
    HandleOutcome, IngestError, RowMetadata, TelemetryHandler, collect_rows, ingest_event_file,
    ingest_source, project_rows,
};
pub use protocols::poseidon::{
    DecodeError, MetadataReader, PoseidonMessage, SensorReading, Topic, decode_message,
};
pub use sink::{JsonLinesSink, MemorySink, PartitionedTableSink, RowSink, SinkError};
pub use source::{DeviceEvent, EventSource, JsonLinesEventSource, SourceError};

/// Current ingest report schema version.
pub const REPORT_VERSION: u32 = 1;
/// Default timestamp used when no event carried an enqueue time.
pub const DEFAULT_GENERATED_AT: &str = "1970-01-01T00:00:00Z";

/// One persisted table entity, derived from exactly one reading.
///
/// `partition_key` and `row_key` form the composite primary key of the
/// table store.
///
/// # Examples
/// ```
/// use poseidon_core::{DeviceNotification, Topic};
/// use time::macros::datetime;
///
/// let row = DeviceNotification {
///     partition_key: "2024-03".to_string(),
///     row_key: "0b3f6c1e-2a44-4d55-9c1e-7a1f0e9d2b11".to_string(),
///     auth_generation_id: Some("abc".to_string()),
///     device_id: Some("dev-1".to_string()),
///     topic: Topic::Sensors,
///     enqueued_time_utc: datetime!(2024-03-15 10:00:00 UTC),
///     sensor_id: 7,
///     value_label: Some("temp".to_string()),
///     value: 21.5,
/// };
/// assert_eq!(row.topic.label(), "Sensors");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceNotification {
    /// Enqueue month, `YYYY-MM`.
    pub partition_key: String,
    /// Freshly generated UUID, unrelated to the input data.
    pub row_key: String,
    /// Message correlation id from transport metadata.
    pub auth_generation_id: Option<String>,
    /// Originating device id from transport metadata.
    pub device_id: Option<String>,
    pub topic: Topic,
    #[serde(with = "time::serde::rfc3339")]
    pub enqueued_time_utc: OffsetDateTime,
    pub sensor_id: i32,
    pub value_label: Option<String>,
    pub value: f64,
}

/// Row counts per topic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicCounts {
    pub sensors: u64,
    pub inputs: u64,
    pub outputs: u64,
}

impl TopicCounts {
    /// Count one row for `topic`.
    pub fn record(&mut self, topic: Topic) {
        match topic {
            Topic::Sensors => self.sensors += 1,
            Topic::Inputs => self.inputs += 1,
            Topic::Outputs => self.outputs += 1,
        }
    }

    /// Add another set of counts.
    pub fn merge(&mut self, other: TopicCounts) {
        self.sensors += other.sensors;
        self.inputs += other.inputs;
        self.outputs += other.outputs;
    }

    pub fn total(&self) -> u64 {
        self.sensors + self.inputs + self.outputs
    }
}

/// Result of one ingest run over an event capture.
///
/// # Examples
/// ```
/// use poseidon_core::make_stub_report;
///
/// let report = make_stub_report("events.jsonl", 123, "TelemetryTable");
/// assert_eq!(report.report_version, poseidon_core::REPORT_VERSION);
/// assert!(report.rejections.is_empty());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    /// Report schema version (not the binary version).
    pub report_version: u32,
    /// Tool identification metadata.
    pub tool: ToolInfo,
    /// RFC3339 timestamp of the latest enqueue time seen.
    pub generated_at: String,
    /// Input capture metadata.
    pub input: InputInfo,
    /// Destination table name.
    pub table: String,
    pub summary: IngestSummary,
    /// Rejected events in input order.
    pub rejections: Vec<Rejection>,
}

/// Tool metadata embedded in reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Tool name (e.g., "poseidon").
    pub name: String,
    /// Tool version (semver).
    pub version: String,
}

/// Input capture metadata embedded in reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputInfo {
    /// Input path as provided to the ingest run.
    pub path: String,
    /// Input size in bytes.
    pub bytes: u64,
}

/// Event and row counters for one ingest run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSummary {
    pub events_total: u64,
    /// Events that decoded successfully (possibly yielding zero rows).
    pub events_persisted: u64,
    /// Events with an absent or empty body.
    pub events_empty: u64,
    /// Events whose body failed to decode.
    pub events_rejected: u64,
    pub rows_total: u64,
    pub rows_by_topic: TopicCounts,
}

/// A body that failed to decode.
///
/// # Examples
/// ```
/// use poseidon_core::Rejection;
///
/// let rejection = Rejection {
///     event_index: 3,
///     device_id: None,
///     message: "invalid JSON payload: expected value at line 1 column 1".to_string(),
/// };
/// assert_eq!(rejection.event_index, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    /// 1-based position of the event in the source.
    pub event_index: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    pub message: String,
}

/// Build a stub report with base fields filled and empty counters.
pub fn make_stub_report(input_path: &str, input_bytes: u64, table: &str) -> IngestReport {
    IngestReport {
        report_version: REPORT_VERSION,
        tool: ToolInfo {
            name: "poseidon".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        generated_at: DEFAULT_GENERATED_AT.to_string(),
        input: InputInfo {
            path: input_path.to_string(),
            bytes: input_bytes,
        },
        table: table.to_string(),
        summary: IngestSummary::default(),
        rejections: vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn notification_uses_table_field_names() {
        let row = DeviceNotification {
            partition_key: "2024-03".to_string(),
            row_key: "key".to_string(),
            auth_generation_id: None,
            device_id: Some("dev-1".to_string()),
            topic: Topic::Outputs,
            enqueued_time_utc: datetime!(2024-03-15 10:00:00 UTC),
            sensor_id: 1,
            value_label: Some("t".to_string()),
            value: 2.5,
        };

        let value = serde_json::to_value(&row).expect("row json");
        assert_eq!(value["partitionKey"], "2024-03");
        assert_eq!(value["rowKey"], "key");
        assert!(value["authGenerationId"].is_null());
        assert_eq!(value["deviceId"], "dev-1");
        assert_eq!(value["topic"], "Outputs");
        assert_eq!(value["enqueuedTimeUtc"], "2024-03-15T10:00:00Z");
        assert_eq!(value["sensorId"], 1);
        assert_eq!(value["valueLabel"], "t");
        assert_eq!(value["value"], 2.5);

        let back: DeviceNotification = serde_json::from_value(value).expect("row back");
        assert_eq!(back, row);
    }

    #[test]
    fn rejection_omits_missing_device() {
        let rejection = Rejection {
            event_index: 1,
            device_id: None,
            message: "bad".to_string(),
        };
        let value = serde_json::to_value(&rejection).expect("rejection json");
        assert!(value.get("device_id").is_none());
    }

    #[test]
    fn topic_counts_total_and_merge() {
        let mut counts = TopicCounts::default();
        counts.record(Topic::Sensors);
        counts.record(Topic::Outputs);
        counts.record(Topic::Outputs);
        let mut other = TopicCounts::default();
        other.record(Topic::Inputs);
        counts.merge(other);
        assert_eq!(
            counts,
            TopicCounts {
                sensors: 1,
                inputs: 1,
                outputs: 2
            }
        );
        assert_eq!(counts.total(), 4);
    }
}
