use time::{OffsetDateTime, UtcOffset};
use uuid::Uuid;

use crate::protocols::poseidon::{PoseidonMessage, SensorReading, Topic};
use crate::sink::{RowSink, SinkError};
use crate::{DeviceNotification, TopicCounts};

/// Per-message values shared by every row projected from it.
#[derive(Debug, Clone, PartialEq)]
pub struct RowMetadata {
    enqueued_time_utc: OffsetDateTime,
    partition_key: String,
    pub device_id: Option<String>,
    pub auth_generation_id: Option<String>,
}

impl RowMetadata {
    /// The enqueue time is normalized to UTC before the partition is derived.
    pub fn new(
        enqueued_time: OffsetDateTime,
        device_id: Option<String>,
        auth_generation_id: Option<String>,
    ) -> Self {
        let enqueued_time_utc = to_utc(enqueued_time);
        Self {
            partition_key: partition_key(enqueued_time_utc),
            enqueued_time_utc,
            device_id,
            auth_generation_id,
        }
    }

    pub fn enqueued_time_utc(&self) -> OffsetDateTime {
        self.enqueued_time_utc
    }

    pub fn partition_key(&self) -> &str {
        &self.partition_key
    }
}

pub(crate) fn to_utc(ts: OffsetDateTime) -> OffsetDateTime {
    ts.to_offset(UtcOffset::UTC)
}

/// Month partition, `YYYY-MM`.
///
/// # Examples
/// This helper is part of an internal module, so the example is marked as
/// text example.
/// ```text
/// use time::macros::datetime;
///
/// assert_eq!(partition_key(datetime!(2024-03-15 10:00:00 UTC)), "2024-03");
/// ```
pub(crate) fn partition_key(ts: OffsetDateTime) -> String {
    format!("{:04}-{:02}", ts.year(), u8::from(ts.month()))
}

fn new_row_key() -> String {
    Uuid::new_v4().to_string()
}

fn build_row(reading: &SensorReading, topic: Topic, metadata: &RowMetadata) -> DeviceNotification {
    DeviceNotification {
        partition_key: metadata.partition_key.clone(),
        row_key: new_row_key(),
        auth_generation_id: metadata.auth_generation_id.clone(),
        device_id: metadata.device_id.clone(),
        topic,
        enqueued_time_utc: metadata.enqueued_time_utc,
        sensor_id: reading.id,
        value_label: reading.name.clone(),
        value: reading.value,
    }
}

/// Rows for every non-null reading, Sensors first, then Inputs, then Outputs.
fn rows<'a>(
    message: &'a PoseidonMessage,
    metadata: &'a RowMetadata,
) -> impl Iterator<Item = DeviceNotification> + 'a {
    Topic::ALL.into_iter().flat_map(move |topic| {
        message
            .readings(topic)
            .unwrap_or_default()
            .iter()
            .flatten()
            .map(move |reading| build_row(reading, topic, metadata))
    })
}

/// Project a decoded message into rows, handing each to `sink` as it is built.
///
/// Writes are not transactional: when the sink fails, rows already written
/// stay written and the error is returned.
pub fn project_rows<S: RowSink + ?Sized>(
    message: &PoseidonMessage,
    metadata: &RowMetadata,
    sink: &mut S,
) -> Result<TopicCounts, SinkError> {
    let mut counts = TopicCounts::default();
    for row in rows(message, metadata) {
        let topic = row.topic;
        sink.write_row(row)?;
        counts.record(topic);
    }
    Ok(counts)
}

/// Project a decoded message into a buffer of rows.
///
/// # Examples
/// ```
/// use poseidon_core::{RowMetadata, collect_rows, decode_message};
/// use time::macros::datetime;
///
/// let body = br#"{"sensors":[{"id":7,"name":"temp","value":21.5,"state":1}]}"#;
/// let message = decode_message(Some(body.as_slice())).unwrap().unwrap();
/// let metadata = RowMetadata::new(
///     datetime!(2024-03-15 10:00:00 UTC),
///     Some("dev-1".to_string()),
///     Some("abc".to_string()),
/// );
/// let rows = collect_rows(&message, &metadata);
/// assert_eq!(rows.len(), 1);
/// assert_eq!(rows[0].partition_key, "2024-03");
/// ```
pub fn collect_rows(message: &PoseidonMessage, metadata: &RowMetadata) -> Vec<DeviceNotification> {
    rows(message, metadata).collect()
}
