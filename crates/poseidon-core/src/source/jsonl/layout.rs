use serde::Deserialize;
use serde_json::{Map, Value};
use time::OffsetDateTime;

pub const READER_BUFFER_SIZE: usize = 64 * 1024;

pub const UTF8_BOM: char = '\u{feff}';

/// On-disk shape of one captured event.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(with = "time::serde::rfc3339")]
    pub enqueued_time_utc: OffsetDateTime,
}
