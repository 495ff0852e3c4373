mod jsonl;

pub use jsonl::JsonLinesEventSource;

use serde_json::{Map, Value};
use thiserror::Error;
use time::OffsetDateTime;

/// One message as delivered by the event stream.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceEvent {
    /// Raw message body; `None` when the transport delivered no body.
    pub body: Option<Vec<u8>>,
    /// Application and transport properties, accessed by key.
    pub properties: Map<String, Value>,
    /// Time the transport enqueued the message.
    pub enqueued_time_utc: OffsetDateTime,
}

pub trait EventSource {
    fn next_event(&mut self) -> Result<Option<DeviceEvent>, SourceError>;
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid event envelope at line {line}: {message}")]
    Envelope { line: u64, message: String },
}

impl From<jsonl::error::JsonlSourceError> for SourceError {
    fn from(value: jsonl::error::JsonlSourceError) -> Self {
        match value {
            jsonl::error::JsonlSourceError::Io(err) => SourceError::Io(err),
            jsonl::error::JsonlSourceError::Envelope { line, message } => {
                SourceError::Envelope { line, message }
            }
        }
    }
}
