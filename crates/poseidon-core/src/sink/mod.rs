//! Row sinks.
//!
//! A sink receives rows one at a time. Writes are independent appends: a
//! failure on one row leaves earlier rows in place.

mod jsonl;
mod table;

pub use jsonl::JsonLinesSink;
pub use table::PartitionedTableSink;

use thiserror::Error;

use crate::DeviceNotification;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("row serialization failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("duplicate row key: partition '{partition_key}', row '{row_key}'")]
    DuplicateKey {
        partition_key: String,
        row_key: String,
    },
}

pub trait RowSink {
    fn write_row(&mut self, row: DeviceNotification) -> Result<(), SinkError>;
}

/// Append-only in-memory buffer.
#[derive(Debug, Default)]
pub struct MemorySink {
    rows: Vec<DeviceNotification>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[DeviceNotification] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<DeviceNotification> {
        self.rows
    }
}

impl RowSink for MemorySink {
    fn write_row(&mut self, row: DeviceNotification) -> Result<(), SinkError> {
        self.rows.push(row);
        Ok(())
    }
}
