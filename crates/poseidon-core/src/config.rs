//! Handler configuration.
//!
//! The handler never reads the process environment; callers build a
//! `HandlerConfig` (the CLI maps flags and environment variables onto it) and
//! pass it in at construction time.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocols::poseidon::layout;

/// Table name used when none is configured.
pub const DEFAULT_TABLE_NAME: &str = "TelemetryTable";

const TABLE_NAME_MIN_LEN: usize = 3;
const TABLE_NAME_MAX_LEN: usize = 63;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error(
        "invalid table name '{name}': use 3-63 ASCII letters or digits, starting with a letter"
    )]
    InvalidTableName { name: String },
    #[error("metadata property key for {field} must not be empty")]
    EmptyPropertyKey { field: &'static str },
}

/// Explicit configuration for a `TelemetryHandler`.
///
/// # Examples
/// ```
/// use poseidon_core::HandlerConfig;
///
/// let config = HandlerConfig::new("Telemetry2024");
/// assert!(config.validate().is_ok());
/// assert!(HandlerConfig::new("1bad").validate().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerConfig {
    /// Destination table in the table store.
    pub table_name: String,
    /// Event stream the messages come from (informational, logged).
    pub event_hub_name: Option<String>,
    /// Consumer group of the event stream (informational, logged).
    pub consumer_group: Option<String>,
    /// Metadata key holding the device id.
    pub device_id_property: String,
    /// Metadata key holding the correlation id.
    pub correlation_id_property: String,
    /// Log raw message bodies at debug level.
    pub log_payloads: bool,
}

impl HandlerConfig {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_valid_table_name(&self.table_name) {
            return Err(ConfigError::InvalidTableName {
                name: self.table_name.clone(),
            });
        }
        if self.device_id_property.is_empty() {
            return Err(ConfigError::EmptyPropertyKey { field: "device id" });
        }
        if self.correlation_id_property.is_empty() {
            return Err(ConfigError::EmptyPropertyKey {
                field: "correlation id",
            });
        }
        Ok(())
    }
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            table_name: DEFAULT_TABLE_NAME.to_string(),
            event_hub_name: None,
            consumer_group: None,
            device_id_property: layout::DEVICE_ID_PROPERTY.to_string(),
            correlation_id_property: layout::CORRELATION_ID_PROPERTY.to_string(),
            log_payloads: false,
        }
    }
}

fn is_valid_table_name(name: &str) -> bool {
    let len_ok = (TABLE_NAME_MIN_LEN..=TABLE_NAME_MAX_LEN).contains(&name.len());
    let starts_with_letter = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic());
    len_ok && starts_with_letter && name.chars().all(|c| c.is_ascii_alphanumeric())
}
