use tracing::{debug, error, info, info_span};

use crate::TopicCounts;
use crate::config::HandlerConfig;
use crate::protocols::common::reader::non_empty;
use crate::protocols::poseidon::{DecodeError, MetadataReader, decode_message};
use crate::sink::{RowSink, SinkError};
use crate::source::DeviceEvent;

use super::projector::{RowMetadata, project_rows};

/// What happened to one event.
#[derive(Debug)]
pub enum HandleOutcome {
    /// The body decoded; `rows` were written (possibly none).
    Persisted { rows: TopicCounts },
    /// No body, or a zero-length one. Nothing was written.
    EmptyPayload,
    /// The body did not decode. The error was logged; nothing was written.
    Rejected(DecodeError),
}

/// Stateless message handler: decode one event, project its rows.
///
/// # Examples
/// ```
/// use poseidon_core::{DeviceEvent, HandleOutcome, HandlerConfig, MemorySink, TelemetryHandler};
/// use time::macros::datetime;
///
/// let handler = TelemetryHandler::new(HandlerConfig::default());
/// let event = DeviceEvent {
///     body: Some(br#"{"outputs":[{"id":1,"name":"t","value":2.5,"state":0}]}"#.to_vec()),
///     properties: Default::default(),
///     enqueued_time_utc: datetime!(2024-03-15 10:00:00 UTC),
/// };
/// let mut sink = MemorySink::new();
/// let outcome = handler.handle(&event, &mut sink)?;
/// assert!(matches!(outcome, HandleOutcome::Persisted { .. }));
/// assert_eq!(sink.rows().len(), 1);
/// # Ok::<(), poseidon_core::SinkError>(())
/// ```
#[derive(Debug, Clone)]
pub struct TelemetryHandler {
    config: HandlerConfig,
}

impl TelemetryHandler {
    pub fn new(config: HandlerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    /// Row metadata for `event`, read with the configured property keys.
    pub fn read_metadata(&self, event: &DeviceEvent) -> RowMetadata {
        let reader = MetadataReader::new(&event.properties);
        RowMetadata::new(
            event.enqueued_time_utc,
            reader
                .read_string(&self.config.device_id_property)
                .map(str::to_string),
            reader
                .read_string(&self.config.correlation_id_property)
                .map(str::to_string),
        )
    }

    /// Handle one event.
    ///
    /// Decode failures are logged and returned as `HandleOutcome::Rejected`;
    /// only sink failures surface as `Err`.
    pub fn handle<S: RowSink + ?Sized>(
        &self,
        event: &DeviceEvent,
        sink: &mut S,
    ) -> Result<HandleOutcome, SinkError> {
        let span = info_span!(
            "handle_message",
            table = %self.config.table_name,
            event_hub = self.config.event_hub_name.as_deref(),
            consumer_group = self.config.consumer_group.as_deref(),
        );
        let _enter = span.enter();

        let Some(body) = non_empty(event.body.as_deref()) else {
            debug!("empty message body, skipping");
            return Ok(HandleOutcome::EmptyPayload);
        };

        let metadata = self.read_metadata(event);
        info!(
            device_id = ?metadata.device_id,
            message_id = ?metadata.auth_generation_id,
            "received device message"
        );
        if self.config.log_payloads {
            debug!(body = %String::from_utf8_lossy(body), "message body");
        }

        let message = match decode_message(Some(body)) {
            Ok(Some(message)) => message,
            Ok(None) => return Ok(HandleOutcome::EmptyPayload),
            Err(err) => {
                error!(
                    device_id = ?metadata.device_id,
                    message_id = ?metadata.auth_generation_id,
                    error = %err,
                    "failed to decode device message"
                );
                return Ok(HandleOutcome::Rejected(err));
            }
        };

        let rows = project_rows(&message, &metadata, sink)?;
        info!(
            rows = rows.total(),
            partition = metadata.partition_key(),
            "persisted device readings"
        );
        Ok(HandleOutcome::Persisted { rows })
    }
}
