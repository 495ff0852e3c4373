use std::io::BufRead;

use super::error::JsonlSourceError;
use super::layout::{self, EventEnvelope};
use crate::source::DeviceEvent;

/// Read the next non-blank line into `buf`, advancing `line_no`.
///
/// Returns `Ok(false)` at end of input. Trailing line terminators and a
/// leading UTF-8 byte order mark on the first line are stripped.
///
/// # Examples
/// This helper is part of an internal module, so the example is marked as
/// text example.
/// ```text
/// use std::io::Cursor;
///
/// let mut input = Cursor::new("\n{\"a\":1}\r\n");
/// let mut line_no = 0;
/// let mut buf = String::new();
/// assert!(read_next_line(&mut input, &mut line_no, &mut buf).unwrap());
/// assert_eq!((line_no, buf.as_str()), (2, "{\"a\":1}"));
/// ```
///
/// # Errors
/// Returns `JsonlSourceError::Io` when the reader fails or the line is not
/// valid UTF-8.
pub fn read_next_line<R: BufRead>(
    reader: &mut R,
    line_no: &mut u64,
    buf: &mut String,
) -> Result<bool, JsonlSourceError> {
    loop {
        buf.clear();
        if reader.read_line(buf)? == 0 {
            return Ok(false);
        }
        *line_no += 1;
        if *line_no == 1 && buf.starts_with(layout::UTF8_BOM) {
            buf.remove(0);
        }
        let trimmed_len = buf.trim_end_matches(['\r', '\n']).len();
        buf.truncate(trimmed_len);
        if !buf.trim().is_empty() {
            return Ok(true);
        }
    }
}

/// Parse one envelope line into a device event.
///
/// # Errors
/// Returns `JsonlSourceError::Envelope` when the line is not a valid envelope.
pub fn parse_envelope(line: &str, line_no: u64) -> Result<DeviceEvent, JsonlSourceError> {
    let envelope: EventEnvelope =
        serde_json::from_str(line).map_err(|err| JsonlSourceError::Envelope {
            line: line_no,
            message: err.to_string(),
        })?;
    Ok(DeviceEvent {
        body: envelope.body.map(String::into_bytes),
        properties: envelope.properties,
        enqueued_time_utc: envelope.enqueued_time_utc,
    })
}

#[cfg(test)]
mod tests {
    use super::{parse_envelope, read_next_line};
    use crate::source::jsonl::error::JsonlSourceError;
    use std::io::Cursor;
    use time::macros::datetime;

    #[test]
    fn skips_blank_lines_and_counts() {
        let mut input = Cursor::new("\n  \n{\"a\":1}\r\n\nlast");
        let mut line_no = 0;
        let mut buf = String::new();

        assert!(read_next_line(&mut input, &mut line_no, &mut buf).unwrap());
        assert_eq!(line_no, 3);
        assert_eq!(buf, "{\"a\":1}");

        assert!(read_next_line(&mut input, &mut line_no, &mut buf).unwrap());
        assert_eq!(line_no, 5);
        assert_eq!(buf, "last");

        assert!(!read_next_line(&mut input, &mut line_no, &mut buf).unwrap());
    }

    #[test]
    fn strips_byte_order_mark() {
        let mut input = Cursor::new("\u{feff}{}\n");
        let mut line_no = 0;
        let mut buf = String::new();
        assert!(read_next_line(&mut input, &mut line_no, &mut buf).unwrap());
        assert_eq!(buf, "{}");
    }

    #[test]
    fn invalid_utf8_is_io_error() {
        let mut input = Cursor::new(vec![0xff, 0xfe, b'\n']);
        let mut line_no = 0;
        let mut buf = String::new();
        let err = read_next_line(&mut input, &mut line_no, &mut buf).unwrap_err();
        assert!(matches!(err, JsonlSourceError::Io(_)));
    }

    #[test]
    fn parse_full_envelope() {
        let line = r#"{"body":"{}","properties":{"iothub-connection-device-id":"dev-1"},"enqueuedTimeUtc":"2024-03-15T10:00:00Z"}"#;
        let event = parse_envelope(line, 1).unwrap();
        assert_eq!(event.body.as_deref(), Some(b"{}".as_slice()));
        assert_eq!(event.properties["iothub-connection-device-id"], "dev-1");
        assert_eq!(event.enqueued_time_utc, datetime!(2024-03-15 10:00:00 UTC));
    }

    #[test]
    fn parse_envelope_without_body_or_properties() {
        let line = r#"{"body":null,"enqueuedTimeUtc":"2024-03-15T10:00:00+02:00"}"#;
        let event = parse_envelope(line, 1).unwrap();
        assert!(event.body.is_none());
        assert!(event.properties.is_empty());
        assert_eq!(event.enqueued_time_utc, datetime!(2024-03-15 08:00:00 UTC));
    }

    #[test]
    fn parse_envelope_missing_timestamp() {
        let err = parse_envelope(r#"{"body":"{}"}"#, 7).unwrap_err();
        match err {
            JsonlSourceError::Envelope { line, message } => {
                assert_eq!(line, 7);
                assert!(message.contains("enqueuedTimeUtc"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
