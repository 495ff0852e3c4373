use thiserror::Error;

/// Errors returned when a message body does not decode.
///
/// # Examples
/// ```
/// use poseidon_core::decode_message;
///
/// let err = decode_message(Some(b"{not json".as_slice())).unwrap_err();
/// assert!(err.to_string().contains("invalid JSON payload"));
/// ```
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
}
