use thiserror::Error;

#[derive(Debug, Error)]
pub enum JsonlSourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid event envelope at line {line}: {message}")]
    Envelope { line: u64, message: String },
}
