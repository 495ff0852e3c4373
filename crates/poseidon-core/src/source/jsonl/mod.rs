//! JSON-lines event capture source.
//!
//! This module provides an `EventSource` backed by a capture file holding one
//! event envelope per line. It handles file I/O and envelope parsing, emitting
//! raw device events for the ingest layer. Message bodies are passed through
//! untouched; decoding them is the job of the Poseidon protocol module.

pub mod error;
pub mod layout;
pub mod parser;
pub mod reader;

pub use parser::JsonLinesEventSource;
