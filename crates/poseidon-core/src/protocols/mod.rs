//! Message decoding modules.
//!
//! The Poseidon decoder follows a layered structure:
//! - `layout`: metadata keys and wire constants (source of truth)
//! - `reader`: transport metadata access and payload conventions
//! - `parser`: domain-level decoding of the JSON body
//! - `topic`: the fixed topic set and its labels
//! - `error`: explicit, actionable errors
//!
//! Parsers are pure and contain no I/O; sources, the ingest layer and sinks
//! handle delivery and persistence.

pub(crate) mod common;
pub mod poseidon;
