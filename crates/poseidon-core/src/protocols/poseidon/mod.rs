//! Poseidon device message decoding.
//!
//! The parser accepts a UTF-8 JSON body carrying up to three optional reading
//! arrays (`sensors`, `inputs`, `outputs`). Elements are checked by type only;
//! null elements and unknown fields are tolerated. An absent or zero-length
//! body is not an error and decodes to nothing.
//!
//! Transport metadata (device id, correlation id) is read by key through
//! `MetadataReader`; key names live in `layout`.

pub mod error;
pub mod layout;
pub mod parser;
pub mod reader;
pub mod topic;

pub use error::DecodeError;
pub use parser::{PoseidonMessage, SensorReading, decode_message};
pub use reader::MetadataReader;
pub use topic::Topic;
