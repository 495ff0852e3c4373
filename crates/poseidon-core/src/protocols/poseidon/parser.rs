use std::fmt;
use std::marker::PhantomData;

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};

use super::error::DecodeError;
use super::topic::Topic;
use crate::protocols::common::reader::non_empty;

/// One measurement inside a topic array.
///
/// Missing fields take their default; `state` is decoded but not persisted.
/// Only a JSON object decodes into a reading.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SensorReading {
    pub id: i32,
    pub name: Option<String>,
    pub value: f64,
    pub state: i32,
}

/// Decoded Poseidon device message.
///
/// Each topic array may be absent, and each element may be null. Only a
/// JSON object decodes into a message.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PoseidonMessage {
    pub sensors: Option<Vec<Option<SensorReading>>>,
    pub inputs: Option<Vec<Option<SensorReading>>>,
    pub outputs: Option<Vec<Option<SensorReading>>>,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct ReadingFields {
    id: i32,
    name: Option<String>,
    value: f64,
    state: i32,
}

#[derive(Deserialize)]
struct MessageFields {
    #[serde(default)]
    sensors: Option<Vec<Option<SensorReading>>>,
    #[serde(default)]
    inputs: Option<Vec<Option<SensorReading>>>,
    #[serde(default)]
    outputs: Option<Vec<Option<SensorReading>>>,
}

/// Visits a map only. Derived struct impls also accept a sequence of
/// positional fields, which is not a valid message shape.
struct ObjectVisitor<T>(PhantomData<T>);

impl<'de, T: Deserialize<'de>> Visitor<'de> for ObjectVisitor<T> {
    type Value = T;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON object")
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<T, A::Error> {
        T::deserialize(de::value::MapAccessDeserializer::new(map))
    }
}

fn deserialize_object<'de, D: Deserializer<'de>, T: Deserialize<'de>>(
    deserializer: D,
) -> Result<T, D::Error> {
    deserializer.deserialize_map(ObjectVisitor(PhantomData))
}

impl<'de> Deserialize<'de> for SensorReading {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let fields: ReadingFields = deserialize_object(deserializer)?;
        Ok(Self {
            id: fields.id,
            name: fields.name,
            value: fields.value,
            state: fields.state,
        })
    }
}

impl<'de> Deserialize<'de> for PoseidonMessage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let fields: MessageFields = deserialize_object(deserializer)?;
        Ok(Self {
            sensors: fields.sensors,
            inputs: fields.inputs,
            outputs: fields.outputs,
        })
    }
}

impl PoseidonMessage {
    /// The reading array for `topic`, if present.
    pub fn readings(&self, topic: Topic) -> Option<&[Option<SensorReading>]> {
        match topic {
            Topic::Sensors => self.sensors.as_deref(),
            Topic::Inputs => self.inputs.as_deref(),
            Topic::Outputs => self.outputs.as_deref(),
        }
    }

    /// Number of non-null readings across all topics.
    pub fn reading_count(&self) -> usize {
        Topic::ALL
            .iter()
            .filter_map(|topic| self.readings(*topic))
            .map(|readings| readings.iter().flatten().count())
            .sum()
    }
}

/// Decode a raw message body.
///
/// Returns `Ok(None)` when the body is absent or zero-length.
///
/// # Examples
/// ```
/// use poseidon_core::decode_message;
///
/// let body = br#"{"sensors":[{"id":7,"name":"temp","value":21.5,"state":1}]}"#;
/// let message = decode_message(Some(body.as_slice())).unwrap().unwrap();
/// assert_eq!(message.reading_count(), 1);
/// assert!(decode_message(None).unwrap().is_none());
/// ```
///
/// # Errors
/// Returns `DecodeError` when the body is not UTF-8 or does not match the
/// message schema.
pub fn decode_message(payload: Option<&[u8]>) -> Result<Option<PoseidonMessage>, DecodeError> {
    let Some(bytes) = non_empty(payload) else {
        return Ok(None);
    };
    let text = std::str::from_utf8(bytes)?;
    let message = serde_json::from_str(text)?;
    Ok(Some(message))
}
