use serde_json::{Map, Value};

use super::layout;

/// Keyed access to transport metadata.
///
/// Values are opaque strings: a missing key, or a value that is not a JSON
/// string, reads as `None`.
pub struct MetadataReader<'a> {
    properties: &'a Map<String, Value>,
}

impl<'a> MetadataReader<'a> {
    pub fn new(properties: &'a Map<String, Value>) -> Self {
        Self { properties }
    }

    pub fn read_string(&self, key: &str) -> Option<&'a str> {
        self.properties.get(key).and_then(Value::as_str)
    }

    /// Device id under the default property key.
    ///
    /// # Examples
    /// ```
    /// use poseidon_core::MetadataReader;
    /// use serde_json::json;
    ///
    /// let properties = json!({"iothub-connection-device-id": "dev-1"});
    /// let reader = MetadataReader::new(properties.as_object().unwrap());
    /// assert_eq!(reader.device_id(), Some("dev-1"));
    /// assert_eq!(reader.correlation_id(), None);
    /// ```
    pub fn device_id(&self) -> Option<&'a str> {
        self.read_string(layout::DEVICE_ID_PROPERTY)
    }

    /// Correlation (auth generation) id under the default property key.
    pub fn correlation_id(&self) -> Option<&'a str> {
        self.read_string(layout::CORRELATION_ID_PROPERTY)
    }
}
