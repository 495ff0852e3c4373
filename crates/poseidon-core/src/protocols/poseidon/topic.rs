use std::fmt;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

/// The three reading categories of a Poseidon message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Sensors,
    Inputs,
    Outputs,
}

/// Stored labels, indexed by variant.
pub const TOPIC_NAMES: [&str; 3] = ["Sensors", "Inputs", "Outputs"];

/// Topics in projection order, paired with their stored labels.
pub const TOPIC_LABELS: [(Topic, &str); 3] = [
    (Topic::Sensors, TOPIC_NAMES[0]),
    (Topic::Inputs, TOPIC_NAMES[1]),
    (Topic::Outputs, TOPIC_NAMES[2]),
];

impl Topic {
    /// All topics in projection order.
    pub const ALL: [Topic; 3] = [Topic::Sensors, Topic::Inputs, Topic::Outputs];

    /// Label stored in the `topic` column.
    ///
    /// # Examples
    /// ```
    /// use poseidon_core::Topic;
    ///
    /// assert_eq!(Topic::Inputs.label(), "Inputs");
    /// ```
    pub fn label(self) -> &'static str {
        TOPIC_LABELS[self as usize].1
    }

    /// Inverse of [`Topic::label`]; exact, case-sensitive match.
    pub fn from_label(label: &str) -> Option<Topic> {
        TOPIC_LABELS
            .iter()
            .find(|(_, candidate)| *candidate == label)
            .map(|(topic, _)| *topic)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Topic {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Topic {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Topic::from_label(&label)
            .ok_or_else(|| de::Error::unknown_variant(&label, &TOPIC_NAMES))
    }
}
