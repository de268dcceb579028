//! Names of the payload serialization formats.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Serialization of a token's claim payload, independent of compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SerializationFormat {
    #[default]
    Unknown,
    Json,
    Cbor,
    Custom,
}

impl SerializationFormat {
    /// Every format, `Unknown` first.
    pub const ALL: [SerializationFormat; 4] = [
        SerializationFormat::Unknown,
        SerializationFormat::Json,
        SerializationFormat::Cbor,
        SerializationFormat::Custom,
    ];

    /// Name of the format.
    pub fn name(self) -> &'static str {
        match self {
            SerializationFormat::Unknown => "unknown",
            SerializationFormat::Json => "json",
            SerializationFormat::Cbor => "cbor",
            SerializationFormat::Custom => "custom",
        }
    }

    /// Parse a format name.
    ///
    /// Unrecognized names map to `Unknown` instead of failing.
    // PENDING: callers rely on this permissive mapping; reject unknown names once they don't
    pub fn from_text(s: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(s.trim()))
            .unwrap_or(SerializationFormat::Unknown)
    }
}

impl fmt::Display for SerializationFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for SerializationFormat {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for SerializationFormat {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(SerializationFormat::from_text(&s))
    }
}
