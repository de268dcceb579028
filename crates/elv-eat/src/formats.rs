//! Token formats: how the claims of a token are serialized and compressed.

use std::fmt;

use serde::{Serialize, Serializer};

use elv_core::{Error, Result, SerializationFormat};

/// Width of the format segment of a token prefix.
pub const FORMAT_PREFIX_LEN: usize = 2;

/// Wire format of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TokenFormat {
    #[default]
    Unknown,
    /// Base64 JSON with an optional `.`-separated signature.
    Legacy,
    /// A token string followed by `.` and a base64 signature over it.
    LegacySigned,
    Json,
    JsonCompressed,
    Cbor,
    CborCompressed,
    /// Length-prefixed binary fields.
    Custom,
}

#[derive(Clone, Copy)]
struct FormatInfo {
    format: TokenFormat,
    prefix: &'static str,
    name: &'static str,
    serialization: SerializationFormat,
    compressed: bool,
}

const FORMATS: [FormatInfo; 8] = [
    FormatInfo {
        format: TokenFormat::Unknown,
        prefix: "__",
        name: "unknown",
        serialization: SerializationFormat::Unknown,
        compressed: false,
    },
    FormatInfo {
        format: TokenFormat::Legacy,
        prefix: "l_",
        name: "legacy",
        serialization: SerializationFormat::Json,
        compressed: false,
    },
    FormatInfo {
        format: TokenFormat::LegacySigned,
        prefix: "ls",
        name: "legacy-signed",
        serialization: SerializationFormat::Json,
        compressed: false,
    },
    FormatInfo {
        format: TokenFormat::Json,
        prefix: "j_",
        name: "json",
        serialization: SerializationFormat::Json,
        compressed: false,
    },
    FormatInfo {
        format: TokenFormat::JsonCompressed,
        prefix: "jc",
        name: "json-compressed",
        serialization: SerializationFormat::Json,
        compressed: true,
    },
    FormatInfo {
        format: TokenFormat::Cbor,
        prefix: "c_",
        name: "cbor",
        serialization: SerializationFormat::Cbor,
        compressed: false,
    },
    FormatInfo {
        format: TokenFormat::CborCompressed,
        prefix: "cc",
        name: "cbor-compressed",
        serialization: SerializationFormat::Cbor,
        compressed: true,
    },
    FormatInfo {
        format: TokenFormat::Custom,
        prefix: "b_",
        name: "custom",
        serialization: SerializationFormat::Custom,
        compressed: false,
    },
];

const _: () = {
    let mut i = 0;
    while i < FORMATS.len() {
        assert!(FORMATS[i].format as usize == i);
        assert!(FORMATS[i].prefix.len() == FORMAT_PREFIX_LEN);
        i += 1;
    }
};

impl TokenFormat {
    /// Every known format, `Unknown` first.
    pub const ALL: [TokenFormat; 8] = [
        TokenFormat::Unknown,
        TokenFormat::Legacy,
        TokenFormat::LegacySigned,
        TokenFormat::Json,
        TokenFormat::JsonCompressed,
        TokenFormat::Cbor,
        TokenFormat::CborCompressed,
        TokenFormat::Custom,
    ];

    fn info(self) -> FormatInfo {
        FORMATS[self as usize]
    }

    /// Two character prefix.
    pub fn prefix(self) -> &'static str {
        self.info().prefix
    }

    /// Human readable name.
    pub fn name(self) -> &'static str {
        self.info().name
    }

    /// Serialization of the claims.
    pub fn serialization(self) -> SerializationFormat {
        self.info().serialization
    }

    /// Whether the serialized claims are DEFLATE compressed.
    pub fn compressed(self) -> bool {
        self.info().compressed
    }

    /// Whether this is one of the legacy formats, which never appear in a token prefix.
    pub fn is_legacy(self) -> bool {
        matches!(self, TokenFormat::Legacy | TokenFormat::LegacySigned)
    }

    /// Format for a two character prefix. Neither `Unknown` nor a legacy format is returned.
    pub fn from_prefix(prefix: &str) -> Option<TokenFormat> {
        FORMATS
            .iter()
            .find(|f| f.prefix == prefix)
            .map(|f| f.format)
            .filter(|f| *f != TokenFormat::Unknown && !f.is_legacy())
    }

    /// Format for a name.
    pub fn from_name(name: &str) -> Option<TokenFormat> {
        FORMATS.iter().find(|f| f.name == name).map(|f| f.format)
    }

    /// Non-legacy format for a serialization, compressed or not.
    ///
    /// The custom serialization is never compressed.
    pub fn from_serialization(serialization: SerializationFormat, compress: bool) -> Result<TokenFormat> {
        match (serialization, compress) {
            (SerializationFormat::Json, false) => Ok(TokenFormat::Json),
            (SerializationFormat::Json, true) => Ok(TokenFormat::JsonCompressed),
            (SerializationFormat::Cbor, false) => Ok(TokenFormat::Cbor),
            (SerializationFormat::Cbor, true) => Ok(TokenFormat::CborCompressed),
            (SerializationFormat::Custom, _) => Ok(TokenFormat::Custom),
            (SerializationFormat::Unknown, _) => {
                Err(Error::invalid("format.from_serialization", "unknown serialization")
                    .with("serialization", serialization))
            }
        }
    }

    /// Fails for `Unknown`.
    pub fn validate(self) -> Result<()> {
        if self == TokenFormat::Unknown {
            return Err(Error::invalid("token.validate", "unknown token format"));
        }
        Ok(())
    }
}

impl fmt::Display for TokenFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for TokenFormat {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.name())
    }
}
