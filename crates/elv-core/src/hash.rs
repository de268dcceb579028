//! Content hashes.
//!
//! Only the value type is provided here: a type code byte followed by the digest, with a
//! four character string prefix like [`crate::id::Id`]. Content-part hashes (`hqp_...`) are
//! carried by node tokens.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::{Error, Result};

/// Length of the string prefix of every hash.
pub const PREFIX_LEN: usize = 4;

/// Type code of a hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum HashCode {
    Unknown = 0,
    Q,
    QPart,
    QPartLive,
}

const CODES: [(HashCode, &str); 4] = [
    (HashCode::Unknown, "hunk"),
    (HashCode::Q, "hq__"),
    (HashCode::QPart, "hqp_"),
    (HashCode::QPartLive, "hqpl"),
];

impl HashCode {
    fn from_u8(b: u8) -> Option<HashCode> {
        CODES.get(usize::from(b)).map(|(code, _)| *code)
    }

    fn from_prefix(prefix: &str) -> Option<HashCode> {
        CODES.iter().find(|(_, p)| *p == prefix).map(|(code, _)| *code)
    }

    /// String prefix of this code.
    pub fn prefix(self) -> &'static str {
        CODES[self as usize].1
    }
}

/// A typed content hash.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Hash(Vec<u8>);

impl Hash {
    /// Create a hash from a code and digest.
    pub fn new(code: HashCode, digest: &[u8]) -> Self {
        let mut bytes = Vec::with_capacity(digest.len() + 1);
        bytes.push(code as u8);
        bytes.extend_from_slice(digest);
        Self(bytes)
    }

    /// Create a hash from its raw bytes (code byte included).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        match bytes.first() {
            Some(b) if bytes.len() > 1 && HashCode::from_u8(*b).is_some() => Ok(Self(bytes.to_vec())),
            _ => Err(Error::invalid("hash.from_bytes", "invalid hash bytes").with("len", bytes.len())),
        }
    }

    /// Parse the string form of a hash.
    pub fn parse(s: &str) -> Result<Self> {
        if s.len() <= PREFIX_LEN || !s.is_char_boundary(PREFIX_LEN) {
            return Err(Error::invalid("hash.parse", "invalid hash string").with("hash", s));
        }
        let (prefix, encoded) = s.split_at(PREFIX_LEN);
        let code = HashCode::from_prefix(prefix)
            .ok_or_else(|| Error::invalid("hash.parse", "unknown hash prefix").with("hash", s))?;
        let digest = bs58::decode(encoded).into_vec().map_err(|e| {
            Error::invalid("hash.parse", "invalid base58 digest")
                .with("hash", s)
                .cause(e)
        })?;
        Ok(Self::new(code, &digest))
    }

    /// Type code of the hash.
    pub fn code(&self) -> HashCode {
        self.0
            .first()
            .and_then(|b| HashCode::from_u8(*b))
            .unwrap_or(HashCode::Unknown)
    }

    /// Digest bytes.
    pub fn digest(&self) -> &[u8] {
        self.0.get(1..).unwrap_or_default()
    }

    /// Raw bytes including the code byte.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// True if the hash carries no digest.
    pub fn is_nil(&self) -> bool {
        self.0.len() <= 1
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_nil() {
            return Ok(());
        }
        write!(f, "{}{}", self.code().prefix(), bs58::encode(self.digest()).into_string())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Hash").field(&self.to_string()).finish()
    }
}

impl FromStr for Hash {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Hash::parse(s)
    }
}

impl Serialize for Hash {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_string())
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            Hash::parse(&s).map_err(serde::de::Error::custom)
        } else {
            let bytes = serde_bytes::ByteBuf::deserialize(deserializer)?;
            Hash::from_bytes(&bytes).map_err(serde::de::Error::custom)
        }
    }
}
