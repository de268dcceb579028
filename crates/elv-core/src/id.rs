//! Typed, prefix-tagged identifiers.
//!
//! An [`Id`] is a type code byte followed by opaque payload bytes. Its string form is a
//! four character prefix (one per [`Code`]) followed by the base58 encoded payload, e.g.
//! `ispc2RUoqE...` for a space or `iq__3vN...` for a content object.
//!
//! Composed identifiers (content-with-tenant, library-with-tenant) carry a second,
//! embedded identifier ahead of the primary payload:
//!
//! ```text
//! code | varint(len(embedded)) | embedded id bytes | primary payload
//! ```

use std::fmt;
use std::str::FromStr;

use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::{Error, Result};
use crate::varint;

/// Length of the string prefix of every identifier.
pub const PREFIX_LEN: usize = 4;

/// Number of random payload bytes of a generated identifier.
pub const GENERATED_LEN: usize = 16;

/// Type code of an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Code {
    Unknown = 0,
    Account,
    User,
    QLib,
    Q,
    QStateStore,
    QSpace,
    QFileUpload,
    QFilesJob,
    QNode,
    Network,
    Kms,
    CachedResultSet,
    Tenant,
    Group,
    /// Content ID with embedded tenant ID.
    TQ,
    /// Library ID with embedded tenant ID.
    TLib,
}

const CODES: [(Code, &str); 17] = [
    (Code::Unknown, "iukn"),
    (Code::Account, "iacc"),
    (Code::User, "iusr"),
    (Code::QLib, "ilib"),
    (Code::Q, "iq__"),
    (Code::QStateStore, "iqss"),
    (Code::QSpace, "ispc"),
    (Code::QFileUpload, "iqfu"),
    (Code::QFilesJob, "iqfj"),
    (Code::QNode, "inod"),
    (Code::Network, "inet"),
    (Code::Kms, "ikms"),
    (Code::CachedResultSet, "icrs"),
    (Code::Tenant, "iten"),
    (Code::Group, "igrp"),
    (Code::TQ, "itq_"),
    (Code::TLib, "itlb"),
];

impl Code {
    /// Code for the given byte, if known.
    pub fn from_u8(b: u8) -> Option<Code> {
        CODES.get(usize::from(b)).map(|(code, _)| *code)
    }

    /// Code for the given string prefix, if known.
    pub fn from_prefix(prefix: &str) -> Option<Code> {
        CODES.iter().find(|(_, p)| *p == prefix).map(|(code, _)| *code)
    }

    /// String prefix of this code.
    pub fn prefix(self) -> &'static str {
        CODES[self as usize].1
    }

    /// For composed codes, the (primary, embedded) codes they multiplex.
    pub fn composite_parts(self) -> Option<(Code, Code)> {
        match self {
            Code::TQ => Some((Code::Q, Code::Tenant)),
            Code::TLib => Some((Code::QLib, Code::Tenant)),
            _ => None,
        }
    }

    /// Whether an identifier of code `self` may stand in where `target` is expected.
    fn is_compatible_with(self, target: Code) -> bool {
        self == target
            || self
                .composite_parts()
                .is_some_and(|(primary, _)| primary == target)
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// An immutable typed identifier.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(Vec<u8>);

impl Id {
    /// Create an identifier from a code and payload.
    pub fn new(code: Code, payload: &[u8]) -> Self {
        let mut bytes = Vec::with_capacity(payload.len() + 1);
        bytes.push(code as u8);
        bytes.extend_from_slice(payload);
        Self(bytes)
    }

    /// Generate an identifier with a random payload.
    pub fn generate(code: Code) -> Self {
        let mut payload = [0u8; GENERATED_LEN];
        rand::rng().fill_bytes(&mut payload);
        Self::new(code, &payload)
    }

    /// Create an identifier from its raw bytes (code byte included).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() <= 1 {
            return Err(Error::invalid("id.from_bytes", "id has no payload").with("len", bytes.len()));
        }
        if Code::from_u8(bytes[0]).is_none() {
            return Err(Error::invalid("id.from_bytes", "unknown id code").with("code", bytes[0]));
        }
        Ok(Self(bytes.to_vec()))
    }

    /// Parse the string form of an identifier.
    pub fn parse(s: &str) -> Result<Self> {
        if s.len() <= PREFIX_LEN || !s.is_char_boundary(PREFIX_LEN) {
            return Err(Error::invalid("id.parse", "invalid id string").with("id", s));
        }
        let (prefix, encoded) = s.split_at(PREFIX_LEN);
        let code = Code::from_prefix(prefix).ok_or_else(|| {
            Error::invalid("id.parse", "unknown id prefix")
                .with("prefix", prefix)
                .with("id", s)
        })?;
        let payload = bs58::decode(encoded).into_vec().map_err(|e| {
            Error::invalid("id.parse", "invalid base58 payload")
                .with("id", s)
                .cause(e)
        })?;
        Ok(Self::new(code, &payload))
    }

    /// Type code of this identifier; `Unknown` for empty or unrecognized ids.
    pub fn code(&self) -> Code {
        self.0
            .first()
            .and_then(|b| Code::from_u8(*b))
            .unwrap_or(Code::Unknown)
    }

    /// Payload bytes (everything after the code byte).
    pub fn payload(&self) -> &[u8] {
        self.0.get(1..).unwrap_or_default()
    }

    /// Raw bytes including the code byte.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// True if the identifier carries no payload.
    pub fn is_nil(&self) -> bool {
        self.0.len() <= 1
    }

    /// True if the identifier has a code and a payload.
    pub fn is_valid(&self) -> bool {
        self.0.len() > 1
    }

    /// Copy of this identifier with its type code replaced.
    pub fn as_code(&self, code: Code) -> Self {
        if self.is_nil() {
            return self.clone();
        }
        let mut bytes = self.0.clone();
        bytes[0] = code as u8;
        Self(bytes)
    }

    /// Compose `primary` and `embed` into an identifier of the composite `code`.
    ///
    /// If either side is empty, the other side is returned unchanged.
    pub fn compose(code: Code, primary: &Id, embed: &Id) -> Result<Self> {
        if code.composite_parts().is_none() {
            return Err(Error::invalid("id.compose", "not a composite code").with("code", code));
        }
        if embed.is_nil() {
            return Ok(primary.clone());
        }
        if primary.is_nil() {
            return Ok(embed.clone());
        }
        let mut bytes = Vec::with_capacity(primary.0.len() + embed.0.len() + varint::MAX_LEN);
        bytes.push(code as u8);
        varint::put_prefixed(&mut bytes, embed.as_bytes());
        bytes.extend_from_slice(primary.payload());
        Ok(Self(bytes))
    }

    /// Split a composed identifier into its (primary, embedded) identifiers.
    ///
    /// Non-composed identifiers decompose into themselves and an empty embedded id.
    pub fn decompose(&self) -> Result<(Id, Id)> {
        let Some((primary_code, _)) = self.code().composite_parts() else {
            return Ok((self.clone(), Id::default()));
        };
        let (embed, payload) = varint::get_prefixed(self.payload())
            .map_err(|e| Error::invalid("id.decompose", "invalid embedded id").with("id", self).cause(e))?;
        Ok((Id::new(primary_code, payload), Id(embed.to_vec())))
    }

    /// Find the first identifier compatible with `target` among the candidate strings.
    ///
    /// Empty candidates are skipped. Fails only if every non-empty candidate is
    /// unparsable; returns `None` if no compatible identifier was found.
    pub fn extract(target: Code, candidates: &[&str]) -> Result<Option<Id>> {
        let mut seen = 0;
        let mut failed = 0;
        let mut last_err = None;
        for candidate in candidates.iter().filter(|s| !s.is_empty()) {
            seen += 1;
            let id = match Id::parse(candidate) {
                Ok(id) => id,
                Err(e) => {
                    failed += 1;
                    last_err = Some(e);
                    continue;
                }
            };
            if id.is_valid() && id.code().is_compatible_with(target) {
                return Ok(Some(id));
            }
            if let Ok((primary, embed)) = id.decompose() {
                if embed.is_valid() && embed.code().is_compatible_with(target) {
                    return Ok(Some(embed));
                }
                if primary.is_valid() && primary.code() == target {
                    return Ok(Some(primary));
                }
            }
        }
        if seen > 0 && failed == seen {
            let mut err = Error::invalid("id.extract", "no parsable id").with("target", target);
            if let Some(cause) = last_err {
                err = err.cause(cause);
            }
            return Err(err);
        }
        Ok(None)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_nil() {
            return Ok(());
        }
        write!(
            f,
            "{}{}",
            self.code().prefix(),
            bs58::encode(self.payload()).into_string()
        )
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Id").field(&self.to_string()).finish()
    }
}

impl FromStr for Id {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Id::parse(s)
    }
}

impl Serialize for Id {
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

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            Id::parse(&s).map_err(serde::de::Error::custom)
        } else {
            let bytes = serde_bytes::ByteBuf::deserialize(deserializer)?;
            Id::from_bytes(&bytes).map_err(serde::de::Error::custom)
        }
    }
}
