//! Claims carried by a token and their serializations.
//!
//! The same [`TokenData`] is serialized three ways:
//!
//! - **JSON**: short keys, identifiers in string form, addresses and transaction hashes as
//!   `0x` hex, timestamps as epoch milliseconds.
//! - **CBOR**: the same keys, identifiers, hashes and addresses as byte strings.
//! - **Custom**: a sequence of varint length-prefixed fields in a fixed order (see
//!   [`TokenData::encode_custom`]).
//!
//! Unset claims are omitted by every format.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use elv_core::varint;
use elv_core::{Address, Error, Hash, Id, Result, SerializationFormat, TxHash};

/// Access granted by a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Grant {
    Create,
    Access,
    Read,
    Update,
    ReadCrypt,
    ReadAdmin,
    WriteAdmin,
}

impl Grant {
    /// Every grant.
    pub const ALL: [Grant; 7] = [
        Grant::Create,
        Grant::Access,
        Grant::Read,
        Grant::Update,
        Grant::ReadCrypt,
        Grant::ReadAdmin,
        Grant::WriteAdmin,
    ];

    /// Wire name of the grant.
    pub fn as_str(self) -> &'static str {
        match self {
            Grant::Create => "create",
            Grant::Access => "access",
            Grant::Read => "read",
            Grant::Update => "update",
            Grant::ReadCrypt => "read-crypt",
            Grant::ReadAdmin => "read-admin",
            Grant::WriteAdmin => "write-admin",
        }
    }

    /// Parse a wire name.
    pub fn parse(s: &str) -> Result<Grant> {
        Self::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| Error::invalid("grant.parse", "unknown grant").with("grant", s))
    }
}

impl fmt::Display for Grant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Grant {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Grant::parse(s)
    }
}

/// Current time truncated to the millisecond precision tokens carry.
pub fn now_millis() -> DateTime<Utc> {
    truncate_millis(Utc::now())
}

/// Truncate a timestamp to millisecond precision.
pub fn truncate_millis(t: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(t.timestamp_millis()).unwrap_or(t)
}

/// Claims of a token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenData {
    /// Transaction hash of a tx token.
    #[serde(rename = "txh", default, skip_serializing_if = "Option::is_none")]
    pub eth_tx_hash: Option<TxHash>,

    /// Address of the signer.
    #[serde(rename = "adr", default, skip_serializing_if = "Option::is_none")]
    pub eth_addr: Option<Address>,

    /// AFGH public key used for proxy re-encryption.
    #[serde(rename = "apk", default, skip_serializing_if = "String::is_empty")]
    pub afgh_pk: String,

    /// Part hash of a node token.
    #[serde(rename = "qph", default, skip_serializing_if = "Option::is_none")]
    pub qp_hash: Option<Hash>,

    /// Space ID.
    #[serde(rename = "sid", default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<Id>,

    /// Library ID.
    #[serde(rename = "lid", default, skip_serializing_if = "Option::is_none")]
    pub lid: Option<Id>,

    /// Content ID.
    #[serde(rename = "qid", default, skip_serializing_if = "Option::is_none")]
    pub qid: Option<Id>,

    /// Subject the token was issued to.
    #[serde(rename = "sub", default, skip_serializing_if = "String::is_empty")]
    pub subject: String,

    #[serde(rename = "gra", default, skip_serializing_if = "Option::is_none")]
    pub grant: Option<Grant>,

    #[serde(rename = "iat", default, skip_serializing_if = "Option::is_none", with = "millis")]
    pub issued_at: Option<DateTime<Utc>>,

    #[serde(rename = "exp", default, skip_serializing_if = "Option::is_none", with = "millis")]
    pub expires: Option<DateTime<Utc>>,

    /// Free-form context.
    #[serde(rename = "ctx", default, skip_serializing_if = "Map::is_empty")]
    pub ctx: Map<String, Value>,
}

mod millis {
    use chrono::{DateTime, Utc};
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(t: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match t {
            Some(t) => serializer.serialize_i64(t.timestamp_millis()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<i64>::deserialize(deserializer)? {
            None | Some(0) => Ok(None),
            Some(ms) => DateTime::from_timestamp_millis(ms)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("timestamp out of range: {ms}"))),
        }
    }
}

impl TokenData {
    /// Serialize with the given format.
    pub fn encode(&self, format: SerializationFormat) -> Result<Vec<u8>> {
        match format {
            SerializationFormat::Json => self.encode_json(),
            SerializationFormat::Cbor => self.encode_cbor(),
            SerializationFormat::Custom => self.encode_custom(),
            SerializationFormat::Unknown => {
                Err(Error::invalid("token_data.encode", "unknown serialization format"))
            }
        }
    }

    /// Deserialize bytes produced by [`TokenData::encode`] with the same format.
    pub fn decode(format: SerializationFormat, bytes: &[u8]) -> Result<Self> {
        match format {
            SerializationFormat::Json => Self::decode_json(bytes),
            SerializationFormat::Cbor => Self::decode_cbor(bytes),
            SerializationFormat::Custom => Self::decode_custom(bytes),
            SerializationFormat::Unknown => {
                Err(Error::invalid("token_data.decode", "unknown serialization format"))
            }
        }
    }

    pub fn encode_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| Error::other("token_data.encode_json", "json encoding failed").cause(e))
    }

    pub fn decode_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| Error::invalid("token_data.decode_json", "invalid json claims").cause(e))
    }

    pub fn encode_cbor(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::ser::into_writer(self, &mut buf)
            .map_err(|e| Error::other("token_data.encode_cbor", "cbor encoding failed").cause(e))?;
        Ok(buf)
    }

    pub fn decode_cbor(bytes: &[u8]) -> Result<Self> {
        ciborium::de::from_reader(bytes)
            .map_err(|e| Error::invalid("token_data.decode_cbor", "invalid cbor claims").cause(e))
    }

    /// Serialize as varint length-prefixed fields.
    ///
    /// Field order: tx hash, address, AFGH key, part hash (string form), space ID,
    /// library ID, content ID, grant, issued-at, expires, context, subject. Timestamps
    /// are 8-byte big-endian epoch milliseconds and the context is CBOR. Unset fields
    /// are empty.
    pub fn encode_custom(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        let put = varint::put_prefixed;

        put(&mut buf, self.eth_tx_hash.as_ref().map(|h| &h.as_bytes()[..]).unwrap_or_default());
        put(&mut buf, self.eth_addr.as_ref().map(|a| &a.as_bytes()[..]).unwrap_or_default());
        put(&mut buf, self.afgh_pk.as_bytes());
        put(
            &mut buf,
            self.qp_hash.as_ref().map(|h| h.to_string()).unwrap_or_default().as_bytes(),
        );
        put(&mut buf, self.sid.as_ref().map(Id::as_bytes).unwrap_or_default());
        put(&mut buf, self.lid.as_ref().map(Id::as_bytes).unwrap_or_default());
        put(&mut buf, self.qid.as_ref().map(Id::as_bytes).unwrap_or_default());
        put(&mut buf, self.grant.map(Grant::as_str).unwrap_or_default().as_bytes());
        put(&mut buf, &timestamp_bytes(self.issued_at));
        put(&mut buf, &timestamp_bytes(self.expires));

        let mut ctx = Vec::new();
        if !self.ctx.is_empty() {
            ciborium::ser::into_writer(&self.ctx, &mut ctx).map_err(|e| {
                Error::other("token_data.encode_custom", "cbor encoding of context failed").cause(e)
            })?;
        }
        put(&mut buf, &ctx);
        put(&mut buf, self.subject.as_bytes());

        Ok(buf)
    }

    /// Deserialize bytes produced by [`TokenData::encode_custom`].
    ///
    /// The trailing subject field may be absent.
    pub fn decode_custom(bytes: &[u8]) -> Result<Self> {
        const OP: &str = "token_data.decode_custom";
        let mut fields = FieldReader { rest: bytes };
        let mut data = TokenData::default();

        let field = fields.next()?;
        if !field.is_empty() {
            data.eth_tx_hash = Some(TxHash::from_slice(field)?);
        }
        let field = fields.next()?;
        if !field.is_empty() {
            data.eth_addr = Some(Address::from_slice(field)?);
        }
        data.afgh_pk = utf8(OP, "apk", fields.next()?)?;
        let field = utf8(OP, "qph", fields.next()?)?;
        if !field.is_empty() {
            data.qp_hash = Some(Hash::parse(&field)?);
        }
        data.sid = optional_id(fields.next()?)?;
        data.lid = optional_id(fields.next()?)?;
        data.qid = optional_id(fields.next()?)?;
        let field = utf8(OP, "gra", fields.next()?)?;
        if !field.is_empty() {
            data.grant = Some(Grant::parse(&field)?);
        }
        data.issued_at = timestamp_from_bytes("iat", fields.next()?)?;
        data.expires = timestamp_from_bytes("exp", fields.next()?)?;
        let field = fields.next()?;
        if !field.is_empty() {
            data.ctx = ciborium::de::from_reader(field)
                .map_err(|e| Error::invalid(OP, "invalid cbor context").cause(e))?;
        }
        if !fields.rest.is_empty() {
            data.subject = utf8(OP, "sub", fields.next()?)?;
        }
        if !fields.rest.is_empty() {
            return Err(Error::invalid(OP, "trailing bytes").with("len", fields.rest.len()));
        }

        Ok(data)
    }
}

struct FieldReader<'a> {
    rest: &'a [u8],
}

impl<'a> FieldReader<'a> {
    fn next(&mut self) -> Result<&'a [u8]> {
        let (field, rest) = varint::get_prefixed(self.rest)?;
        self.rest = rest;
        Ok(field)
    }
}

fn utf8(op: &'static str, field: &'static str, bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|e| Error::invalid(op, "invalid utf-8").with("field", field).cause(e))
}

fn optional_id(bytes: &[u8]) -> Result<Option<Id>> {
    if bytes.is_empty() {
        return Ok(None);
    }
    Id::from_bytes(bytes).map(Some)
}

fn timestamp_bytes(t: Option<DateTime<Utc>>) -> Vec<u8> {
    t.map(|t| t.timestamp_millis().to_be_bytes().to_vec())
        .unwrap_or_default()
}

fn timestamp_from_bytes(field: &'static str, bytes: &[u8]) -> Result<Option<DateTime<Utc>>> {
    if bytes.is_empty() {
        return Ok(None);
    }
    let raw: [u8; 8] = bytes.try_into().map_err(|_| {
        Error::invalid("token_data.decode_custom", "invalid timestamp length")
            .with("field", field)
            .with("len", bytes.len())
    })?;
    let ms = i64::from_be_bytes(raw);
    if ms == 0 {
        return Ok(None);
    }
    DateTime::from_timestamp_millis(ms).map(Some).ok_or_else(|| {
        Error::invalid("token_data.decode_custom", "timestamp out of range")
            .with("field", field)
            .with("ms", ms)
    })
}
