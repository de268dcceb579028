//! The token envelope: prefix, signature, embedded token and claims.
//!
//! A token string is a six character prefix followed by the base58 encoding of the
//! signature (when signed) and the payload:
//!
//! ```text
//! TTT S FF base58( SIGNATURE | [varint(len) | EMBEDDED_PREFIX | EMBEDDED_BODY] | CLAIMS )
//! ```
//!
//! `TTT` is the [`TokenType`], `S` the [`TokenSigType`] and `FF` the [`TokenFormat`].
//! Only client tokens carry an embedded token. The claims are serialized according to
//! the format and DEFLATE compressed for the compressed formats. The signature covers
//! the payload exactly as transmitted.
//!
//! Strings that don't start with a known prefix are tried as legacy tokens, see
//! [`crate::legacy`].

use std::fmt;
use std::io::{Read, Write};

use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use tracing::debug;

use elv_core::sign::SIG_LEN;
use elv_core::varint;
use elv_core::{Address, Error, Result, Sig};

use crate::data::TokenData;
use crate::explain::EncodingDetails;
use crate::formats::{TokenFormat, FORMAT_PREFIX_LEN};
use crate::legacy;
use crate::sigtypes::{TokenSigType, SIG_TYPE_PREFIX_LEN};
use crate::types::{TokenType, TYPE_PREFIX_LEN};

/// Length of the `type | sig type | format` prefix of every token string.
pub const TOKEN_PREFIX_LEN: usize = TYPE_PREFIX_LEN + SIG_TYPE_PREFIX_LEN + FORMAT_PREFIX_LEN;

/// Upper bound of the decompressed claims of a token.
pub const MAX_CLAIMS_LEN: usize = 1 << 20;

/// An authorization token.
///
/// Encoding caches the resulting string; [`Token::data_mut`] and the other mutators
/// clear it. A token is not synchronized and must not be encoded from several threads
/// at once.
#[derive(Debug, Clone, Default)]
pub struct Token {
    pub(crate) token_type: TokenType,
    pub(crate) format: TokenFormat,
    pub(crate) sig_type: TokenSigType,
    pub(crate) data: TokenData,
    /// Signed payload bytes.
    pub(crate) token_bytes: Vec<u8>,
    pub(crate) signature: Sig,
    pub(crate) embedded: Option<Box<Token>>,
    pub(crate) embedded_len: usize,
    pub(crate) encoded: Option<String>,
    pub(crate) bearer: Option<String>,
    pub(crate) signer: Option<Address>,
    pub(crate) details: EncodingDetails,
}

impl Token {
    /// Create an unsigned token without claims.
    pub fn new(token_type: TokenType, sig_type: TokenSigType, format: TokenFormat) -> Self {
        Self {
            token_type,
            format,
            sig_type,
            ..Default::default()
        }
    }

    /// Parse a token string and validate it.
    ///
    /// An empty string yields a nil token.
    pub fn parse(s: &str) -> Result<Token> {
        if s.is_empty() {
            return Ok(Token::default());
        }
        let token = Self::decode_unchecked(s)?;
        token.validate().map_err(|e| e.with("token_string", truncate(s)))?;
        Ok(token)
    }

    /// Parse a token string, panicking on failure.
    ///
    /// # Panics
    ///
    /// If `s` is not a valid token.
    pub fn must_parse(s: &str) -> Token {
        match Self::parse(s) {
            Ok(token) => token,
            Err(e) => panic!("invalid token: {e}"),
        }
    }

    /// Encode the token, panicking on failure.
    ///
    /// # Panics
    ///
    /// If the token fails validation or cannot be serialized.
    pub fn must_encode(&mut self) -> String {
        match self.encode() {
            Ok(s) => s,
            Err(e) => panic!("failed to encode token: {e}"),
        }
    }

    pub fn token_type(&self) -> TokenType {
        self.token_type
    }

    pub fn format(&self) -> TokenFormat {
        self.format
    }

    pub fn sig_type(&self) -> TokenSigType {
        self.sig_type
    }

    pub fn data(&self) -> &TokenData {
        &self.data
    }

    /// Mutable access to the claims. Clears the cached encoding and signed bytes.
    pub fn data_mut(&mut self) -> &mut TokenData {
        self.clear_caches();
        &mut self.data
    }

    pub fn signature(&self) -> &Sig {
        &self.signature
    }

    /// Payload bytes the signature covers, empty until encoded, signed or decoded.
    pub fn token_bytes(&self) -> &[u8] {
        &self.token_bytes
    }

    /// The token embedded in a client token.
    pub fn embedded(&self) -> Option<&Token> {
        self.embedded.as_deref()
    }

    /// Length of the encoded embedded token within the payload.
    pub fn embedded_len(&self) -> usize {
        self.embedded_len
    }

    /// Set the embedded token. Clears the cached encoding.
    pub fn set_embedded(&mut self, embedded: Token) {
        self.clear_caches();
        self.embedded = Some(Box::new(embedded));
    }

    /// Change the format. Clears the cached encoding.
    pub fn set_format(&mut self, format: TokenFormat) {
        self.clear_caches();
        self.format = format;
    }

    /// The string this token was parsed from.
    pub fn original_bearer(&self) -> Result<&str> {
        self.bearer.as_deref().ok_or_else(|| {
            Error::not_exist("token.original_bearer", "token was not parsed from a string")
        })
    }

    /// True if type, format and signature type are all unknown.
    pub fn is_nil(&self) -> bool {
        self.token_type == TokenType::Unknown
            && self.format == TokenFormat::Unknown
            && self.sig_type == TokenSigType::Unknown
    }

    /// The six character prefix of new-format token strings.
    pub fn prefix(&self) -> String {
        format!(
            "{}{}{}",
            self.token_type.prefix(),
            self.sig_type.prefix(),
            self.format.prefix()
        )
    }

    pub(crate) fn clear_caches(&mut self) {
        self.encoded = None;
        self.token_bytes.clear();
        self.signer = None;
        self.details = EncodingDetails::default();
    }

    /// Validate and encode the token.
    ///
    /// A nil token encodes to an empty string. The result is cached until the token is
    /// mutated.
    pub fn encode(&mut self) -> Result<String> {
        if self.is_nil() {
            return Ok(String::new());
        }
        if let Some(encoded) = &self.encoded {
            return Ok(encoded.clone());
        }
        self.validate()?;
        let encoded = self.encode_unchecked()?;
        self.encoded = Some(encoded.clone());
        Ok(encoded)
    }

    pub(crate) fn encode_unchecked(&mut self) -> Result<String> {
        let encoded = match self.format {
            TokenFormat::Legacy => legacy::encode(self)?,
            TokenFormat::LegacySigned => legacy::encode_signed(self)?,
            _ => {
                self.ensure_token_bytes()?;
                let mut blob = Vec::with_capacity(SIG_LEN + self.token_bytes.len());
                if self.sig_type.is_signed() {
                    blob.extend_from_slice(self.signature.sig_bytes());
                }
                blob.extend_from_slice(&self.token_bytes);
                format!("{}{}", self.prefix(), bs58::encode(blob).into_string())
            }
        };
        self.details.encoded_len = encoded.len();
        Ok(encoded)
    }

    pub(crate) fn ensure_token_bytes(&mut self) -> Result<()> {
        if self.token_bytes.is_empty() {
            self.token_bytes = self.encode_bytes()?;
        }
        Ok(())
    }

    /// Serialize the payload the signature covers.
    pub(crate) fn encode_bytes(&mut self) -> Result<Vec<u8>> {
        match self.format {
            TokenFormat::Legacy => return legacy::payload(self),
            TokenFormat::LegacySigned => return legacy::signed_payload(self),
            TokenFormat::Unknown => {
                return Err(Error::invalid("token.encode", "unknown token format"));
            }
            _ => {}
        }

        let mut payload = Vec::new();
        if self.token_type == TokenType::Client {
            let embedded = self.embedded.as_deref_mut().ok_or_else(|| {
                Error::invalid("token.encode", "client token without embedded token")
            })?;
            let raw = embedded.encode_embedded()?;
            varint::put_prefixed(&mut payload, &raw);
            self.embedded_len = raw.len();
        }

        let claims = self.data.encode(self.format.serialization())?;
        let data_len = claims.len();
        let mut compressed_len = None;
        if self.format.compressed() {
            let compressed = deflate(&claims)?;
            compressed_len = Some(compressed.len());
            payload.extend_from_slice(&compressed);
        } else {
            payload.extend_from_slice(&claims);
        }

        self.details = EncodingDetails {
            prefix: self.prefix(),
            signature_len: if self.sig_type.is_signed() { SIG_LEN } else { 0 },
            embedded_len: self.embedded_len,
            data_len,
            compressed_len,
            payload_len: payload.len(),
            encoded_len: 0,
        };
        Ok(payload)
    }

    /// Raw form of a token inside a client token: prefix, signature and payload.
    fn encode_embedded(&mut self) -> Result<Vec<u8>> {
        self.validate()?;
        if self.format.is_legacy() {
            return Err(Error::invalid("token.encode", "legacy tokens cannot be embedded")
                .with("format", self.format));
        }
        self.ensure_token_bytes()?;
        let mut raw = self.prefix().into_bytes();
        if self.sig_type.is_signed() {
            raw.extend_from_slice(self.signature.sig_bytes());
        }
        raw.extend_from_slice(&self.token_bytes);
        Ok(raw)
    }

    /// Decode a token string without validating it.
    pub(crate) fn decode_unchecked(s: &str) -> Result<Token> {
        const OP: &str = "token.decode";
        if s.len() < TOKEN_PREFIX_LEN {
            return Err(Error::invalid(OP, "token too short").with("token_string", truncate(s)));
        }

        let mut token = match split_prefix(s) {
            Some(prefix) if !s.contains('.') => {
                let body = bs58::decode(&s[TOKEN_PREFIX_LEN..]).into_vec().map_err(|e| {
                    Error::invalid(OP, "invalid base58 body")
                        .with("token_string", truncate(s))
                        .cause(e)
                })?;
                Self::decode_raw(prefix, &body)?
            }
            _ => Self::decode_fallback(s)?,
        };

        token.encoded = Some(s.to_string());
        token.bearer = Some(s.to_string());
        token.details.encoded_len = s.len();
        Ok(token)
    }

    fn decode_fallback(s: &str) -> Result<Token> {
        debug!(token_len = s.len(), "Unknown token prefix, trying legacy format");
        let legacy_err = match legacy::decode(s) {
            Ok(token) => return Ok(token),
            Err(e) => e,
        };

        match s.split_once('.') {
            Some((inner, _)) if split_prefix(inner).is_some() => {
                debug!(token_len = s.len(), "Trying legacy-signed format");
                legacy::decode_signed(s)
            }
            _ => Err(Error::invalid("token.decode", "unknown token format")
                .with("prefix", s.get(..TOKEN_PREFIX_LEN).unwrap_or(s))
                .with("token_string", truncate(s))
                .cause(legacy_err)),
        }
    }

    /// Decode the base58-decoded body of a token with a known prefix.
    pub(crate) fn decode_raw(
        (token_type, sig_type, format): (TokenType, TokenSigType, TokenFormat),
        body: &[u8],
    ) -> Result<Token> {
        const OP: &str = "token.decode";
        let mut token = Token::new(token_type, sig_type, format);

        let mut payload = body;
        if sig_type.is_signed() {
            let code = sig_type.sig_code().ok_or_else(|| {
                Error::invalid(OP, "signature type not implemented").with("sig_type", sig_type)
            })?;
            if body.len() < SIG_LEN {
                return Err(Error::invalid(OP, "token shorter than its signature")
                    .with("sig_type", sig_type)
                    .with("len", body.len()));
            }
            let (sig, rest) = body.split_at(SIG_LEN);
            token.signature = Sig::new(code, sig);
            payload = rest;
        }
        token.token_bytes = payload.to_vec();

        let mut claims = payload;
        if token_type == TokenType::Client {
            let (raw, rest) = varint::get_prefixed(payload)?;
            token.embedded = Some(Box::new(Self::decode_embedded(raw)?));
            token.embedded_len = raw.len();
            claims = rest;
        }

        let compressed_len = claims.len();
        let claims = if format.compressed() {
            inflate(claims)?
        } else {
            claims.to_vec()
        };
        token.data = TokenData::decode(format.serialization(), &claims)
            .map_err(|e| e.with("format", format))?;

        token.details = EncodingDetails {
            prefix: token.prefix(),
            signature_len: if sig_type.is_signed() { SIG_LEN } else { 0 },
            embedded_len: token.embedded_len,
            data_len: claims.len(),
            compressed_len: format.compressed().then_some(compressed_len),
            payload_len: token.token_bytes.len(),
            encoded_len: 0,
        };
        Ok(token)
    }

    fn decode_embedded(raw: &[u8]) -> Result<Token> {
        let prefix = raw
            .get(..TOKEN_PREFIX_LEN)
            .and_then(|p| std::str::from_utf8(p).ok())
            .and_then(split_prefix)
            .ok_or_else(|| Error::invalid("token.decode", "invalid embedded token prefix"))?;
        // one level of nesting only
        if !matches!(prefix.0, TokenType::StateChannel | TokenType::EditorSigned) {
            return Err(Error::invalid(
                "token.decode",
                "embedded token must be state-channel or editor-signed",
            )
            .with("type", prefix.0));
        }
        let token = Self::decode_raw(prefix, &raw[TOKEN_PREFIX_LEN..])?;
        token.validate().map_err(|e| e.with("embedded", true))?;
        Ok(token)
    }
}

/// Split the prefix off a new-format token string.
pub(crate) fn split_prefix(s: &str) -> Option<(TokenType, TokenSigType, TokenFormat)> {
    let token_type = TokenType::from_prefix(s.get(..TYPE_PREFIX_LEN)?)?;
    let sig_type =
        TokenSigType::from_prefix(s.get(TYPE_PREFIX_LEN..TYPE_PREFIX_LEN + SIG_TYPE_PREFIX_LEN)?)?;
    let format = TokenFormat::from_prefix(s.get(TYPE_PREFIX_LEN + SIG_TYPE_PREFIX_LEN..TOKEN_PREFIX_LEN)?)?;
    Some((token_type, sig_type, format))
}

/// Token strings are truncated in error fields.
fn truncate(s: &str) -> &str {
    const MAX: usize = 64;
    let mut end = s.len().min(MAX);
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::best());
    encoder
        .write_all(data)
        .and_then(|_| encoder.finish())
        .map_err(|e| Error::other("token.encode", "compression failed").cause(e))
}

fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    DeflateDecoder::new(data)
        .take(MAX_CLAIMS_LEN as u64 + 1)
        .read_to_end(&mut out)
        .map_err(|e| Error::invalid("token.decode", "decompression failed").cause(e))?;
    if out.len() > MAX_CLAIMS_LEN {
        return Err(Error::invalid("token.decode", "decompressed claims too large")
            .with("max", MAX_CLAIMS_LEN));
    }
    Ok(out)
}

/// Tokens are equal if type, format, signature type, claims, signature and embedded
/// token are. Caches are ignored.
impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.token_type == other.token_type
            && self.format == other.format
            && self.sig_type == other.sig_type
            && self.data == other.data
            && self.signature == other.signature
            && self.embedded == other.embedded
    }
}

/// The encoded token, or an empty string if it can't be encoded.
impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(encoded) = &self.encoded {
            return f.write_str(encoded);
        }
        f.write_str(&self.clone().encode().unwrap_or_default())
    }
}
