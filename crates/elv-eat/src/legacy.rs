//! Legacy token strings.
//!
//! Two encodings predate the prefixed token format and are still accepted:
//!
//! - **legacy**: `base64(json)[.base64(signature)]` where the JSON object is a
//!   [`TokenDataLegacy`]. The token type is not transmitted and is inferred from the
//!   claims present.
//! - **legacy-signed**: `<token>.<base64(signature)>` where `<token>` is an unsigned
//!   prefixed token string and the ES256K signature covers that string.
//!
//! A legacy client token carries the signature of the state-channel token it wraps in
//! its `auth_sig` field.

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use elv_core::eth::keccak256;
use elv_core::sign::SIG_LEN;
use elv_core::{Address, Error, Hash, Id, Result, Sig, SigCode, TxHash};

use crate::data::{Grant, TokenData};
use crate::formats::TokenFormat;
use crate::sigtypes::TokenSigType;
use crate::token::{split_prefix, Token, TOKEN_PREFIX_LEN};
use crate::types::TokenType;

/// JSON claims of a legacy token. Field names and order are fixed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenDataLegacy {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub qspace_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub qlib_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub addr: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tx_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub qphash: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub qid: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub grant: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub tx_required: bool,
    /// Issued-at, unix seconds.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub iat: i64,
    /// Expiry, unix seconds.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub exp: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ip_geo: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub ctx: Map<String, Value>,
    /// Signature of the embedded state-channel token of a client token.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub auth_sig: String,
}

/// One-time-password wrapper around a legacy token.
#[derive(Debug, Default, Deserialize)]
struct OtpWrapper {
    #[serde(default)]
    tok: String,
    #[serde(default)]
    qid: String,
}

fn is_false(b: &bool) -> bool {
    !*b
}

fn is_zero(n: &i64) -> bool {
    *n == 0
}

impl TokenDataLegacy {
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| Error::invalid("legacy.decode", "invalid legacy token json").cause(e))
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| Error::other("legacy.encode", "json encoding failed").cause(e))
    }

    /// Legacy claims for `data`. Subject and AFGH key have no legacy counterpart.
    pub fn from_token_data(data: &TokenData) -> Self {
        fn string<T: ToString>(v: &Option<T>) -> String {
            v.as_ref().map(ToString::to_string).unwrap_or_default()
        }
        Self {
            qspace_id: string(&data.sid),
            qlib_id: string(&data.lid),
            addr: string(&data.eth_addr),
            tx_id: string(&data.eth_tx_hash),
            qphash: string(&data.qp_hash),
            qid: string(&data.qid),
            grant: string(&data.grant),
            tx_required: false,
            iat: data.issued_at.map(|t| t.timestamp()).unwrap_or_default(),
            exp: data.expires.map(|t| t.timestamp()).unwrap_or_default(),
            ip_geo: String::new(),
            ctx: data.ctx.clone(),
            auth_sig: String::new(),
        }
    }

    /// Claims in the current model. `tx_required`, `ip_geo` and `auth_sig` are dropped.
    pub fn to_token_data(&self) -> Result<TokenData> {
        fn parse<T>(s: &str, f: impl FnOnce(&str) -> Result<T>) -> Result<Option<T>> {
            if s.is_empty() {
                return Ok(None);
            }
            f(s).map(Some)
        }
        fn seconds(field: &'static str, secs: i64) -> Result<Option<DateTime<chrono::Utc>>> {
            if secs == 0 {
                return Ok(None);
            }
            DateTime::from_timestamp(secs, 0).map(Some).ok_or_else(|| {
                Error::invalid("legacy.decode", "timestamp out of range")
                    .with("field", field)
                    .with("secs", secs)
            })
        }

        Ok(TokenData {
            eth_tx_hash: parse(&self.tx_id, TxHash::parse)?,
            eth_addr: parse(&self.addr, Address::parse)?,
            afgh_pk: String::new(),
            qp_hash: parse(&self.qphash, Hash::parse)?,
            sid: parse(&self.qspace_id, Id::parse)?,
            lid: parse(&self.qlib_id, Id::parse)?,
            qid: parse(&self.qid, Id::parse)?,
            subject: String::new(),
            grant: parse(&self.grant, Grant::parse)?,
            issued_at: seconds("iat", self.iat)?,
            expires: seconds("exp", self.exp)?,
            ctx: self.ctx.clone(),
        })
    }

    /// Whether these claims form a client token wrapping a state-channel token.
    pub fn is_elv_client_token(&self) -> bool {
        !self.qspace_id.is_empty()
            && !self.qlib_id.is_empty()
            && !self.addr.is_empty()
            && !self.grant.is_empty()
            && self.exp != 0
            && Sig::parse(&self.auth_sig).is_ok_and(|sig| sig.code() == SigCode::ES256K)
    }
}

fn decode_base64(s: &str) -> Result<Vec<u8>> {
    let mut last_err = None;
    for engine in [&STANDARD, &URL_SAFE, &STANDARD_NO_PAD, &URL_SAFE_NO_PAD] {
        match engine.decode(s) {
            Ok(bytes) => return Ok(bytes),
            Err(e) => last_err = Some(e),
        }
    }
    let err = Error::invalid("legacy.decode", "invalid base64");
    Err(match last_err {
        Some(e) => err.cause(e),
        None => err,
    })
}

fn decode_signature(s: &str) -> Result<Sig> {
    let bytes = decode_base64(s)?;
    if bytes.len() != SIG_LEN {
        return Err(Error::invalid("legacy.decode", "invalid signature length").with("len", bytes.len()));
    }
    Ok(Sig::new(SigCode::ES256K, &bytes))
}

/// Decode a legacy token string, unwrapping a one-time-password wrapper.
pub(crate) fn decode(s: &str) -> Result<Token> {
    decode_legacy(s, true)
}

fn decode_legacy(s: &str, unwrap_otp: bool) -> Result<Token> {
    let (payload, sig) = match s.split_once('.') {
        Some((payload, sig)) => (payload, Some(decode_signature(sig)?)),
        None => (s, None),
    };
    let json = decode_base64(payload)?;

    if unwrap_otp {
        if let Ok(otp) = serde_json::from_slice::<OtpWrapper>(&json) {
            if !otp.tok.is_empty() {
                debug!("Unwrapping one-time-password token");
                let mut token = decode_legacy(&otp.tok, false)?;
                if !otp.qid.is_empty() {
                    token.data.qid = Some(Id::parse(&otp.qid)?);
                }
                return Ok(token);
            }
        }
    }

    let legacy = TokenDataLegacy::from_json(&json)?;
    if legacy.is_elv_client_token() {
        return decode_client(&legacy, json, sig);
    }

    let token_type = match &sig {
        None => TokenType::Anonymous,
        Some(_) if !legacy.tx_id.is_empty() => TokenType::Tx,
        Some(_) if !legacy.qphash.is_empty() => TokenType::Node,
        Some(_) if !legacy.qid.is_empty() && !legacy.grant.is_empty() && legacy.exp != 0 => {
            TokenType::StateChannel
        }
        Some(_) => TokenType::Plain,
    };
    let sig_type = if sig.is_some() {
        TokenSigType::ES256K
    } else {
        TokenSigType::Unsigned
    };

    let mut token = Token::new(token_type, sig_type, TokenFormat::Legacy);
    token.data = legacy.to_token_data()?;
    token.token_bytes = json;
    token.signature = sig.unwrap_or_default();
    Ok(token)
}

fn decode_client(legacy: &TokenDataLegacy, json: Vec<u8>, sig: Option<Sig>) -> Result<Token> {
    let data = legacy.to_token_data()?;

    let mut state_channel = legacy.clone();
    state_channel.auth_sig.clear();
    let mut embedded = Token::new(TokenType::StateChannel, TokenSigType::ES256K, TokenFormat::Legacy);
    embedded.data = data.clone();
    embedded.token_bytes = state_channel.to_json()?;
    embedded.signature = Sig::parse(&legacy.auth_sig)?;

    if let Some(sig) = &sig {
        let outer = sig.signer_address_from_hash(&keccak256(&json));
        let inner = embedded
            .signature
            .signer_address_from_hash(&keccak256(&embedded.token_bytes));
        if let (Ok(outer), Ok(inner)) = (outer, inner) {
            if outer == inner {
                debug!(signer = %outer, "Legacy client token signed by its state-channel signer");
                let mut token =
                    Token::new(TokenType::EditorSigned, TokenSigType::ES256K, TokenFormat::Legacy);
                token.data = data;
                token.token_bytes = json;
                token.signature = sig.clone();
                token.signer = Some(outer);
                return Ok(token);
            }
        }
    }

    let sig_type = if sig.is_some() {
        TokenSigType::ES256K
    } else {
        TokenSigType::Unsigned
    };
    let mut token = Token::new(TokenType::Client, sig_type, TokenFormat::Legacy);
    token.data.sid = data.sid;
    token.data.lid = data.lid;
    token.token_bytes = json;
    token.signature = sig.unwrap_or_default();
    token.embedded = Some(Box::new(embedded));
    Ok(token)
}

/// JSON payload of a legacy token.
pub(crate) fn payload(token: &Token) -> Result<Vec<u8>> {
    let legacy = match token.token_type {
        TokenType::Client => {
            let embedded = token.embedded.as_deref().ok_or_else(|| {
                Error::invalid("legacy.encode", "client token without embedded token")
            })?;
            if embedded.format != TokenFormat::Legacy
                || embedded.sig_type != TokenSigType::ES256K
                || embedded.signature.is_nil()
            {
                return Err(Error::invalid(
                    "legacy.encode",
                    "legacy client token requires a signed legacy embedded token",
                )
                .with("format", embedded.format)
                .with("sig_type", embedded.sig_type));
            }
            let mut legacy = TokenDataLegacy::from_token_data(&embedded.data);
            legacy.auth_sig = embedded.signature.to_string();
            legacy
        }
        _ => TokenDataLegacy::from_token_data(&token.data),
    };
    legacy.to_json()
}

/// Encode a legacy token: `base64(json)[.base64(signature)]`.
pub(crate) fn encode(token: &mut Token) -> Result<String> {
    if !matches!(token.sig_type, TokenSigType::Unsigned | TokenSigType::ES256K) {
        return Err(Error::invalid("legacy.encode", "unsupported signature type")
            .with("sig_type", token.sig_type));
    }
    token.ensure_token_bytes()?;
    let mut s = STANDARD.encode(&token.token_bytes);
    if token.sig_type.is_signed() {
        s.push('.');
        s.push_str(&STANDARD.encode(token.signature.sig_bytes()));
    }
    Ok(s)
}

/// The unsigned prefixed token string a legacy-signed token signs.
pub(crate) fn signed_payload(token: &Token) -> Result<Vec<u8>> {
    let mut inner = Token::new(token.token_type, TokenSigType::Unsigned, TokenFormat::JsonCompressed);
    inner.data = token.data.clone();
    inner.embedded = token.embedded.clone();
    Ok(inner.encode_unchecked()?.into_bytes())
}

/// Encode a legacy-signed token: `<token>.<base64(signature)>`.
pub(crate) fn encode_signed(token: &mut Token) -> Result<String> {
    if token.sig_type != TokenSigType::ES256K {
        return Err(Error::invalid("legacy.encode", "legacy-signed tokens require an ES256K signature")
            .with("sig_type", token.sig_type));
    }
    token.ensure_token_bytes()?;
    let inner = std::str::from_utf8(&token.token_bytes)
        .map_err(|e| Error::invalid("legacy.encode", "invalid signed token string").cause(e))?;
    Ok(format!("{inner}.{}", STANDARD.encode(token.signature.sig_bytes())))
}

/// Decode a legacy-signed token string.
pub(crate) fn decode_signed(s: &str) -> Result<Token> {
    const OP: &str = "legacy.decode_signed";
    let (inner, sig) = s
        .split_once('.')
        .ok_or_else(|| Error::invalid(OP, "missing signature separator"))?;
    let prefix = split_prefix(inner).ok_or_else(|| Error::invalid(OP, "invalid token prefix"))?;
    if prefix.1 != TokenSigType::Unsigned {
        return Err(Error::invalid(OP, "signed token must wrap an unsigned token").with("sig_type", prefix.1));
    }
    let body = bs58::decode(&inner[TOKEN_PREFIX_LEN..])
        .into_vec()
        .map_err(|e| Error::invalid(OP, "invalid base58 body").cause(e))?;

    let mut token = Token::decode_raw(prefix, &body)?;
    token.sig_type = TokenSigType::ES256K;
    token.format = TokenFormat::LegacySigned;
    token.token_bytes = inner.as_bytes().to_vec();
    token.signature = decode_signature(sig)?;
    Ok(token)
}
