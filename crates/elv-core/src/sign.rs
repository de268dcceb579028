//! Signature container and signer address recovery.
//!
//! A [`Sig`] is an algorithm code byte followed by the raw signature bytes. ECDSA
//! signatures are 65 bytes `r | s | v` with the recovery id `v` normalized to `{0, 1}`.

use std::fmt;
use std::str::FromStr;

use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::{Error, Result};
use crate::eth::Address;

/// Length of an ECDSA `r | s | v` signature.
pub const SIG_LEN: usize = 65;

/// Length of the string prefix of every signature.
pub const PREFIX_LEN: usize = 7;

/// Signature algorithm code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SigCode {
    Unknown = 0,
    /// secp256k1 ECDSA over a Keccak-256 hash.
    ES256K,
    /// secp256k1 ECDSA over an EIP-191 personal-sign hash.
    EIP191Personal,
}

const CODES: [(SigCode, &str); 3] = [
    (SigCode::Unknown, "UNKNOWN"),
    (SigCode::ES256K, "ES256K_"),
    (SigCode::EIP191Personal, "EIP191P"),
];

impl SigCode {
    fn from_u8(b: u8) -> Option<SigCode> {
        CODES.get(usize::from(b)).map(|(code, _)| *code)
    }

    fn from_prefix(prefix: &str) -> Option<SigCode> {
        CODES.iter().find(|(_, p)| *p == prefix).map(|(code, _)| *code)
    }

    /// String prefix of this code.
    pub fn prefix(self) -> &'static str {
        CODES[self as usize].1
    }

    /// Whether the signer's address can be recovered from signatures of this code.
    pub fn supports_recovery(self) -> bool {
        matches!(self, SigCode::ES256K | SigCode::EIP191Personal)
    }
}

impl fmt::Display for SigCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Normalize a legacy Ethereum recovery id (`27`/`28`) into `{0, 1}`.
///
/// Only applies to ECDSA codes and signatures with a recovery byte.
pub fn eth_adjust_bytes(code: SigCode, bytes: &mut [u8]) {
    if !code.supports_recovery() || bytes.len() != SIG_LEN {
        return;
    }
    if bytes[64] >= 4 {
        bytes[64] = bytes[64].wrapping_sub(27);
    }
}

/// Typed signature bytes.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Sig(Vec<u8>);

impl Sig {
    /// Create a signature from its algorithm code and raw bytes.
    pub fn new(code: SigCode, bytes: &[u8]) -> Self {
        let mut out = Vec::with_capacity(bytes.len() + 1);
        out.push(code as u8);
        out.extend_from_slice(bytes);
        eth_adjust_bytes(code, &mut out[1..]);
        Self(out)
    }

    /// Create a signature from its raw bytes (code byte included).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        match bytes.first().and_then(|b| SigCode::from_u8(*b)) {
            Some(code) if bytes.len() > 1 => Ok(Self::new(code, &bytes[1..])),
            _ => Err(Error::invalid("sig.from_bytes", "invalid signature bytes").with("len", bytes.len())),
        }
    }

    /// Parse the string form of a signature.
    pub fn parse(s: &str) -> Result<Self> {
        if s.len() <= PREFIX_LEN || !s.is_char_boundary(PREFIX_LEN) {
            return Err(Error::invalid("sig.parse", "invalid signature string").with("sig", s));
        }
        let (prefix, encoded) = s.split_at(PREFIX_LEN);
        let code = SigCode::from_prefix(prefix)
            .ok_or_else(|| Error::invalid("sig.parse", "unknown signature prefix").with("sig", s))?;
        let bytes = bs58::decode(encoded).into_vec().map_err(|e| {
            Error::invalid("sig.parse", "invalid base58 signature")
                .with("sig", s)
                .cause(e)
        })?;
        Ok(Self::new(code, &bytes))
    }

    /// Algorithm code.
    pub fn code(&self) -> SigCode {
        self.0
            .first()
            .and_then(|b| SigCode::from_u8(*b))
            .unwrap_or(SigCode::Unknown)
    }

    /// Signature bytes without the code byte.
    pub fn sig_bytes(&self) -> &[u8] {
        self.0.get(1..).unwrap_or_default()
    }

    /// Raw bytes including the code byte.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// True if no signature bytes are present.
    pub fn is_nil(&self) -> bool {
        self.0.len() <= 1
    }

    /// Recover the address of the key that produced this signature over `hash`.
    pub fn signer_address_from_hash(&self, hash: &[u8; 32]) -> Result<Address> {
        let code = self.code();
        if !code.supports_recovery() {
            return Err(Error::invalid("sig.signer_address", "signature type does not support recovery")
                .with("sig_type", code));
        }
        let bytes = self.sig_bytes();
        if bytes.len() != SIG_LEN {
            return Err(Error::invalid("sig.signer_address", "invalid signature length")
                .with("sig_type", code)
                .with("len", bytes.len()));
        }

        let mut signature = Signature::from_slice(&bytes[..64]).map_err(|e| {
            Error::permission("sig.signer_address", "invalid signature")
                .with("sig_type", code)
                .cause(e)
        })?;
        let mut recovery_id = RecoveryId::from_byte(bytes[64]).ok_or_else(|| {
            Error::permission("sig.signer_address", "invalid recovery id").with("v", bytes[64])
        })?;
        if let Some(normalized) = signature.normalize_s() {
            signature = normalized;
            recovery_id = RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced());
        }

        let key = VerifyingKey::recover_from_prehash(hash, &signature, recovery_id).map_err(|e| {
            Error::permission("sig.signer_address", "failed to recover public key")
                .with("sig_type", code)
                .cause(e)
        })?;
        Ok(Address::from_verifying_key(&key))
    }
}

impl fmt::Display for Sig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_nil() {
            return Ok(());
        }
        write!(f, "{}{}", self.code().prefix(), bs58::encode(self.sig_bytes()).into_string())
    }
}

impl fmt::Debug for Sig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Sig").field(&self.to_string()).finish()
    }
}

impl FromStr for Sig {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Sig::parse(s)
    }
}

impl Serialize for Sig {
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

impl<'de> Deserialize<'de> for Sig {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            Sig::parse(&s).map_err(serde::de::Error::custom)
        } else {
            let bytes = serde_bytes::ByteBuf::deserialize(deserializer)?;
            Sig::from_bytes(&bytes).map_err(serde::de::Error::custom)
        }
    }
}
