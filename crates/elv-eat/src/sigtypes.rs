//! Signature types of tokens.

use std::fmt;

use serde::{Serialize, Serializer};

use elv_core::{Error, Result, SigCode};

/// Width of the signature type segment of a token prefix.
pub const SIG_TYPE_PREFIX_LEN: usize = 1;

/// How a token is signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TokenSigType {
    #[default]
    Unknown,
    Unsigned,
    /// ECDSA over the Keccak-256 hash of the token bytes.
    ES256K,
    /// ECDSA over the EIP-191 personal-sign hash of the token bytes.
    EIP191Personal,
    /// Reserved. Signing and verification are not supported.
    EIP712TypedData,
}

const SIG_TYPES: [(TokenSigType, &str, &str); 5] = [
    (TokenSigType::Unknown, "_", "unknown"),
    (TokenSigType::Unsigned, "u", "unsigned"),
    (TokenSigType::ES256K, "s", "ES256K"),
    (TokenSigType::EIP191Personal, "p", "EIP191Personal"),
    (TokenSigType::EIP712TypedData, "t", "EIP712TypedData"),
];

const _: () = {
    let mut i = 0;
    while i < SIG_TYPES.len() {
        assert!(SIG_TYPES[i].0 as usize == i);
        assert!(SIG_TYPES[i].1.len() == SIG_TYPE_PREFIX_LEN);
        i += 1;
    }
};

impl TokenSigType {
    /// One character prefix.
    pub fn prefix(self) -> &'static str {
        SIG_TYPES[self as usize].1
    }

    /// Human readable name.
    pub fn name(self) -> &'static str {
        SIG_TYPES[self as usize].2
    }

    /// Signature type for a one character prefix. `Unknown` is never returned.
    pub fn from_prefix(prefix: &str) -> Option<TokenSigType> {
        SIG_TYPES
            .iter()
            .skip(1)
            .find(|(_, p, _)| *p == prefix)
            .map(|(t, _, _)| *t)
    }

    /// Whether tokens of this type carry a signature.
    pub fn is_signed(self) -> bool {
        matches!(
            self,
            TokenSigType::ES256K | TokenSigType::EIP191Personal | TokenSigType::EIP712TypedData
        )
    }

    /// Code of the signatures produced for this type.
    pub fn sig_code(self) -> Option<SigCode> {
        match self {
            TokenSigType::ES256K => Some(SigCode::ES256K),
            TokenSigType::EIP191Personal => Some(SigCode::EIP191Personal),
            _ => None,
        }
    }

    /// Fails for `Unknown`.
    pub fn validate(self) -> Result<()> {
        if self == TokenSigType::Unknown {
            return Err(Error::invalid("token.validate", "unknown signature type"));
        }
        Ok(())
    }
}

impl fmt::Display for TokenSigType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for TokenSigType {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.name())
    }
}
