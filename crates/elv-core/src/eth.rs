//! Ethereum-style values: addresses, transaction hashes and Keccak-256 hashing.

use std::fmt;
use std::str::FromStr;

use k256::ecdsa::VerifyingKey;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};

use crate::errors::{Error, Result};

/// Domain separation prefix of EIP-191 personal-sign token signatures.
pub const EIP191_TOKEN_PREFIX: &str = "Eluvio Content Fabric Access Token 1.0\n";

const EIP191_MESSAGE_PREFIX: &str = "\x19Ethereum Signed Message:\n";

/// Keccak-256 hash of `data`.
pub fn keccak256(data: impl AsRef<[u8]>) -> [u8; 32] {
    Keccak256::digest(data.as_ref()).into()
}

/// Personal-sign hash of a token message.
///
/// The message is prefixed with [`EIP191_TOKEN_PREFIX`] and then wrapped with the
/// standard `"\x19Ethereum Signed Message:\n" + len` envelope before hashing.
pub fn hash_eip191_personal(message: impl AsRef<[u8]>) -> [u8; 32] {
    let message = message.as_ref();
    let mut data = Vec::with_capacity(EIP191_TOKEN_PREFIX.len() + message.len());
    data.extend_from_slice(EIP191_TOKEN_PREFIX.as_bytes());
    data.extend_from_slice(message);

    let mut hasher = Keccak256::new();
    hasher.update(EIP191_MESSAGE_PREFIX.as_bytes());
    hasher.update(data.len().to_string().as_bytes());
    hasher.update(&data);
    hasher.finalize().into()
}

fn parse_hex<const N: usize>(op: &'static str, s: &str) -> Result<[u8; N]> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    let bytes = hex::decode(digits)
        .map_err(|e| Error::invalid(op, "invalid hex string").with("value", s).cause(e))?;
    bytes.as_slice().try_into().map_err(|_| {
        Error::invalid(op, "invalid length")
            .with("value", s)
            .with("expected", N)
            .with("actual", bytes.len())
    })
}

macro_rules! fixed_bytes {
    ($(#[$meta:meta])* $name:ident, $len:expr, $op:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name([u8; $len]);

        impl $name {
            /// Size in bytes.
            pub const LEN: usize = $len;

            /// Wrap raw bytes.
            pub const fn new(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            /// Create from a byte slice of exactly [`Self::LEN`] bytes.
            pub fn from_slice(bytes: &[u8]) -> Result<Self> {
                bytes.try_into().map(Self).map_err(|_| {
                    Error::invalid($op, "invalid length")
                        .with("expected", $len)
                        .with("actual", bytes.len())
                })
            }

            /// Parse a hex string, with or without `0x` prefix, in any case.
            pub fn parse(s: &str) -> Result<Self> {
                parse_hex::<$len>($op, s).map(Self)
            }

            /// Raw bytes.
            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            /// True if all bytes are zero.
            pub fn is_zero(&self) -> bool {
                self.0.iter().all(|b| *b == 0)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                Self::parse(s)
            }
        }

        impl Serialize for $name {
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

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                if deserializer.is_human_readable() {
                    let s = String::deserialize(deserializer)?;
                    Self::parse(&s).map_err(serde::de::Error::custom)
                } else {
                    let bytes = serde_bytes::ByteBuf::deserialize(deserializer)?;
                    Self::from_slice(&bytes).map_err(serde::de::Error::custom)
                }
            }
        }
    };
}

fixed_bytes!(
    /// 20-byte account address.
    Address,
    20,
    "eth.address"
);

fixed_bytes!(
    /// 32-byte blockchain transaction hash.
    TxHash,
    32,
    "eth.tx_hash"
);

impl Address {
    /// Address of a secp256k1 public key: the last 20 bytes of the Keccak-256 hash of the
    /// uncompressed point without its `0x04` tag.
    pub fn from_verifying_key(key: &VerifyingKey) -> Self {
        let point = key.to_encoded_point(false);
        let hash = keccak256(&point.as_bytes()[1..]);
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&hash[12..]);
        Self(bytes)
    }
}
