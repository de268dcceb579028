//! # elv-core
//!
//! Value types shared by the content fabric token crates.
//!
//! This crate provides:
//! - Typed, prefix-tagged identifiers ([`Id`]) including composed tenant identifiers
//! - Content hashes ([`Hash`])
//! - Ethereum-style addresses, Keccak-256 and EIP-191 personal-sign hashing
//! - Signature containers ([`Sig`]) with signer address recovery
//! - secp256k1 keypairs ([`KeyPair`])
//! - The shared [`Error`] type and YAML configuration ([`TokenConfig`])
//!
//! ## String Forms
//!
//! | Value | Prefix | Example |
//! |-------|--------|---------|
//! | Space ID | `ispc` | `ispc2RUoqE...` |
//! | Library ID | `ilib` | `ilib3vNp...` |
//! | Content ID | `iq__` | `iq__4Hs9...` |
//! | Part hash | `hqp_` | `hqp_QmT2...` |
//! | Signature | `ES256K_` | `ES256K_7Ybw...` |
//! | Address | `0x` | `0x8fd3...7a03` |

pub mod config;
pub mod errors;
pub mod eth;
pub mod hash;
pub mod id;
pub mod keys;
pub mod serialization;
pub mod sign;
pub mod varint;

pub use config::{ConfigError, TokenConfig};
pub use errors::{Error, ErrorKind, Result};
pub use eth::{Address, TxHash};
pub use hash::{Hash, HashCode};
pub use id::{Code, Id};
pub use keys::KeyPair;
pub use serialization::SerializationFormat;
pub use sign::{Sig, SigCode};
