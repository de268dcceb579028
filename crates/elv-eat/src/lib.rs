//! # elv-eat
//!
//! Encoding, signing and verification of content fabric authorization tokens.
//!
//! This crate provides:
//! - The [`Token`] envelope with its type, format and signature type prefixes
//! - Claim serialization as JSON, CBOR or a compact varint encoding, optionally compressed
//! - ES256K and EIP-191 personal signatures with signer recovery
//! - Per-type validation rules and time window checks
//! - Decoding of legacy base64 tokens
//! - Builders for each token type
//!
//! ## Token String Layout
//!
//! ```text
//! <type:3><sig type:1><format:2> base58( [signature:65] payload )
//! payload = [varint(len) embedded token] claims
//! ```
//!
//! | Prefix | Token |
//! |--------|-------|
//! | `ascsj_` | ES256K signed state-channel, JSON claims |
//! | `aclujc` | unsigned client token, compressed JSON claims |
//! | `aplsc_` | ES256K signed plain token, CBOR claims |
//! | `aanub_` | unsigned anonymous token, custom claims |
//!
//! ## Client Tokens
//!
//! A client token embeds exactly one signed state-channel or editor-signed token. The
//! embedded token keeps its own prefix and signature, so verifying a client token
//! verifies the server's signature over the embedded claims and, if the client signed
//! too, the client's signature over the whole payload.

pub mod authorization;
pub mod builder;
pub mod data;
pub mod explain;
pub mod formats;
pub mod legacy;
pub mod merge;
mod signing;
pub mod sigtypes;
pub mod token;
pub mod types;
mod validator;
pub mod verifier;

pub use authorization::Authorization;
pub use builder::TokenBuilder;
pub use data::{Grant, TokenData};
pub use elv_core::SerializationFormat;
pub use explain::{EncodingDetails, describe};
pub use formats::TokenFormat;
pub use legacy::TokenDataLegacy;
pub use merge::deep_merge;
pub use sigtypes::TokenSigType;
pub use token::{MAX_CLAIMS_LEN, TOKEN_PREFIX_LEN, Token};
pub use types::TokenType;
pub use verifier::Verifier;
