//! Token types.
//!
//! The type is the first three characters of every token string. Each type fixes which
//! claims the token must and must not carry, see [`crate::Token::validate`].

use std::fmt;

use serde::{Serialize, Serializer};

use elv_core::{Error, Result};

/// Width of the type segment of a token prefix.
pub const TYPE_PREFIX_LEN: usize = 3;

/// Kind of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TokenType {
    #[default]
    Unknown,
    /// Unsigned token granting public access.
    Anonymous,
    /// Token bound to a blockchain transaction.
    Tx,
    /// Token issued by a trusted authority for one content object.
    StateChannel,
    /// Client token wrapping an embedded state-channel token.
    Client,
    /// Signed token without further claims.
    Plain,
    /// State-channel token self-signed by a content editor.
    EditorSigned,
    /// Token issued by a fabric node for a content part.
    Node,
    /// Token embedded in a signed link.
    SignedLink,
    /// Token self-signed by a client.
    ClientSigned,
    /// Short-lived confirmation signed by a client.
    ClientConfirmation,
}

#[derive(Clone, Copy)]
struct TypeInfo {
    token_type: TokenType,
    prefix: &'static str,
    name: &'static str,
    sig_required: bool,
    confirmation_required: bool,
}

const fn info(
    token_type: TokenType,
    prefix: &'static str,
    name: &'static str,
    sig_required: bool,
    confirmation_required: bool,
) -> TypeInfo {
    TypeInfo {
        token_type,
        prefix,
        name,
        sig_required,
        confirmation_required,
    }
}

const TYPES: [TypeInfo; 11] = [
    info(TokenType::Unknown, "aun", "unknown", false, false),
    info(TokenType::Anonymous, "aan", "anonymous", false, false),
    info(TokenType::Tx, "atx", "tx", true, false),
    info(TokenType::StateChannel, "asc", "state-channel", true, false),
    info(TokenType::Client, "acl", "client", false, true),
    info(TokenType::Plain, "apl", "plain", true, false),
    info(TokenType::EditorSigned, "aes", "editor-signed", true, false),
    info(TokenType::Node, "ano", "node", true, false),
    info(TokenType::SignedLink, "asl", "signed-link", true, false),
    info(TokenType::ClientSigned, "acs", "client-signed", true, true),
    info(TokenType::ClientConfirmation, "acc", "client-confirmation", true, false),
];

// Every entry sits at its discriminant and has a full-width prefix.
const _: () = {
    let mut i = 0;
    while i < TYPES.len() {
        assert!(TYPES[i].token_type as usize == i);
        assert!(TYPES[i].prefix.len() == TYPE_PREFIX_LEN);
        i += 1;
    }
};

impl TokenType {
    /// Every known type, `Unknown` first.
    pub const ALL: [TokenType; 11] = [
        TokenType::Unknown,
        TokenType::Anonymous,
        TokenType::Tx,
        TokenType::StateChannel,
        TokenType::Client,
        TokenType::Plain,
        TokenType::EditorSigned,
        TokenType::Node,
        TokenType::SignedLink,
        TokenType::ClientSigned,
        TokenType::ClientConfirmation,
    ];

    fn info(self) -> TypeInfo {
        TYPES[self as usize]
    }

    /// Three character prefix.
    pub fn prefix(self) -> &'static str {
        self.info().prefix
    }

    /// Human readable name.
    pub fn name(self) -> &'static str {
        self.info().name
    }

    /// Whether tokens of this type must be signed.
    pub fn signature_required(self) -> bool {
        self.info().sig_required
    }

    /// Whether a server may demand a client confirmation alongside tokens of this type.
    pub fn confirmation_required(self) -> bool {
        self.info().confirmation_required
    }

    /// Type for a three character prefix. `Unknown` is never returned.
    pub fn from_prefix(prefix: &str) -> Option<TokenType> {
        TYPES
            .iter()
            .skip(1)
            .find(|t| t.prefix == prefix)
            .map(|t| t.token_type)
    }

    /// Type for a name.
    pub fn from_name(name: &str) -> Option<TokenType> {
        TYPES.iter().find(|t| t.name == name).map(|t| t.token_type)
    }

    /// Fails for `Unknown`.
    pub fn validate(self) -> Result<()> {
        if self == TokenType::Unknown {
            return Err(Error::invalid("token.validate", "unknown token type"));
        }
        Ok(())
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for TokenType {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.name())
    }
}
