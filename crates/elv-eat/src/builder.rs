//! Builders for each token type.
//!
//! A builder starts from the mandatory claims of its token type and sensible defaults
//! (JSON compressed format, `read` grant, valid for one hour from now). The first
//! failing step is kept and returned by [`TokenBuilder::token`] or
//! [`TokenBuilder::encode`]; later steps are skipped.
//!
//! ```no_run
//! use elv_core::{Code, Id, KeyPair};
//! use elv_eat::TokenBuilder;
//!
//! let server = KeyPair::generate()?;
//! let sid = Id::generate(Code::QSpace);
//! let lid = Id::generate(Code::QLib);
//! let qid = Id::generate(Code::Q);
//!
//! let token = TokenBuilder::new_state_channel(&sid, &lid, &qid, "iusr2Fm8")
//!     .with_ctx("usr", "someone@example.com")
//!     .sign(&server)
//!     .encode()?;
//! # Ok::<(), elv_core::Error>(())
//! ```

use chrono::{DateTime, Duration, Utc};
use serde_json::{Map, Value};

use elv_core::{Address, Code, Error, Hash, Id, KeyPair, Result, TokenConfig, TxHash};

use crate::data::{now_millis, truncate_millis, Grant, TokenData};
use crate::formats::TokenFormat;
use crate::merge::deep_merge;
use crate::sigtypes::TokenSigType;
use crate::token::Token;
use crate::types::TokenType;

/// Validity of newly built tokens.
pub fn default_validity() -> Duration {
    Duration::hours(1)
}

/// Validity of newly built client confirmations.
pub fn confirmation_validity() -> Duration {
    Duration::minutes(5)
}

/// Builder of a [`Token`].
#[derive(Debug)]
pub struct TokenBuilder {
    token: Token,
    err: Option<Error>,
}

impl TokenBuilder {
    fn new(token_type: TokenType, sid: &Id, lid: &Id) -> Self {
        let token = Token::new(token_type, TokenSigType::Unsigned, TokenFormat::JsonCompressed);
        Self { token, err: None }
            .update(|d| {
                d.sid = Some(checked_id(sid, &[Code::QSpace], "sid")?);
                if !lid.is_nil() {
                    d.lid = Some(checked_id(lid, &[Code::QLib, Code::TLib], "lid")?);
                }
                Ok(())
            })
    }

    fn timed(self, validity: Duration) -> Self {
        let now = now_millis();
        self.update(|d| {
            d.issued_at = Some(now);
            d.expires = Some(now + validity);
            Ok(())
        })
    }

    /// State-channel token for `qid`, issued to `subject`.
    pub fn new_state_channel(sid: &Id, lid: &Id, qid: &Id, subject: &str) -> Self {
        Self::new(TokenType::StateChannel, sid, lid)
            .with_content_id(qid)
            .with_subject(subject)
            .with_grant(Grant::Read)
            .timed(default_validity())
    }

    /// Token bound to a blockchain transaction.
    pub fn new_tx(sid: &Id, lid: &Id, tx_hash: TxHash) -> Self {
        Self::new(TokenType::Tx, sid, lid).update(|d| {
            d.eth_tx_hash = Some(tx_hash);
            Ok(())
        })
    }

    pub fn new_plain(sid: &Id, lid: &Id) -> Self {
        Self::new(TokenType::Plain, sid, lid)
    }

    pub fn new_anonymous(sid: &Id, lid: &Id) -> Self {
        Self::new(TokenType::Anonymous, sid, lid)
    }

    /// State-channel token for `qid` signed by an editor of the content. The subject
    /// defaults to the signer.
    pub fn new_editor_signed(sid: &Id, lid: &Id, qid: &Id) -> Self {
        Self::new(TokenType::EditorSigned, sid, lid)
            .with_content_id(qid)
            .with_grant(Grant::Read)
            .timed(default_validity())
    }

    /// Node token for a content part.
    pub fn new_node_token(sid: &Id, lid: &Id, part_hash: Hash) -> Self {
        Self::new(TokenType::Node, sid, lid).update(|d| {
            if part_hash.is_nil() {
                return Err(Error::invalid("builder.node", "missing part hash"));
            }
            d.qp_hash = Some(part_hash);
            Ok(())
        })
    }

    /// Token of a signed link from content `src` to `link` (a path in content `qid`).
    pub fn new_signed_link(sid: &Id, lid: &Id, qid: &Id, src: &Id, link: &str) -> Self {
        let mut elv = Map::new();
        elv.insert("lnk".to_string(), Value::String(link.to_string()));
        elv.insert("src".to_string(), Value::String(src.to_string()));
        let mut ctx = Map::new();
        ctx.insert("elv".to_string(), Value::Object(elv));

        Self::new(TokenType::SignedLink, sid, lid)
            .with_content_id(qid)
            .with_grant(Grant::Read)
            .with_context(ctx)
            .timed(default_validity())
    }

    /// Token self-signed by a client. The subject defaults to the signer.
    pub fn new_client_signed(sid: &Id, lid: &Id) -> Self {
        Self::new(TokenType::ClientSigned, sid, lid)
            .with_grant(Grant::Read)
            .timed(default_validity())
    }

    /// Short-lived confirmation signed by a client.
    pub fn new_client_confirmation(sid: &Id, lid: &Id) -> Self {
        Self::new(TokenType::ClientConfirmation, sid, lid).timed(confirmation_validity())
    }

    /// Client token wrapping a signed state-channel or editor-signed token.
    pub fn new_client_token(embedded: Token) -> Self {
        let mut builder = Self::new(
            TokenType::Client,
            embedded.data().sid.as_ref().unwrap_or(&Id::default()),
            embedded.data().lid.as_ref().unwrap_or(&Id::default()),
        );
        builder.token.set_embedded(embedded);
        builder
    }

    /// Apply `f` to the claims unless an earlier step failed.
    fn update(mut self, f: impl FnOnce(&mut TokenData) -> Result<()>) -> Self {
        if self.err.is_none() {
            if let Err(e) = f(self.token.data_mut()) {
                self.err = Some(e);
            }
        }
        self
    }

    /// Use the format and validity configured in `config`.
    pub fn with_config(mut self, config: &TokenConfig) -> Self {
        if self.err.is_some() {
            return self;
        }
        let serialization = match config.format {
            elv_core::SerializationFormat::Unknown => elv_core::SerializationFormat::Json,
            other => other,
        };
        let validity = match config.validity() {
            Ok(validity) => validity,
            Err(e) => {
                self.err = Some(Error::invalid("builder.config", "invalid validity").cause(e));
                return self;
            }
        };
        self = self.with_validity(validity);
        match TokenFormat::from_serialization(serialization, config.compress) {
            Ok(format) => self.with_format(format),
            Err(e) => {
                self.err = Some(e);
                self
            }
        }
    }

    pub fn with_format(mut self, format: TokenFormat) -> Self {
        if self.err.is_none() {
            self.token.set_format(format);
        }
        self
    }

    pub fn with_content_id(self, qid: &Id) -> Self {
        self.update(|d| {
            d.qid = Some(checked_id(qid, &[Code::Q, Code::TQ], "qid")?);
            Ok(())
        })
    }

    pub fn with_subject(self, subject: impl Into<String>) -> Self {
        let subject = subject.into();
        self.update(|d| {
            d.subject = subject;
            Ok(())
        })
    }

    pub fn with_grant(self, grant: Grant) -> Self {
        self.update(|d| {
            d.grant = Some(grant);
            Ok(())
        })
    }

    pub fn with_address(self, address: Address) -> Self {
        self.update(|d| {
            d.eth_addr = Some(address);
            Ok(())
        })
    }

    pub fn with_afgh_public_key(self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.update(|d| {
            d.afgh_pk = key;
            Ok(())
        })
    }

    pub fn with_issued_at(self, issued_at: DateTime<Utc>) -> Self {
        self.update(|d| {
            d.issued_at = Some(truncate_millis(issued_at));
            Ok(())
        })
    }

    pub fn with_expires(self, expires: DateTime<Utc>) -> Self {
        self.update(|d| {
            d.expires = Some(truncate_millis(expires));
            Ok(())
        })
    }

    /// Expire `validity` after issued-at, setting issued-at to now if unset.
    pub fn with_validity(self, validity: Duration) -> Self {
        self.update(|d| {
            if validity <= Duration::zero() {
                return Err(Error::invalid("builder.validity", "validity must be positive")
                    .with("validity", validity));
            }
            let issued_at = *d.issued_at.get_or_insert_with(now_millis);
            d.expires = Some(issued_at + validity);
            Ok(())
        })
    }

    /// Set a single context entry.
    pub fn with_ctx(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let (key, value) = (key.into(), value.into());
        self.update(|d| {
            let mut entry = Map::new();
            entry.insert(key, value);
            deep_merge(&mut d.ctx, entry);
            Ok(())
        })
    }

    /// Deep-merge `ctx` into the context.
    pub fn with_context(self, ctx: Map<String, Value>) -> Self {
        self.update(|d| {
            deep_merge(&mut d.ctx, ctx);
            Ok(())
        })
    }

    /// Sign with ES256K.
    pub fn sign(self, key: &KeyPair) -> Self {
        self.sign_as(key, TokenSigType::ES256K)
    }

    /// Sign with an EIP-191 personal signature.
    pub fn sign_eip191_personal(self, key: &KeyPair) -> Self {
        self.sign_as(key, TokenSigType::EIP191Personal)
    }

    fn sign_as(mut self, key: &KeyPair, sig_type: TokenSigType) -> Self {
        if self.err.is_some() {
            return self;
        }
        let derives_subject = matches!(
            self.token.token_type(),
            TokenType::EditorSigned | TokenType::ClientSigned | TokenType::SignedLink
        );
        if derives_subject && self.token.data().subject.is_empty() {
            self = self.with_subject(user_id(&key.address()).to_string());
        }
        if let Err(e) = self.token.sign(key, sig_type) {
            self.err = Some(e);
        }
        self
    }

    /// The built token, or the first error.
    pub fn token(self) -> Result<Token> {
        match self.err {
            Some(e) => Err(e),
            None => Ok(self.token),
        }
    }

    /// The built token, panicking on the first error.
    ///
    /// # Panics
    ///
    /// If any builder step failed.
    pub fn must_token(self) -> Token {
        match self.token() {
            Ok(token) => token,
            Err(e) => panic!("failed to build token: {e}"),
        }
    }

    /// Validate and encode the built token.
    pub fn encode(self) -> Result<String> {
        self.token()?.encode()
    }
}

/// User ID of an address.
pub fn user_id(address: &Address) -> Id {
    Id::new(Code::User, address.as_bytes())
}

fn checked_id(id: &Id, codes: &[Code], field: &'static str) -> Result<Id> {
    if id.is_nil() || !codes.contains(&id.code()) {
        return Err(Error::invalid("builder", "invalid id")
            .with("field", field)
            .with("id", id)
            .with("code", id.code()));
    }
    Ok(id.clone())
}
