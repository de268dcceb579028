//! Per-type validation of tokens.
//!
//! | Type | Required | Forbidden |
//! |------|----------|-----------|
//! | state-channel, editor-signed | ES256K signature, content ID, grant, issued-at, expires, subject or context | tx hash, part hash |
//! | client | state-channel or editor-signed embedded token | tx hash, part hash, subject, grant, issued-at, expires, context |
//! | tx | ES256K signature, tx hash | part hash, content ID |
//! | plain | ES256K signature | tx hash, part hash |
//! | anonymous | | signature, tx hash, part hash, address |
//! | node | ES256K signature, part hash | tx hash |
//! | signed-link | signature, content ID, context | tx hash, part hash |
//! | client-signed | signature, subject, issued-at, expires | tx hash, part hash |
//! | client-confirmation | signature, issued-at, expires | tx hash, part hash |
//!
//! Every token needs a space ID, and expiry must not precede issued-at. Legacy
//! state-channel and editor-signed tokens need neither issued-at nor subject or context.

use elv_core::{Error, Id, Result};

use crate::formats::TokenFormat;
use crate::sigtypes::TokenSigType;
use crate::token::Token;
use crate::types::TokenType;

/// Runs checks in order and keeps the first failure.
struct TokenValidator<'a> {
    token: &'a Token,
    err: Option<Error>,
}

impl<'a> TokenValidator<'a> {
    fn new(token: &'a Token) -> Self {
        Self { token, err: None }
    }

    fn fail(&mut self, err: Error) {
        if self.err.is_none() {
            self.err = Some(
                err.with("type", self.token.token_type)
                    .with("format", self.token.format),
            );
        }
    }

    fn check(&mut self, ok: bool, reason: &'static str) -> &mut Self {
        if !ok {
            self.fail(Error::invalid("token.validate", reason));
        }
        self
    }

    fn require(&mut self, field: &'static str, present: bool) -> &mut Self {
        if !present {
            self.fail(Error::invalid("token.validate", "missing required field").with("field", field));
        }
        self
    }

    fn forbid(&mut self, field: &'static str, present: bool) -> &mut Self {
        if present {
            self.fail(Error::invalid("token.validate", "field not allowed").with("field", field));
        }
        self
    }

    fn nested(&mut self, result: Result<()>) -> &mut Self {
        if let Err(e) = result {
            self.fail(e.with("embedded", true));
        }
        self
    }

    fn finish(&mut self) -> Result<()> {
        match self.err.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

fn valid_id(id: &Option<Id>) -> bool {
    id.as_ref().is_some_and(Id::is_valid)
}

impl Token {
    /// Check the token against the rules of its type.
    pub fn validate(&self) -> Result<()> {
        self.token_type.validate()?;
        self.format.validate()?;
        self.sig_type.validate()?;

        let d = &self.data;
        let signed = self.sig_type.is_signed();
        let es256k = self.sig_type == TokenSigType::ES256K;
        let has_tx_hash = d.eth_tx_hash.as_ref().is_some_and(|h| !h.is_zero());
        let has_part_hash = d.qp_hash.as_ref().is_some_and(|h| !h.is_nil());
        let has_subject = !d.subject.is_empty();
        let has_ctx = !d.ctx.is_empty();

        let mut v = TokenValidator::new(self);
        v.check(!signed || !self.signature.is_nil(), "signature missing")
            .check(signed || self.signature.is_nil(), "signature not allowed for unsigned token")
            .check(
                self.signature.is_nil()
                    || self.sig_type.sig_code() == Some(self.signature.code()),
                "signature does not match signature type",
            )
            .check(
                !self.token_type.signature_required() || signed,
                "token type requires a signature",
            )
            .require("sid", valid_id(&d.sid));

        match self.token_type {
            TokenType::StateChannel | TokenType::EditorSigned => {
                v.check(es256k, "ES256K signature required")
                    .require("qid", valid_id(&d.qid))
                    .require("gra", d.grant.is_some())
                    .require("exp", d.expires.is_some());
                if self.format != TokenFormat::Legacy {
                    v.require("iat", d.issued_at.is_some())
                        .check(has_subject || has_ctx, "subject or context required");
                }
                v.forbid("txh", has_tx_hash).forbid("qph", has_part_hash);
            }
            TokenType::Client => {
                match self.embedded.as_deref() {
                    Some(embedded) => {
                        v.check(
                            matches!(
                                embedded.token_type,
                                TokenType::StateChannel | TokenType::EditorSigned
                            ),
                            "embedded token must be state-channel or editor-signed",
                        )
                        .nested(embedded.validate());
                    }
                    None => {
                        v.check(false, "embedded token required");
                    }
                }
                v.forbid("txh", has_tx_hash)
                    .forbid("qph", has_part_hash)
                    .forbid("sub", has_subject)
                    .forbid("gra", d.grant.is_some())
                    .forbid("iat", d.issued_at.is_some())
                    .forbid("exp", d.expires.is_some())
                    .forbid("ctx", has_ctx);
            }
            TokenType::Tx => {
                v.check(es256k, "ES256K signature required")
                    .require("txh", has_tx_hash)
                    .forbid("qph", has_part_hash)
                    .forbid("qid", d.qid.is_some());
            }
            TokenType::Plain => {
                v.check(es256k, "ES256K signature required")
                    .forbid("txh", has_tx_hash)
                    .forbid("qph", has_part_hash);
            }
            TokenType::Anonymous => {
                v.forbid("signature", signed || !self.signature.is_nil())
                    .forbid("txh", has_tx_hash)
                    .forbid("qph", has_part_hash)
                    .forbid("adr", d.eth_addr.as_ref().is_some_and(|a| !a.is_zero()));
            }
            TokenType::Node => {
                v.check(es256k, "ES256K signature required")
                    .require("qph", has_part_hash)
                    .forbid("txh", has_tx_hash);
            }
            TokenType::SignedLink => {
                v.require("qid", valid_id(&d.qid))
                    .require("ctx", has_ctx)
                    .forbid("txh", has_tx_hash)
                    .forbid("qph", has_part_hash);
            }
            TokenType::ClientSigned => {
                v.require("sub", has_subject)
                    .require("iat", d.issued_at.is_some())
                    .require("exp", d.expires.is_some())
                    .forbid("txh", has_tx_hash)
                    .forbid("qph", has_part_hash);
            }
            TokenType::ClientConfirmation => {
                v.require("iat", d.issued_at.is_some())
                    .require("exp", d.expires.is_some())
                    .forbid("txh", has_tx_hash)
                    .forbid("qph", has_part_hash);
            }
            TokenType::Unknown => {}
        }

        if self.token_type != TokenType::Client {
            v.check(self.embedded.is_none(), "embedded token not allowed");
        }
        if let (Some(iat), Some(exp)) = (d.issued_at, d.expires) {
            v.check(exp >= iat, "expires before issued-at");
        }
        v.finish()
    }
}
