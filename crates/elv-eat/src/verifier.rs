//! Configuration driven token verification.

use chrono::Duration;
use tracing::debug;

use elv_core::{Address, ConfigError, Error, Id, Result, TokenConfig};

use crate::authorization::Authorization;
use crate::token::Token;

/// Verifies tokens against the trusted signers and time limits of a [`TokenConfig`].
#[derive(Debug, Clone)]
pub struct Verifier {
    config: TokenConfig,
    max_validity: Option<Duration>,
    time_skew: Duration,
}

impl Verifier {
    pub fn new(config: TokenConfig) -> Result<Self> {
        let invalid = |e: ConfigError| Error::invalid("verifier.new", "invalid configuration").cause(e);
        let max_validity = config.max_validity().map_err(invalid)?;
        let time_skew = config.time_skew().map_err(invalid)?;
        Ok(Self { config, max_validity, time_skew })
    }

    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    /// Trusted signer of tokens for content `qid`.
    pub fn trusted_signer(&self, qid: &Id) -> Result<Address> {
        self.config
            .trusted_signer(&qid.to_string())
            .map_err(|e| Error::invalid("verifier.trusted_signer", "invalid configuration").cause(e))?
            .ok_or_else(|| Error::permission("verifier.trusted_signer", "no trusted signer").with("qid", qid))
    }

    /// Parse, validate and verify a token string.
    pub fn verify(&self, s: &str) -> Result<Token> {
        let mut token = Token::parse(s)?;
        self.verify_token(&mut token)?;
        Ok(token)
    }

    pub fn verify_token(&self, token: &mut Token) -> Result<()> {
        token.verify(|qid| self.trusted_signer(qid), self.max_validity, self.time_skew)?;
        debug!(token_type = %token.token_type(), "Token accepted");
        Ok(())
    }

    /// Verify a token string and return the claims it grants.
    pub fn authorize(&self, s: &str) -> Result<Authorization> {
        Authorization::new(self.verify(s)?)
    }
}
