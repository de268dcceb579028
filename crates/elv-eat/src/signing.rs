//! Signing tokens and verifying their signatures.
//!
//! ES256K signatures cover the Keccak-256 hash of the token bytes and EIP-191 personal
//! signatures cover [`hash_eip191_personal`] of them. The signer address is recovered
//! from the signature.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use elv_core::eth::{hash_eip191_personal, keccak256};
use elv_core::{Address, Error, Id, KeyPair, Result, Sig};

use crate::sigtypes::TokenSigType;
use crate::token::Token;
use crate::types::TokenType;

/// Hash of `bytes` signed for `sig_type`.
fn signing_hash(sig_type: TokenSigType, bytes: &[u8]) -> Result<[u8; 32]> {
    match sig_type {
        TokenSigType::ES256K => Ok(keccak256(bytes)),
        TokenSigType::EIP191Personal => Ok(hash_eip191_personal(bytes)),
        TokenSigType::EIP712TypedData => Err(Error::invalid("token.sign", "signature type not implemented")
            .with("sig_type", sig_type)),
        TokenSigType::Unknown | TokenSigType::Unsigned => {
            Err(Error::invalid("token.sign", "token is not signed").with("sig_type", sig_type))
        }
    }
}

impl Token {
    /// Sign with an ES256K signature.
    pub fn sign_with(&mut self, key: &KeyPair) -> Result<()> {
        self.sign(key, TokenSigType::ES256K)
    }

    /// Sign with an EIP-191 personal signature.
    pub fn sign_eip191_personal(&mut self, key: &KeyPair) -> Result<()> {
        self.sign(key, TokenSigType::EIP191Personal)
    }

    /// Sign the token, replacing any previous signature.
    ///
    /// Sets the token's address to the key's address and clears the cached encoding.
    pub fn sign(&mut self, key: &KeyPair, sig_type: TokenSigType) -> Result<()> {
        let code = sig_type.sig_code().ok_or_else(|| {
            let reason = match sig_type {
                TokenSigType::EIP712TypedData => "signature type not implemented",
                _ => "not a signing signature type",
            };
            Error::invalid("token.sign", reason).with("sig_type", sig_type)
        })?;
        if self.format.is_legacy() && sig_type != TokenSigType::ES256K {
            return Err(Error::invalid("token.sign", "legacy tokens only support ES256K")
                .with("format", self.format)
                .with("sig_type", sig_type));
        }

        let address = key.address();
        self.clear_caches();
        self.signature = Sig::default();
        self.sig_type = sig_type;
        self.data.eth_addr = Some(address);

        let bytes = self.encode_bytes()?;
        let hash = signing_hash(sig_type, &bytes)?;
        self.signature = key.sign_hash(&hash, code)?;
        self.token_bytes = bytes;
        self.signer = Some(address);

        debug!(
            token_type = %self.token_type,
            sig_type = %sig_type,
            signer = %address,
            "Signed token"
        );
        Ok(())
    }

    /// Address recovered from the signature.
    pub fn signer_address(&mut self) -> Result<Address> {
        if let Some(signer) = self.signer {
            return Ok(signer);
        }
        if !self.sig_type.is_signed() || self.signature.is_nil() {
            return Err(Error::invalid("token.signer_address", "token is not signed")
                .with("sig_type", self.sig_type));
        }
        self.ensure_token_bytes()?;
        let hash = signing_hash(self.sig_type, &self.token_bytes)?;
        let signer = self.signature.signer_address_from_hash(&hash)?;
        self.signer = Some(signer);
        Ok(signer)
    }

    /// Verify the signature against the token's own address.
    ///
    /// A token without address adopts the recovered one. Unsigned tokens pass.
    pub fn verify_signature(&mut self) -> Result<()> {
        if !self.sig_type.is_signed() {
            return Ok(());
        }
        let recovered = self.signer_address()?;
        match self.data.eth_addr {
            Some(declared) if declared != recovered => {
                warn!(
                    token_type = %self.token_type,
                    declared = %declared,
                    recovered = %recovered,
                    "Token signer does not match its address"
                );
                Err(Error::permission("token.verify_signature", "signer address mismatch")
                    .with("declared", declared)
                    .with("recovered", recovered))
            }
            Some(_) => Ok(()),
            None => {
                // the data keeps its original bytes, only the claim is filled in
                self.data.eth_addr = Some(recovered);
                Ok(())
            }
        }
    }

    /// Verify that the token was signed by `expected`.
    pub fn verify_signature_from(&mut self, expected: &Address) -> Result<()> {
        let recovered = self.signer_address()?;
        if recovered != *expected {
            warn!(
                token_type = %self.token_type,
                expected = %expected,
                recovered = %recovered,
                "Token not signed by the expected signer"
            );
            return Err(Error::permission("token.verify_signature", "unexpected signer")
                .with("expected", expected)
                .with("recovered", recovered));
        }
        Ok(())
    }

    /// Verify the token.
    ///
    /// State-channel and editor-signed tokens must be signed by the address `trusted`
    /// returns for their content ID, must not be expired and, when `max_validity` is
    /// given, must be used within `[iat - time_skew, iat + max_validity]`. Client tokens
    /// verify their embedded token that way and their own signature if signed. Other
    /// tokens verify their signature against their own address.
    pub fn verify<F>(&mut self, trusted: F, max_validity: Option<Duration>, time_skew: Duration) -> Result<()>
    where
        F: Fn(&Id) -> Result<Address>,
    {
        self.verify_at(Utc::now(), &trusted, max_validity, time_skew)
    }

    /// [`Token::verify`] at the given time.
    pub fn verify_at(
        &mut self,
        now: DateTime<Utc>,
        trusted: &dyn Fn(&Id) -> Result<Address>,
        max_validity: Option<Duration>,
        time_skew: Duration,
    ) -> Result<()> {
        let result = match self.token_type {
            TokenType::StateChannel | TokenType::EditorSigned => {
                let qid = self.data.qid.clone().ok_or_else(|| {
                    Error::invalid("token.verify", "missing content ID").with("type", self.token_type)
                })?;
                let signer = trusted(&qid)?;
                self.verify_signature_from(&signer)
                    .and_then(|_| self.check_times(now, max_validity, time_skew))
            }
            TokenType::Client => {
                let embedded = self.embedded.as_deref_mut().ok_or_else(|| {
                    Error::invalid("token.verify", "client token without embedded token")
                })?;
                embedded
                    .verify_at(now, trusted, max_validity, time_skew)
                    .and_then(|_| self.verify_signature())
            }
            _ => self.verify_signature(),
        };

        match &result {
            Ok(()) => debug!(token_type = %self.token_type, "Token verified"),
            Err(e) => warn!(token_type = %self.token_type, error = %e, "Token verification failed"),
        }
        result
    }

    fn check_times(&self, now: DateTime<Utc>, max_validity: Option<Duration>, time_skew: Duration) -> Result<()> {
        const OP: &str = "token.verify";
        if let Some(expires) = self.data.expires {
            if now >= expires {
                return Err(Error::permission(OP, "token expired").with("expires", expires));
            }
        }
        let (Some(max_validity), Some(issued_at)) = (max_validity, self.data.issued_at) else {
            return Ok(());
        };
        if now < issued_at - time_skew {
            return Err(Error::permission(OP, "token not yet valid")
                .with("issued_at", issued_at)
                .with("now", now));
        }
        if now > issued_at + max_validity {
            return Err(Error::permission(OP, "token exceeds maximum validity")
                .with("issued_at", issued_at)
                .with("max_validity", max_validity));
        }
        Ok(())
    }
}
