//! Claims a verified token grants.

use elv_core::{Address, Id, Result};

use crate::data::{Grant, TokenData};
use crate::token::Token;
use crate::types::TokenType;

/// Effective claims of a validated token.
///
/// Client tokens are authorized by their embedded token; the client itself is only
/// identified by [`Authorization::client_address`].
#[derive(Debug, Clone)]
pub struct Authorization {
    token: Token,
    subject: String,
    client_address: Option<Address>,
}

impl Authorization {
    pub fn new(mut token: Token) -> Result<Self> {
        token.validate()?;

        let client_address = if token.token_type() == TokenType::Client {
            match token.data().eth_addr {
                Some(address) => Some(address),
                None if token.sig_type().is_signed() => Some(token.signer_address()?),
                None => None,
            }
        } else {
            None
        };

        let subject = match token.embedded.as_deref_mut() {
            Some(embedded) => subject_of(embedded)?,
            None => subject_of(&mut token)?,
        };

        Ok(Self { token, subject, client_address })
    }

    pub fn token(&self) -> &Token {
        &self.token
    }

    /// Claims of the embedded token for client tokens, of the token itself otherwise.
    pub fn data(&self) -> &TokenData {
        match self.token.embedded() {
            Some(embedded) => embedded.data(),
            None => self.token.data(),
        }
    }

    /// Subject of the claims, or the address that signed them.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn grant(&self) -> Option<Grant> {
        self.data().grant
    }

    pub fn content_id(&self) -> Option<&Id> {
        self.data().qid.as_ref()
    }

    pub fn space_id(&self) -> Option<&Id> {
        self.data().sid.as_ref()
    }

    /// Address of the client presenting a client token.
    pub fn client_address(&self) -> Option<Address> {
        self.client_address
    }
}

fn subject_of(token: &mut Token) -> Result<String> {
    if !token.data().subject.is_empty() {
        return Ok(token.data().subject.clone());
    }
    if let Some(address) = token.data().eth_addr {
        return Ok(address.to_string());
    }
    if token.sig_type().is_signed() {
        return Ok(token.signer_address()?.to_string());
    }
    Ok(String::new())
}
