//! Human readable breakdowns of encoded tokens.

use std::fmt::Write as _;

use serde::Serialize;
use serde_json::Value;

use elv_core::{Error, Result};

use crate::data::TokenData;
use crate::formats::TokenFormat;
use crate::sigtypes::TokenSigType;
use crate::token::Token;
use crate::types::TokenType;

/// Sizes of the parts of an encoded token, in bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EncodingDetails {
    pub prefix: String,
    pub signature_len: usize,
    /// Encoded embedded token, without its length prefix.
    pub embedded_len: usize,
    /// Serialized claims before compression.
    pub data_len: usize,
    /// Serialized claims after compression.
    pub compressed_len: Option<usize>,
    /// Signed payload: embedded token and claims.
    pub payload_len: usize,
    /// Length of the token string.
    pub encoded_len: usize,
}

impl Token {
    /// Encoding details, encoding the token first if needed.
    pub fn encoding_details(&mut self) -> Result<&EncodingDetails> {
        self.encode()?;
        if self.details.payload_len == 0 {
            self.details.payload_len = self.token_bytes.len();
            self.details.signature_len = self.signature.sig_bytes().len();
        }
        Ok(&self.details)
    }

    /// Describe the byte budget of the encoded token.
    pub fn explain(&mut self) -> Result<String> {
        let mut out = String::new();
        self.explain_into(&mut out, "")?;
        Ok(out)
    }

    fn explain_into(&mut self, out: &mut String, indent: &str) -> Result<()> {
        let token_type = self.token_type;
        let format = self.format;
        let sig_type = self.sig_type;
        let details = self.encoding_details()?.clone();

        // writing to a String cannot fail
        let _ = writeln!(out, "{indent}type:      {token_type}");
        let _ = writeln!(out, "{indent}format:    {format}");
        let _ = writeln!(out, "{indent}sig type:  {sig_type}");
        if format.is_legacy() {
            let _ = writeln!(out, "{indent}prefix:    none");
        } else {
            let _ = writeln!(out, "{indent}prefix:    {} ({} bytes)", details.prefix, details.prefix.len());
        }
        let _ = writeln!(out, "{indent}signature: {} bytes", details.signature_len);
        if let Some(embedded) = self.embedded.as_deref_mut() {
            let _ = writeln!(out, "{indent}embedded:  {} bytes", details.embedded_len);
            embedded.explain_into(out, &format!("{indent}  "))?;
        }
        match details.compressed_len {
            Some(compressed) => {
                let _ = writeln!(
                    out,
                    "{indent}claims:    {} bytes, {compressed} bytes compressed",
                    details.data_len
                );
            }
            None if !format.is_legacy() => {
                let _ = writeln!(out, "{indent}claims:    {} bytes", details.data_len);
            }
            None => {}
        }
        let _ = writeln!(out, "{indent}payload:   {} bytes", details.payload_len);
        let _ = writeln!(out, "{indent}total:     {} bytes", details.encoded_len);
        Ok(())
    }

    /// JSON view of the token: type, format, signature type, signature, claims and the
    /// embedded token.
    pub fn to_json(&self) -> Result<Value> {
        serde_json::to_value(TokenView::from(self))
            .map_err(|e| Error::other("token.to_json", "json encoding failed").cause(e))
    }
}

/// Parse a token string and describe it.
pub fn describe(s: &str) -> Result<String> {
    Token::parse(s)?.explain()
}

#[derive(Serialize)]
struct TokenView<'a> {
    #[serde(rename = "type")]
    token_type: TokenType,
    format: TokenFormat,
    sig_type: TokenSigType,
    #[serde(skip_serializing_if = "String::is_empty")]
    signature: String,
    data: &'a TokenData,
    #[serde(skip_serializing_if = "Option::is_none")]
    embedded: Option<Box<TokenView<'a>>>,
}

impl<'a> From<&'a Token> for TokenView<'a> {
    fn from(token: &'a Token) -> Self {
        Self {
            token_type: token.token_type,
            format: token.format,
            sig_type: token.sig_type,
            signature: token.signature.to_string(),
            data: &token.data,
            embedded: token.embedded.as_deref().map(|e| Box::new(TokenView::from(e))),
        }
    }
}
