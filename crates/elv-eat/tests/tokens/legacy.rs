//! Interoperability with legacy token strings.

use super::common::*;
use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use chrono::Duration;
use elv_core::{Address, ErrorKind, Id, KeyPair, Result};
use elv_eat::{Grant, Token, TokenBuilder, TokenDataLegacy, TokenFormat, TokenSigType, TokenType};

fn legacy_claims(f: &Fixture) -> TokenDataLegacy {
    let now = now_seconds();
    TokenDataLegacy {
        qspace_id: f.sid.to_string(),
        qlib_id: f.lid.to_string(),
        addr: f.server.address().to_string(),
        qid: f.qid.to_string(),
        grant: "read".to_string(),
        iat: now.timestamp(),
        exp: (now + Duration::hours(1)).timestamp(),
        ..Default::default()
    }
}

/// `base64(json).base64(signature)` signed by `key`.
fn sign_legacy(claims: &TokenDataLegacy, key: &KeyPair) -> String {
    let json = claims.to_json().unwrap();
    let sig = key.sign_keccak(&json).unwrap();
    format!("{}.{}", STANDARD.encode(&json), STANDARD.encode(sig.sig_bytes()))
}

fn trusted(address: Address) -> impl Fn(&Id) -> Result<Address> {
    move |_: &Id| Ok(address)
}

// =============================================================================
// HAND-BUILT STRINGS
// =============================================================================

#[test]
fn test_decode_hand_built_state_channel() {
    let f = fixture();
    let s = sign_legacy(&legacy_claims(&f), &f.server);

    let mut token = Token::parse(&s).unwrap();
    assert_eq!(token.token_type(), TokenType::StateChannel);
    assert_eq!(token.format(), TokenFormat::Legacy);
    assert_eq!(token.sig_type(), TokenSigType::ES256K);
    assert_eq!(token.data().qid.as_ref(), Some(&f.qid));
    assert_eq!(token.data().grant, Some(Grant::Read));
    assert_eq!(token.data().eth_addr, Some(f.server.address()));

    token
        .verify(trusted(f.server.address()), None, Duration::seconds(30))
        .unwrap();
    assert_eq!(token.encode().unwrap(), s);
    assert_eq!(token.original_bearer().unwrap(), s);
}

#[test]
fn test_unpadded_url_safe_payload() {
    let f = fixture();
    let mut claims = legacy_claims(&f);
    claims.addr.clear();
    let s = URL_SAFE_NO_PAD.encode(claims.to_json().unwrap());

    let token = Token::parse(&s).unwrap();
    assert_eq!(token.token_type(), TokenType::Anonymous);
    assert_eq!(token.sig_type(), TokenSigType::Unsigned);
    assert_eq!(token.data().sid.as_ref(), Some(&f.sid));
}

#[test]
fn test_one_time_password_wrapper() {
    let f = fixture();
    let inner = sign_legacy(&legacy_claims(&f), &f.server);
    let other = Id::generate(elv_core::Code::Q);
    let wrapper = serde_json::json!({"tok": inner, "qid": other.to_string()});
    let s = STANDARD.encode(serde_json::to_vec(&wrapper).unwrap());

    let mut token = Token::parse(&s).unwrap();
    assert_eq!(token.token_type(), TokenType::StateChannel);
    assert_eq!(token.data().qid.as_ref(), Some(&other));
    // the signature still covers the wrapped claims
    token.verify_signature_from(&f.server.address()).unwrap();
}

#[test]
fn test_legacy_tx_token() {
    let f = fixture();
    let mut claims = legacy_claims(&f);
    claims.qid.clear();
    claims.tx_id = format!("0x{}", "ab".repeat(32));
    claims.tx_required = true;

    let token = Token::parse(&sign_legacy(&claims, &f.server)).unwrap();
    assert_eq!(token.token_type(), TokenType::Tx);
    assert!(token.data().eth_tx_hash.is_some());
}

// =============================================================================
// ENCODING
// =============================================================================

#[test]
fn test_encode_legacy_state_channel() {
    let f = fixture();
    let mut token = legacy_state_channel(&f);
    let s = token.encode().unwrap();
    assert!(s.starts_with("eyJ"));
    assert!(s.contains('.'));

    let mut parsed = Token::parse(&s).unwrap();
    assert_eq!(parsed.token_type(), TokenType::StateChannel);
    assert_eq!(parsed.data(), token.data());
    parsed
        .verify(trusted(f.server.address()), None, Duration::seconds(30))
        .unwrap();
}

#[test]
fn test_legacy_client_token() {
    let f = fixture();
    let sc = legacy_state_channel(&f);
    let mut client = TokenBuilder::new_client_token(sc.clone())
        .with_format(TokenFormat::Legacy)
        .must_token();
    let s = client.encode().unwrap();
    assert!(!s.contains('.'));

    let json = STANDARD.decode(&s).unwrap();
    let claims = TokenDataLegacy::from_json(&json).unwrap();
    assert!(claims.is_elv_client_token());
    assert_eq!(claims.auth_sig, sc.signature().to_string());

    let mut parsed = Token::parse(&s).unwrap();
    assert_eq!(parsed.token_type(), TokenType::Client);
    assert_eq!(parsed.sig_type(), TokenSigType::Unsigned);
    assert_eq!(parsed.embedded().unwrap().data(), sc.data());
    parsed
        .verify(trusted(f.server.address()), None, Duration::seconds(30))
        .unwrap();
}

#[test]
fn test_legacy_editor_signed() {
    let f = fixture();
    let sc = legacy_state_channel(&f);
    let s = TokenBuilder::new_client_token(sc)
        .with_format(TokenFormat::Legacy)
        .sign(&f.server)
        .encode()
        .unwrap();

    let mut parsed = Token::parse(&s).unwrap();
    assert_eq!(parsed.token_type(), TokenType::EditorSigned);
    assert!(parsed.embedded().is_none());
    assert_eq!(parsed.signer_address().unwrap(), f.server.address());
    assert_eq!(parsed.data().qid.as_ref(), Some(&f.qid));
}

#[test]
fn test_legacy_client_signed_by_client() {
    let f = fixture();
    let sc = legacy_state_channel(&f);
    let s = TokenBuilder::new_client_token(sc)
        .with_format(TokenFormat::Legacy)
        .sign(&f.client)
        .encode()
        .unwrap();

    let mut parsed = Token::parse(&s).unwrap();
    assert_eq!(parsed.token_type(), TokenType::Client);
    assert_eq!(parsed.signer_address().unwrap(), f.client.address());
    let mut embedded = parsed.embedded().unwrap().clone();
    embedded.verify_signature_from(&f.server.address()).unwrap();
}

#[test]
fn test_legacy_rejects_eip191() {
    let f = fixture();
    let err = TokenBuilder::new_plain(&f.sid, &f.lid)
        .with_format(TokenFormat::Legacy)
        .sign_eip191_personal(&f.server)
        .token()
        .unwrap_err();
    assert!(err.is(ErrorKind::Invalid));
}

#[test]
fn test_legacy_client_requires_legacy_embedded() {
    let f = fixture();
    let sc = state_channel(&f, TokenFormat::Json);
    let err = TokenBuilder::new_client_token(sc)
        .with_format(TokenFormat::Legacy)
        .encode()
        .unwrap_err();
    assert!(err.is(ErrorKind::Invalid));
}
