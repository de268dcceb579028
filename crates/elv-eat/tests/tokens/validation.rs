//! Required and forbidden claims per token type.

use super::common::*;
use chrono::Duration;
use elv_core::{Address, ErrorKind, Hash, HashCode, Id, TxHash};
use elv_eat::data::now_millis;
use elv_eat::{Token, TokenBuilder, TokenFormat, TokenSigType, TokenType};

fn assert_invalid(mut token: Token, reason: &str, field: Option<&str>) {
    let err = token.encode().unwrap_err();
    assert!(err.is(ErrorKind::Invalid), "{err}");
    assert_eq!(err.reason(), reason, "{err}");
    assert_eq!(err.field("field"), field, "{err}");
}

// =============================================================================
// SIGNATURES
// =============================================================================

#[test]
fn test_signature_required() {
    let f = fixture();
    for token_type in [
        TokenType::Tx,
        TokenType::StateChannel,
        TokenType::Plain,
        TokenType::EditorSigned,
        TokenType::Node,
        TokenType::SignedLink,
        TokenType::ClientSigned,
        TokenType::ClientConfirmation,
    ] {
        let mut token = Token::new(token_type, TokenSigType::Unsigned, TokenFormat::Json);
        token.data_mut().sid = Some(f.sid.clone());
        assert_invalid(token, "token type requires a signature", None);
    }
}

#[test]
fn test_anonymous_rejects_signature() {
    let f = fixture();
    let token = TokenBuilder::new_anonymous(&f.sid, &f.lid).sign(&f.client).must_token();
    assert_invalid(token, "field not allowed", Some("signature"));
}

#[test]
fn test_anonymous_rejects_address() {
    let f = fixture();
    let token = TokenBuilder::new_anonymous(&f.sid, &f.lid)
        .with_address(Address::new([1u8; 20]))
        .must_token();
    assert_invalid(token, "field not allowed", Some("adr"));
}

#[test]
fn test_es256k_required() {
    let f = fixture();
    let token = TokenBuilder::new_plain(&f.sid, &f.lid)
        .sign_eip191_personal(&f.server)
        .must_token();
    assert_invalid(token, "ES256K signature required", None);

    // client-signed tokens accept EIP-191
    TokenBuilder::new_client_signed(&f.sid, &f.lid)
        .sign_eip191_personal(&f.client)
        .encode()
        .unwrap();
}

// =============================================================================
// REQUIRED AND FORBIDDEN CLAIMS
// =============================================================================

#[test]
fn test_space_id_required() {
    let mut token = Token::new(TokenType::Anonymous, TokenSigType::Unsigned, TokenFormat::Json);
    token.data_mut().lid = Some(Id::generate(elv_core::Code::QLib));
    assert_invalid(token, "missing required field", Some("sid"));
}

#[test]
fn test_state_channel_requires_subject_or_context() {
    let f = fixture();
    let token = TokenBuilder::new_state_channel(&f.sid, &f.lid, &f.qid, "")
        .sign(&f.server)
        .must_token();
    assert_invalid(token, "subject or context required", None);

    TokenBuilder::new_state_channel(&f.sid, &f.lid, &f.qid, "")
        .with_ctx("usr", "someone")
        .sign(&f.server)
        .encode()
        .unwrap();
}

#[test]
fn test_tx_token_rules() {
    let f = fixture();
    let token = TokenBuilder::new_tx(&f.sid, &f.lid, TxHash::new([0u8; 32]))
        .sign(&f.server)
        .must_token();
    assert_invalid(token, "missing required field", Some("txh"));

    let token = TokenBuilder::new_tx(&f.sid, &f.lid, TxHash::new([3u8; 32]))
        .with_content_id(&f.qid)
        .sign(&f.server)
        .must_token();
    assert_invalid(token, "field not allowed", Some("qid"));
}

#[test]
fn test_part_hash_only_on_node_tokens() {
    let f = fixture();
    let part = Hash::new(HashCode::QPart, &[1, 2, 3]);
    let mut token = TokenBuilder::new_plain(&f.sid, &f.lid).must_token();
    token.data_mut().qp_hash = Some(part);
    token.sign_with(&f.server).unwrap();
    assert_invalid(token, "field not allowed", Some("qph"));
}

#[test]
fn test_signed_link_requires_context() {
    let f = fixture();
    let mut token = Token::new(TokenType::SignedLink, TokenSigType::Unsigned, TokenFormat::Json);
    let d = token.data_mut();
    d.sid = Some(f.sid.clone());
    d.qid = Some(f.qid.clone());
    token.sign_with(&f.client).unwrap();
    assert_invalid(token, "missing required field", Some("ctx"));
}

#[test]
fn test_client_signed_requires_subject() {
    let f = fixture();
    let (iat, exp) = window(Duration::zero(), Duration::hours(1));
    let mut token = Token::new(TokenType::ClientSigned, TokenSigType::Unsigned, TokenFormat::Json);
    let d = token.data_mut();
    d.sid = Some(f.sid.clone());
    d.issued_at = Some(iat);
    d.expires = Some(exp);
    token.sign_with(&f.client).unwrap();
    assert_invalid(token, "missing required field", Some("sub"));
}

#[test]
fn test_confirmation_requires_expiry() {
    let f = fixture();
    let mut token = TokenBuilder::new_client_confirmation(&f.sid, &f.lid).must_token();
    token.data_mut().expires = None;
    token.sign_with(&f.client).unwrap();
    assert_invalid(token, "missing required field", Some("exp"));
}

// =============================================================================
// EMBEDDED TOKENS
// =============================================================================

#[test]
fn test_client_requires_embedded_token() {
    let f = fixture();
    let mut token = Token::new(TokenType::Client, TokenSigType::Unsigned, TokenFormat::Json);
    token.data_mut().sid = Some(f.sid.clone());
    assert_invalid(token, "embedded token required", None);
}

#[test]
fn test_client_embeds_only_state_channels() {
    let f = fixture();
    let plain = TokenBuilder::new_plain(&f.sid, &f.lid).sign(&f.server).must_token();
    let token = TokenBuilder::new_client_token(plain).must_token();
    assert_invalid(token, "embedded token must be state-channel or editor-signed", None);
}

#[test]
fn test_client_rejects_own_claims() {
    let f = fixture();
    let sc = state_channel(&f, TokenFormat::Json);
    let token = TokenBuilder::new_client_token(sc).with_subject("me").must_token();
    assert_invalid(token, "field not allowed", Some("sub"));
}

#[test]
fn test_invalid_embedded_token() {
    let f = fixture();
    let mut sc = state_channel(&f, TokenFormat::Json);
    sc.data_mut().qid = None;
    let mut token = TokenBuilder::new_client_token(sc).must_token();
    let err = token.encode().unwrap_err();
    assert_eq!(err.field("field"), Some("qid"));
    assert_eq!(err.field("embedded"), Some("true"));
}

#[test]
fn test_embedded_only_in_client_tokens() {
    let f = fixture();
    let sc = state_channel(&f, TokenFormat::Json);
    let mut token = TokenBuilder::new_plain(&f.sid, &f.lid).must_token();
    token.set_embedded(sc);
    token.sign_with(&f.server).unwrap();
    assert_invalid(token, "embedded token not allowed", None);
}

// =============================================================================
// VALIDITY WINDOW
// =============================================================================

#[test]
fn test_expiry_not_before_issued_at() {
    let f = fixture();
    let now = now_millis();
    let token = TokenBuilder::new_state_channel(&f.sid, &f.lid, &f.qid, "iusr2Fm8")
        .with_issued_at(now)
        .with_expires(now - Duration::seconds(1))
        .sign(&f.server)
        .must_token();
    assert_invalid(token, "expires before issued-at", None);

    TokenBuilder::new_state_channel(&f.sid, &f.lid, &f.qid, "iusr2Fm8")
        .with_issued_at(now)
        .with_expires(now)
        .sign(&f.server)
        .encode()
        .unwrap();
}

#[test]
fn test_parse_validates() {
    let f = fixture();
    let claims = format!(r#"{{"lid":"{}"}}"#, f.lid);
    let s = format!("aanuj_{}", bs58::encode(claims).into_string());
    let err = Token::parse(&s).unwrap_err();
    assert_eq!(err.field("field"), Some("sid"));
    assert!(err.field("token_string").is_some());
}
