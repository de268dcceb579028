//! Signing, signer recovery and verification.

use super::common::*;
use chrono::Duration;
use elv_core::{Address, Error, ErrorKind, Id, KeyPair, Result};
use elv_eat::{Token, TokenBuilder, TokenFormat, TokenSigType, TOKEN_PREFIX_LEN};

fn trust(address: Address) -> impl Fn(&Id) -> Result<Address> {
    move |_: &Id| Ok(address)
}

// =============================================================================
// SIGNER RECOVERY
// =============================================================================

#[test]
fn test_signer_is_recovered() {
    let f = fixture();
    let s = state_channel(&f, TokenFormat::JsonCompressed).encode().unwrap();
    let mut parsed = Token::parse(&s).unwrap();
    assert_eq!(parsed.signer_address().unwrap(), f.server.address());
    parsed.verify_signature().unwrap();
}

#[test]
fn test_eip191_prefix_and_recovery() {
    let f = fixture();
    let mut token = TokenBuilder::new_client_confirmation(&f.sid, &f.lid)
        .sign_eip191_personal(&f.client)
        .must_token();
    let s = token.encode().unwrap();
    assert!(s.starts_with("accpjc"));

    let mut parsed = Token::parse(&s).unwrap();
    assert_eq!(parsed.sig_type(), TokenSigType::EIP191Personal);
    parsed.verify_signature_from(&f.client.address()).unwrap();
}

#[test]
fn test_tampered_claims_fail_verification() {
    let f = fixture();
    let s = state_channel(&f, TokenFormat::Json).encode().unwrap();
    let body = bs58::decode(&s[TOKEN_PREFIX_LEN..]).into_vec().unwrap();

    let original = b"iusr2Fm8";
    let at = body
        .windows(original.len())
        .position(|w| w == original)
        .unwrap();
    let mut tampered = body.clone();
    tampered[at..at + original.len()].copy_from_slice(b"iusrEvil");
    let forged = format!("{}{}", &s[..TOKEN_PREFIX_LEN], bs58::encode(tampered).into_string());

    let mut parsed = Token::parse(&forged).unwrap();
    assert_eq!(parsed.data().subject, "iusrEvil");
    let err = parsed.verify_signature_from(&f.server.address()).unwrap_err();
    assert!(err.is(ErrorKind::Permission));
    let err = parsed.verify_signature().unwrap_err();
    assert!(err.is(ErrorKind::Permission));
}

#[test]
fn test_unsigned_token_has_no_signer() {
    let f = fixture();
    let mut token = TokenBuilder::new_anonymous(&f.sid, &f.lid).must_token();
    token.verify_signature().unwrap();
    assert!(token.signer_address().unwrap_err().is(ErrorKind::Invalid));
}

#[test]
fn test_eip712_not_implemented() {
    let f = fixture();
    let mut token = Token::new(
        elv_eat::TokenType::Plain,
        TokenSigType::Unsigned,
        TokenFormat::Json,
    );
    token.data_mut().sid = Some(f.sid.clone());
    let err = token.sign(&f.server, TokenSigType::EIP712TypedData).unwrap_err();
    assert_eq!(err.reason(), "signature type not implemented");
}

// =============================================================================
// TRUSTED SIGNERS
// =============================================================================

#[test]
fn test_verify_state_channel() {
    let f = fixture();
    let s = state_channel(&f, TokenFormat::Cbor).encode().unwrap();
    let mut parsed = Token::parse(&s).unwrap();
    parsed
        .verify(trust(f.server.address()), None, Duration::seconds(30))
        .unwrap();

    let err = parsed
        .verify(trust(f.client.address()), None, Duration::seconds(30))
        .unwrap_err();
    assert!(err.is(ErrorKind::Permission));
    assert_eq!(err.reason(), "unexpected signer");
}

#[test]
fn test_trusted_lookup_receives_content_id() {
    let f = fixture();
    let qid = f.qid.clone();
    let server = f.server.address();
    let lookup = move |id: &Id| -> Result<Address> {
        if *id == qid {
            Ok(server)
        } else {
            Err(Error::permission("test", "unknown content"))
        }
    };
    let mut token = state_channel(&f, TokenFormat::JsonCompressed);
    token.verify(lookup, None, Duration::zero()).unwrap();
}

#[test]
fn test_verify_client_token() {
    let f = fixture();
    let sc = state_channel(&f, TokenFormat::JsonCompressed);
    let s = TokenBuilder::new_client_token(sc).sign(&f.client).encode().unwrap();

    let mut parsed = Token::parse(&s).unwrap();
    parsed
        .verify(trust(f.server.address()), Some(Duration::hours(24)), Duration::seconds(30))
        .unwrap();
    assert_eq!(parsed.signer_address().unwrap(), f.client.address());

    let other = KeyPair::generate().unwrap();
    let err = parsed
        .verify(trust(other.address()), None, Duration::seconds(30))
        .unwrap_err();
    assert!(err.is(ErrorKind::Permission));
}

// =============================================================================
// TIME WINDOWS
// =============================================================================

fn state_channel_between(f: &Fixture, before: Duration, after: Duration) -> Token {
    let (iat, exp) = window(before, after);
    TokenBuilder::new_state_channel(&f.sid, &f.lid, &f.qid, "iusr2Fm8")
        .with_issued_at(iat)
        .with_expires(exp)
        .sign(&f.server)
        .must_token()
}

#[test]
fn test_expired_token() {
    let f = fixture();
    let mut token = state_channel_between(&f, Duration::hours(2), -Duration::hours(1));
    let err = token
        .verify(trust(f.server.address()), None, Duration::seconds(30))
        .unwrap_err();
    assert!(err.is(ErrorKind::Permission));
    assert_eq!(err.reason(), "token expired");
}

#[test]
fn test_not_yet_valid() {
    let f = fixture();
    let mut token = state_channel_between(&f, -Duration::hours(1), Duration::hours(2));
    let err = token
        .verify(trust(f.server.address()), Some(Duration::hours(24)), Duration::seconds(30))
        .unwrap_err();
    assert_eq!(err.reason(), "token not yet valid");

    // within the tolerated skew
    let mut token = state_channel_between(&f, -Duration::seconds(10), Duration::hours(1));
    token
        .verify(trust(f.server.address()), Some(Duration::hours(24)), Duration::seconds(30))
        .unwrap();
}

#[test]
fn test_exceeds_max_validity() {
    let f = fixture();
    let mut token = state_channel_between(&f, Duration::hours(3), Duration::hours(1));
    token
        .verify(trust(f.server.address()), None, Duration::seconds(30))
        .unwrap();
    let err = token
        .verify(trust(f.server.address()), Some(Duration::hours(1)), Duration::seconds(30))
        .unwrap_err();
    assert_eq!(err.reason(), "token exceeds maximum validity");
}

#[test]
fn test_verify_at_fixed_time() {
    let f = fixture();
    let mut token = state_channel(&f, TokenFormat::Json);
    let iat = token.data().issued_at.unwrap();
    let trusted = trust(f.server.address());

    token
        .verify_at(iat + Duration::minutes(59), &trusted, None, Duration::zero())
        .unwrap();
    let err = token
        .verify_at(iat + Duration::hours(1), &trusted, None, Duration::zero())
        .unwrap_err();
    assert_eq!(err.reason(), "token expired");
}
