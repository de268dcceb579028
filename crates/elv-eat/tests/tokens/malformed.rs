//! Corrupt and mis-prefixed token strings.

use super::common::*;
use elv_core::{varint, ErrorKind};
use elv_eat::{Token, TokenFormat, MAX_CLAIMS_LEN, TOKEN_PREFIX_LEN};
use flate2::write::DeflateEncoder;
use flate2::Compression;
use std::io::Write;

fn parse_err(s: &str) -> elv_core::Error {
    let err = Token::parse(s).unwrap_err();
    assert!(err.is(ErrorKind::Invalid), "{s}: {err}");
    err
}

#[test]
fn test_too_short() {
    for s in ["a", "acl", "aclsj"] {
        assert_eq!(parse_err(s).reason(), "token too short");
    }
}

#[test]
fn test_unknown_prefix() {
    let err = parse_err("xyzsj_3vQB7B6MrGQZaxCuFg4oh");
    assert_eq!(err.reason(), "unknown token format");
    assert_eq!(err.field("prefix"), Some("xyzsj_"));
}

#[test]
fn test_legacy_format_prefix_is_not_a_token() {
    // "l_" and "ls" are never transmitted as prefixes
    let err = parse_err("aplsl_3vQB7B6MrGQZaxCuFg4oh");
    assert_eq!(err.reason(), "unknown token format");
}

#[test]
fn test_invalid_base58() {
    assert_eq!(parse_err("aanuj_0OIl").reason(), "invalid base58 body");
}

#[test]
fn test_truncated_signature() {
    let s = format!("aplsj_{}", bs58::encode([1u8; 20]).into_string());
    assert_eq!(parse_err(&s).reason(), "token shorter than its signature");
}

#[test]
fn test_eip712_prefix() {
    let s = format!("apltj_{}", bs58::encode([1u8; 80]).into_string());
    assert_eq!(parse_err(&s).reason(), "signature type not implemented");
}

#[test]
fn test_truncated_body() {
    let f = fixture();
    for format in FORMATS {
        let s = state_channel(&f, format).encode().unwrap();
        let body = bs58::decode(&s[TOKEN_PREFIX_LEN..]).into_vec().unwrap();
        let cut = format!(
            "{}{}",
            &s[..TOKEN_PREFIX_LEN],
            bs58::encode(&body[..body.len() - 5]).into_string()
        );
        parse_err(&cut);
    }
}

#[test]
fn test_truncated_embedded_token() {
    let f = fixture();
    let sc = state_channel(&f, TokenFormat::Json);
    let s = elv_eat::TokenBuilder::new_client_token(sc).encode().unwrap();
    let body = bs58::decode(&s[TOKEN_PREFIX_LEN..]).into_vec().unwrap();
    let cut = format!(
        "{}{}",
        &s[..TOKEN_PREFIX_LEN],
        bs58::encode(&body[..body.len() / 2]).into_string()
    );
    parse_err(&cut);
}

#[test]
fn test_corrupt_compressed_claims() {
    let s = format!("aanujc{}", bs58::encode([0xffu8; 16]).into_string());
    assert_eq!(parse_err(&s).reason(), "decompression failed");
}

#[test]
fn test_client_inside_client_rejected() {
    // acluj_ | varint | acluj_ {} | {}
    let mut inner = b"acluj_".to_vec();
    inner.extend_from_slice(b"{}");
    let mut body = Vec::new();
    varint::put_prefixed(&mut body, &inner);
    body.extend_from_slice(b"{}");

    let s = format!("acluj_{}", bs58::encode(body).into_string());
    let err = parse_err(&s);
    assert_eq!(err.reason(), "embedded token must be state-channel or editor-signed");
    assert_eq!(err.field("type"), Some("client"));
}

#[test]
fn test_deeply_nested_clients_fail_fast() {
    let mut body = b"{}".to_vec();
    for _ in 0..500 {
        let mut raw = b"acluj_".to_vec();
        raw.extend_from_slice(&body);
        body.clear();
        varint::put_prefixed(&mut body, &raw);
        body.extend_from_slice(b"{}");
    }

    let s = format!("acluj_{}", bs58::encode(body).into_string());
    let err = parse_err(&s);
    assert_eq!(err.reason(), "embedded token must be state-channel or editor-signed");
}

#[test]
fn test_oversized_compressed_claims() {
    let mut claims = br#"{"apk":""#.to_vec();
    claims.extend(std::iter::repeat_n(b'a', MAX_CLAIMS_LEN));
    claims.extend_from_slice(br#""}"#);
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(&claims).unwrap();
    let compressed = encoder.finish().unwrap();
    assert!(compressed.len() < 16 * 1024);

    let s = format!("aanujc{}", bs58::encode(compressed).into_string());
    assert_eq!(parse_err(&s).reason(), "decompressed claims too large");
}

#[test]
fn test_unknown_grant() {
    let f = fixture();
    let claims = format!(r#"{{"sid":"{}","gra":"superuser"}}"#, f.sid);
    let s = format!("aanuj_{}", bs58::encode(claims).into_string());
    parse_err(&s);
}

#[test]
fn test_not_a_token() {
    for s in ["definitely not a token", "eyJub3QiOiJqc29u.AAAA", "......"] {
        parse_err(s);
    }
}
