//! Encode then parse tokens in every format.

use super::common::*;
use elv_core::{Code, Hash, HashCode, Id, TxHash};
use elv_eat::{Grant, Token, TokenBuilder, TokenData, TokenFormat, TokenSigType, TokenType};

// =============================================================================
// FORMATS
// =============================================================================

#[test]
fn test_state_channel_every_format() {
    let f = fixture();
    for format in FORMATS {
        let mut token = state_channel(&f, format);
        let s = token.encode().unwrap();
        assert!(s.starts_with(&format!("ascs{}", format.prefix())), "{format}: {s}");

        let parsed = Token::parse(&s).unwrap();
        assert_eq!(parsed, token, "{format}");
        assert_eq!(parsed.data().subject, "iusr2Fm8");
        assert_eq!(parsed.data().ctx["usr"]["roles"][1], "editor");
        assert_eq!(parsed.data().grant, Some(Grant::Read));
    }
}

#[test]
fn test_compression_shrinks_payload() {
    let f = fixture();
    let plain = state_channel(&f, TokenFormat::Json).encode().unwrap();
    let compressed = state_channel(&f, TokenFormat::JsonCompressed).encode().unwrap();
    assert!(compressed.len() < plain.len());
}

#[test]
fn test_reencode_is_stable() {
    let f = fixture();
    let s = state_channel(&f, TokenFormat::CborCompressed).encode().unwrap();
    let mut parsed = Token::parse(&s).unwrap();
    assert_eq!(parsed.encode().unwrap(), s);
    assert_eq!(parsed.to_string(), s);
}

// =============================================================================
// TOKEN TYPES
// =============================================================================

#[test]
fn test_other_types_round_trip() {
    let f = fixture();
    let src = Id::generate(Code::Q);
    let part = Hash::new(HashCode::QPart, &[9; 32]);

    for format in FORMATS {
        let builders = [
            TokenBuilder::new_tx(&f.sid, &f.lid, TxHash::new([7u8; 32]))
                .with_format(format)
                .sign(&f.server),
            TokenBuilder::new_plain(&f.sid, &f.lid).with_format(format).sign(&f.server),
            TokenBuilder::new_anonymous(&f.sid, &f.lid).with_format(format),
            TokenBuilder::new_editor_signed(&f.sid, &f.lid, &f.qid)
                .with_format(format)
                .sign(&f.client),
            TokenBuilder::new_node_token(&f.sid, &f.lid, part.clone())
                .with_format(format)
                .sign(&f.server),
            TokenBuilder::new_signed_link(&f.sid, &f.lid, &f.qid, &src, "./meta/link")
                .with_format(format)
                .sign(&f.client),
            TokenBuilder::new_client_signed(&f.sid, &f.lid)
                .with_format(format)
                .sign_eip191_personal(&f.client),
            TokenBuilder::new_client_confirmation(&f.sid, &f.lid)
                .with_format(format)
                .sign(&f.client),
        ];

        for builder in builders {
            let mut token = builder.token().unwrap();
            let token_type = token.token_type();
            let s = token.encode().unwrap_or_else(|e| panic!("{token_type} {format}: {e}"));
            assert!(s.starts_with(token_type.prefix()));

            let mut parsed = Token::parse(&s).unwrap();
            assert_eq!(parsed, token, "{token_type} {format}");
            parsed.verify_signature().unwrap();
        }
    }
}

#[test]
fn test_library_id_is_optional() {
    let f = fixture();
    let mut token = TokenBuilder::new_anonymous(&f.sid, &Id::default()).token().unwrap();
    assert_eq!(token.data().lid, None);
    let parsed = Token::parse(&token.encode().unwrap()).unwrap();
    assert_eq!(parsed.data().lid, None);
}

#[test]
fn test_zero_claims() {
    assert_eq!(TokenData::default().encode_json().unwrap(), b"{}");
    assert_eq!(TokenData::default().encode_cbor().unwrap(), [0xa0]);
    assert_eq!(TokenData::default().encode_custom().unwrap(), [0u8; 12]);
    for format in FORMATS {
        let ser = format.serialization();
        let bytes = TokenData::default().encode(ser).unwrap();
        assert_eq!(TokenData::decode(ser, &bytes).unwrap(), TokenData::default(), "{format}");
    }
}

// =============================================================================
// CLIENT TOKENS
// =============================================================================

#[test]
fn test_client_token_embeds_state_channel() {
    let f = fixture();
    for inner_format in FORMATS {
        let sc = state_channel(&f, inner_format);
        for format in FORMATS {
            let mut client = TokenBuilder::new_client_token(sc.clone())
                .with_format(format)
                .sign(&f.client)
                .must_token();
            let s = client.encode().unwrap();
            assert!(s.starts_with(&format!("acls{}", format.prefix())));

            let mut parsed = Token::parse(&s).unwrap();
            assert_eq!(parsed, client);
            assert_eq!(parsed.embedded(), Some(&sc));
            assert_eq!(parsed.embedded_len(), client.embedded_len());
            assert!(parsed.embedded_len() > 0);

            parsed.verify_signature_from(&f.client.address()).unwrap();
            let mut embedded = parsed.embedded().unwrap().clone();
            embedded.verify_signature_from(&f.server.address()).unwrap();
        }
    }
}

#[test]
fn test_unsigned_client_token() {
    let f = fixture();
    let sc = state_channel(&f, TokenFormat::JsonCompressed);
    let s = TokenBuilder::new_client_token(sc).encode().unwrap();
    assert!(s.starts_with("acluj"));

    let parsed = Token::parse(&s).unwrap();
    assert_eq!(parsed.sig_type(), TokenSigType::Unsigned);
    assert_eq!(parsed.embedded().unwrap().token_type(), TokenType::StateChannel);
    assert_eq!(parsed.data().sid.as_ref(), Some(&f.sid));
}

// =============================================================================
// LEGACY-SIGNED
// =============================================================================

#[test]
fn test_legacy_signed_round_trip() {
    let f = fixture();
    let mut token = TokenBuilder::new_plain(&f.sid, &f.lid)
        .with_subject("someone")
        .with_format(TokenFormat::LegacySigned)
        .sign(&f.server)
        .must_token();
    let s = token.encode().unwrap();
    let (inner, sig) = s.split_once('.').unwrap();
    assert!(inner.starts_with("aplujc"));
    assert!(!sig.is_empty());

    let mut parsed = Token::parse(&s).unwrap();
    assert_eq!(parsed.format(), TokenFormat::LegacySigned);
    assert_eq!(parsed.sig_type(), TokenSigType::ES256K);
    assert_eq!(parsed, token);
    parsed.verify_signature_from(&f.server.address()).unwrap();
    assert_eq!(parsed.encode().unwrap(), s);
}
