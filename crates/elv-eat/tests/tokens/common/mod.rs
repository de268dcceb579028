//! Shared fixtures for the token tests.

use chrono::{DateTime, Duration, Utc};
use elv_core::{Code, Id, KeyPair};
use elv_eat::data::now_millis;
use elv_eat::{Token, TokenBuilder, TokenFormat};
use serde_json::json;

/// Every non-legacy format.
pub const FORMATS: [TokenFormat; 5] = [
    TokenFormat::Json,
    TokenFormat::JsonCompressed,
    TokenFormat::Cbor,
    TokenFormat::CborCompressed,
    TokenFormat::Custom,
];

pub struct Fixture {
    pub sid: Id,
    pub lid: Id,
    pub qid: Id,
    pub server: KeyPair,
    pub client: KeyPair,
}

pub fn fixture() -> Fixture {
    Fixture {
        sid: Id::generate(Code::QSpace),
        lid: Id::generate(Code::QLib),
        qid: Id::generate(Code::Q),
        server: KeyPair::generate().unwrap(),
        client: KeyPair::generate().unwrap(),
    }
}

/// Now, truncated to whole seconds as legacy tokens transmit it.
pub fn now_seconds() -> DateTime<Utc> {
    DateTime::from_timestamp(Utc::now().timestamp(), 0).unwrap()
}

/// Signed state-channel token with subject, context and AFGH key.
pub fn state_channel(f: &Fixture, format: TokenFormat) -> Token {
    TokenBuilder::new_state_channel(&f.sid, &f.lid, &f.qid, "iusr2Fm8")
        .with_format(format)
        .with_afgh_public_key("ktpkAFGH")
        .with_context(
            json!({"usr": {"email": "someone@example.com", "roles": ["viewer", "editor"]}, "n": 7})
                .as_object()
                .unwrap()
                .clone(),
        )
        .sign(&f.server)
        .must_token()
}

/// Signed legacy state-channel token with whole-second timestamps and no subject.
pub fn legacy_state_channel(f: &Fixture) -> Token {
    let now = now_seconds();
    TokenBuilder::new_state_channel(&f.sid, &f.lid, &f.qid, "")
        .with_format(TokenFormat::Legacy)
        .with_issued_at(now)
        .with_expires(now + Duration::hours(1))
        .with_ctx("usr", "someone@example.com")
        .sign(&f.server)
        .must_token()
}

/// Issued-at and expiry around now.
pub fn window(before: Duration, after: Duration) -> (DateTime<Utc>, DateTime<Utc>) {
    let now = now_millis();
    (now - before, now + after)
}
