//! Unverified access-token claim decoding
//!
//! The client reads the token payload only to learn who is signed in for
//! display purposes. Signatures are not checked here; the server verifies every
//! request independently, so nothing decoded in this module may be used to
//! grant access.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Identifier of a platform user, taken from the token subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl UserId {
    /// Get the raw numeric id
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// Claims the client cares about
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenClaims {
    pub subject: Option<UserId>,
    /// `iat`, seconds since the epoch
    pub issued_at: Option<i64>,
    /// `exp`, seconds since the epoch
    pub expires_at: Option<i64>,
}

#[derive(Deserialize)]
struct RawClaims {
    #[serde(default)]
    sub: Option<Value>,
    #[serde(default)]
    iat: Option<i64>,
    #[serde(default)]
    exp: Option<i64>,
}

/// Decode the payload segment of a three-part token
///
/// Returns `None` when the token is not dot-delimited or the payload is not a
/// base64 JSON object.
pub fn decode_claims(token: &str) -> Option<TokenClaims> {
    let mut parts = token.split('.');
    let (_header, payload, _signature) = (parts.next()?, parts.next()?, parts.next()?);
    if payload.is_empty() || parts.next().is_some() {
        return None;
    }

    let payload = payload.trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .or_else(|_| STANDARD_NO_PAD.decode(payload))
        .ok()?;
    let raw: RawClaims = serde_json::from_slice(&bytes).ok()?;

    Some(TokenClaims {
        subject: raw.sub.as_ref().and_then(subject_from_value),
        issued_at: raw.iat,
        expires_at: raw.exp,
    })
}

/// Derive the signed-in user from a token, `None` on any decode failure
pub fn user_id_from_token(token: &str) -> Option<UserId> {
    decode_claims(token).and_then(|claims| claims.subject)
}

fn subject_from_value(value: &Value) -> Option<UserId> {
    match value {
        Value::Number(n) => n.as_i64().map(UserId),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
