//! Token introspection.
//!
//! The service issues JWT-shaped bearer tokens. Expiry lives in the `exp`
//! claim of the payload segment. Tokens are otherwise opaque to the client,
//! and any token that cannot be decoded is treated as having an unknown
//! expiry rather than an elapsed one.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ExpiryClaim {
    exp: i64,
}

/// Seconds until the token's `exp` claim elapses. Negative once expired.
/// Returns `None` for anything that does not decode as a JWT with a numeric
/// `exp` claim - unknown expiry, never "expired".
pub fn time_to_expiry(token: &str) -> Option<i64> {
    let exp = expiry_unix(token)?;
    Some(exp - Utc::now().timestamp())
}

/// The raw `exp` claim as a unix timestamp, if the token carries one.
pub fn expiry_unix(token: &str) -> Option<i64> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    let claim: ExpiryClaim = serde_json::from_slice(&bytes).ok()?;
    Some(claim.exp)
}
