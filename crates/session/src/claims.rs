//! Access token claims
//!
//! Access tokens are JWTs signed by the session service with `{id, role}`
//! and a 15 minute lifetime. The client never verifies the signature (it does
//! not hold the key); it only reads `exp` to schedule proactive refresh and
//! `role` for display. Anything that fails to decode is treated as an opaque
//! token with unknown expiry.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::identity::Role;

/// Unverified payload of an access token.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessClaims {
    pub id: String,
    #[serde(default)]
    pub role: Option<Role>,
    /// Issued-at, unix seconds
    #[serde(default)]
    pub iat: Option<u64>,
    /// Expiry, unix seconds
    #[serde(default)]
    pub exp: Option<u64>,
}

impl AccessClaims {
    /// Decode the payload segment of a JWT without verifying it.
    pub fn decode(token: &str) -> Result<Self> {
        let mut segments = token.split('.');
        let payload = match (segments.next(), segments.next(), segments.next()) {
            (Some(_), Some(payload), Some(_)) => payload,
            _ => {
                return Err(Error::CredentialParse(
                    "access token is not a three-segment JWT".into(),
                ));
            }
        };

        // Tolerate padded encoders
        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| Error::CredentialParse(format!("token payload is not base64url: {e}")))?;

        serde_json::from_slice(&bytes)
            .map_err(|e| Error::CredentialParse(format!("token payload is not valid claims: {e}")))
    }

    /// Seconds until expiry relative to `now_secs`; `None` when the token
    /// carries no `exp`. Already-expired tokens report zero.
    pub fn seconds_remaining(&self, now_secs: u64) -> Option<u64> {
        self.exp.map(|exp| exp.saturating_sub(now_secs))
    }

    /// Whether the token expires within `threshold_secs` of `now_secs`.
    /// Tokens without `exp` never count as expiring.
    pub fn expires_within(&self, now_secs: u64, threshold_secs: u64) -> bool {
        match self.exp {
            Some(exp) => exp <= now_secs.saturating_add(threshold_secs),
            None => false,
        }
    }
}

#[cfg(test)]
pub(crate) fn encode_test_token(payload: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{header}.{body}.signature")
}
