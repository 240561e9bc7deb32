//! Local, signature-less decoding of JWT access token claims.
//!
//! This is NOT an authorization check. The identity provider already
//! rejected the token; the decoded claims only tell the gate whether the
//! token looks like one that merely expired, which makes a refresh worth
//! attempting.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::errors::ClaimsError;

/// Claims read from a token whose signature has not been checked.
#[derive(Debug, Clone)]
pub struct UnverifiedClaims {
    inner: Map<String, Value>,
}

impl UnverifiedClaims {
    /// Decodes the payload segment of a compact JWT.
    pub fn decode(token: &str) -> Result<Self, ClaimsError> {
        let segments: Vec<&str> = token.split('.').collect();
        if segments.len() != 3 || segments.iter().take(2).any(|s| s.is_empty()) {
            return Err(ClaimsError::MalformedToken);
        }

        // Some issuers pad their segments; URL_SAFE_NO_PAD rejects padding.
        let payload = URL_SAFE_NO_PAD
            .decode(segments[1].trim_end_matches('='))
            .map_err(|e| ClaimsError::InvalidEncoding(e.to_string()))?;

        match serde_json::from_slice::<Value>(&payload) {
            Ok(Value::Object(inner)) => Ok(Self { inner }),
            Ok(other) => Err(ClaimsError::InvalidPayload(format!(
                "expected object, found {other}"
            ))),
            Err(e) => Err(ClaimsError::InvalidPayload(e.to_string())),
        }
    }

    pub fn has_expiry(&self) -> bool {
        self.inner.contains_key("exp")
    }

    /// The `exp` claim as a timestamp, if it is a number of seconds
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let exp = self.inner.get("exp")?;
        let seconds = exp.as_i64().or_else(|| exp.as_f64().map(|f| f as i64))?;
        DateTime::from_timestamp(seconds, 0)
    }

    pub fn subject(&self) -> Option<&str> {
        self.inner.get("sub").and_then(Value::as_str)
    }
}

#[cfg(test)]
pub(crate) fn encode_test_token(payload: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{header}.{body}.c2lnbmF0dXJl")
}
