//! OAuth2 token and identity payloads exchanged with the identity provider.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Scope requested on every password grant
pub const LOGIN_SCOPE: &str = "openid profile email";

/// Username and password submitted to `/login`.
///
/// Fields beyond `username` and `password` of an OAuth2 password form
/// (`grant_type`, `scope`, `client_id`, `client_secret`) are accepted and
/// ignored; client identity always comes from configuration.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Token payload returned by the password and refresh grants.
///
/// Only the two tokens are typed. Every other member of the provider
/// payload (`expires_in`, `token_type`, `id_token`, ...) is kept in `extra`
/// so the payload serializes back unchanged.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TokenSet {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            extra: Map::new(),
        }
    }

    /// Lifetime of the access token in seconds, when the provider sent one
    pub fn expires_in(&self) -> Option<u64> {
        self.extra.get("expires_in").and_then(Value::as_u64)
    }
}

impl std::fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSet")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_in", &self.expires_in())
            .finish()
    }
}

/// Claims returned by the userinfo endpoint for a valid bearer token.
///
/// Every claim is optional; a provider that omits `sub` yields an empty subject.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserInfo {
    #[serde(default)]
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(flatten)]
    pub claims: Map<String, Value>,
}

impl UserInfo {
    pub fn new(sub: impl Into<String>) -> Self {
        Self {
            sub: sub.into(),
            preferred_username: None,
            email: None,
            claims: Map::new(),
        }
    }

    pub fn with_preferred_username(mut self, username: impl Into<String>) -> Self {
        self.preferred_username = Some(username.into());
        self
    }

    /// Name used in logs: the preferred username, falling back to the subject
    pub fn display_name(&self) -> &str {
        self.preferred_username.as_deref().unwrap_or(&self.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_token_set_preserves_provider_payload() {
        let payload = json!({
            "access_token": "at",
            "refresh_token": "rt",
            "expires_in": 300,
            "refresh_expires_in": 1800,
            "token_type": "Bearer",
            "scope": "openid profile email"
        });

        let tokens: TokenSet = serde_json::from_value(payload.clone()).unwrap();
        assert_eq!(tokens.access_token, "at");
        assert_eq!(tokens.refresh_token, "rt");
        assert_eq!(tokens.expires_in(), Some(300));
        assert_eq!(serde_json::to_value(&tokens).unwrap(), payload);
    }

    #[test]
    fn test_user_info_without_subject() {
        let user: UserInfo =
            serde_json::from_value(json!({ "preferred_username": "alice", "locale": "en" }))
                .unwrap();
        assert_eq!(user.sub, "");
        assert_eq!(user.display_name(), "alice");
        assert_eq!(user.claims.get("locale"), Some(&json!("en")));
    }

    #[test]
    fn test_token_set_requires_refresh_token() {
        let result = serde_json::from_value::<TokenSet>(json!({ "access_token": "at" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_debug_output_redacts_secrets() {
        let tokens = TokenSet::new("access-secret", "refresh-secret");
        let rendered = format!("{tokens:?}");
        assert!(!rendered.contains("access-secret"));
        assert!(!rendered.contains("refresh-secret"));

        let credentials = Credentials::new("alice", "hunter2");
        let rendered = format!("{credentials:?}");
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_user_info_display_name() {
        let info: UserInfo = serde_json::from_value(json!({
            "sub": "f3b1c2",
            "preferred_username": "alice",
            "email_verified": true
        }))
        .unwrap();
        assert_eq!(info.display_name(), "alice");
        assert_eq!(info.claims.get("email_verified"), Some(&json!(true)));

        assert_eq!(UserInfo::new("f3b1c2").display_name(), "f3b1c2");
    }
}
