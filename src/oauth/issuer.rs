//! Client for the identity provider's OpenID Connect token and userinfo endpoints.
//!
//! Three operations, each a single outbound call bounded by the configured
//! issuer timeout: password grant, userinfo introspection, refresh grant.
//! Nothing is cached; every call goes to the provider.

use async_trait::async_trait;
use http::StatusCode;

use crate::config::IssuerConfig;
use crate::errors::IssuerError;
use crate::oauth::types::{Credentials, LOGIN_SCOPE, TokenSet, UserInfo};

/// Operations the authentication gate and the login handler need from an
/// identity provider.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    /// Exchange a username and password for a token pair (password grant)
    async fn authenticate(&self, credentials: &Credentials) -> Result<TokenSet, IssuerError>;

    /// Resolve a bearer token into the claims of its owner
    async fn validate(&self, token: &str) -> Result<UserInfo, IssuerError>;

    /// Exchange a refresh token for a new token pair (refresh grant)
    async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, IssuerError>;
}

/// [`TokenIssuer`] backed by a Keycloak realm.
pub struct KeycloakClient {
    http_client: reqwest::Client,
    config: IssuerConfig,
    token_url: String,
    userinfo_url: String,
}

impl KeycloakClient {
    pub fn new(http_client: reqwest::Client, config: IssuerConfig) -> Self {
        let token_url = config.token_url();
        let userinfo_url = config.userinfo_url();
        Self {
            http_client,
            config,
            token_url,
            userinfo_url,
        }
    }

    /// Form fields identifying this client, plus the grant specific ones
    fn grant_form<'a>(&'a self, grant: &[(&'a str, &'a str)]) -> Vec<(&'a str, &'a str)> {
        let mut form = vec![("client_id", self.config.client_id.as_str())];
        form.extend_from_slice(grant);
        if let Some(client_secret) = self.config.client_secret.as_deref() {
            form.push(("client_secret", client_secret));
        }
        form
    }

    async fn post_grant(
        &self,
        form: &[(&str, &str)],
    ) -> Result<reqwest::Response, reqwest::Error> {
        self.http_client
            .post(&self.token_url)
            .timeout(*self.config.timeout.as_ref())
            .form(form)
            .send()
            .await
    }
}

/// Classifies a transport failure: timeouts become `GatewayTimeout`, the rest `Internal`.
fn transport_error(error: reqwest::Error, timeout_message: &str) -> IssuerError {
    if error.is_timeout() {
        tracing::error!(?error, "{timeout_message}");
        IssuerError::GatewayTimeout(timeout_message.to_string())
    } else {
        tracing::error!(?error, "identity provider request failed");
        IssuerError::Internal(error.to_string())
    }
}

async fn read_body(response: reqwest::Response) -> String {
    response.text().await.unwrap_or_default()
}

#[async_trait]
impl TokenIssuer for KeycloakClient {
    async fn authenticate(&self, credentials: &Credentials) -> Result<TokenSet, IssuerError> {
        const TIMEOUT: &str = "Authentication request timed out";

        tracing::info!(username = %credentials.username, url = %self.token_url, "authenticating user");

        let form = self.grant_form(&[
            ("grant_type", "password"),
            ("username", credentials.username.as_str()),
            ("password", credentials.password.as_str()),
            ("scope", LOGIN_SCOPE),
        ]);
        let response = self
            .post_grant(&form)
            .await
            .map_err(|e| transport_error(e, TIMEOUT))?;

        let status = response.status();
        tracing::info!(%status, "authentication response");

        if status != StatusCode::OK {
            let body = read_body(response).await;
            tracing::error!(%status, %body, "authentication failed");
            return Err(IssuerError::AuthenticationFailed { status, body });
        }

        let tokens = response
            .json::<TokenSet>()
            .await
            .map_err(|e| transport_error(e, TIMEOUT))?;
        tracing::info!(username = %credentials.username, "user authenticated");
        Ok(tokens)
    }

    async fn validate(&self, token: &str) -> Result<UserInfo, IssuerError> {
        const TIMEOUT: &str = "Token validation request timed out";

        if token.is_empty() {
            tracing::error!("no token provided");
            return Err(IssuerError::Unauthenticated("No token provided".to_string()));
        }

        tracing::debug!(url = %self.userinfo_url, "validating token");

        let response = self
            .http_client
            .get(&self.userinfo_url)
            .timeout(*self.config.timeout.as_ref())
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| transport_error(e, TIMEOUT))?;

        let status = response.status();
        match status {
            StatusCode::OK => {
                let user_info = response
                    .json::<UserInfo>()
                    .await
                    .map_err(|e| transport_error(e, TIMEOUT))?;
                tracing::info!(user = %user_info.display_name(), "token validated");
                Ok(user_info)
            }
            StatusCode::UNAUTHORIZED => {
                let body = read_body(response).await;
                tracing::warn!(%body, "token rejected by identity provider");
                Err(IssuerError::InvalidOrExpiredToken(
                    "Invalid or expired token".to_string(),
                ))
            }
            _ => {
                let body = read_body(response).await;
                tracing::error!(%status, %body, "unexpected userinfo response");
                Err(IssuerError::Internal(format!(
                    "unexpected userinfo status {status}: {body}"
                )))
            }
        }
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, IssuerError> {
        const TIMEOUT: &str = "Token refresh request timed out";

        tracing::info!("attempting token refresh");

        let form = self.grant_form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ]);
        let response = self
            .post_grant(&form)
            .await
            .map_err(|e| transport_error(e, TIMEOUT))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = read_body(response).await;
            tracing::error!(%status, %body, "token refresh failed");
            return Err(IssuerError::RefreshFailed { status, body });
        }

        let tokens = response
            .json::<TokenSet>()
            .await
            .map_err(|e| transport_error(e, TIMEOUT))?;
        tracing::info!("token refreshed");
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use url::Url;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TOKEN_PATH: &str = "/realms/myrealm/protocol/openid-connect/token";
    const USERINFO_PATH: &str = "/realms/myrealm/protocol/openid-connect/userinfo";

    fn client_for(server: &MockServer, client_secret: Option<&str>) -> KeycloakClient {
        let config = IssuerConfig {
            base_url: Url::parse(&server.uri()).unwrap(),
            realm: "myrealm".to_string(),
            client_id: "myclient".to_string(),
            client_secret: client_secret.map(str::to_string),
            timeout: Duration::from_millis(200).into(),
        };
        KeycloakClient::new(reqwest::Client::new(), config)
    }

    fn token_payload() -> serde_json::Value {
        json!({
            "access_token": "new-access",
            "refresh_token": "new-refresh",
            "expires_in": 300,
            "token_type": "Bearer"
        })
    }

    #[tokio::test]
    async fn test_authenticate_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .and(body_string_contains("grant_type=password"))
            .and(body_string_contains("username=alice"))
            .and(body_string_contains("scope=openid+profile+email"))
            .and(body_string_contains("client_secret=s3cret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_payload()))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("s3cret"));
        let tokens = client
            .authenticate(&Credentials::new("alice", "wonderland"))
            .await
            .unwrap();

        assert_eq!(tokens.access_token, "new-access");
        assert_eq!(tokens.refresh_token, "new-refresh");
        assert_eq!(serde_json::to_value(&tokens).unwrap(), token_payload());
    }

    #[tokio::test]
    async fn test_authenticate_omits_absent_client_secret() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_payload()))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        client
            .authenticate(&Credentials::new("alice", "wonderland"))
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let body = String::from_utf8(requests[0].body.clone()).unwrap();
        assert!(body.contains("client_id=myclient"));
        assert!(!body.contains("client_secret"));
    }

    #[tokio::test]
    async fn test_authenticate_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(
                ResponseTemplate::new(401).set_body_string(r#"{"error":"invalid_grant"}"#),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let result = client
            .authenticate(&Credentials::new("alice", "wrong"))
            .await;

        match result {
            Err(IssuerError::AuthenticationFailed { status, body }) => {
                assert_eq!(status, StatusCode::UNAUTHORIZED);
                assert!(body.contains("invalid_grant"));
            }
            other => panic!("expected AuthenticationFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_authenticate_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(token_payload())
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let result = client
            .authenticate(&Credentials::new("alice", "wonderland"))
            .await;

        assert!(matches!(result, Err(IssuerError::GatewayTimeout(_))));
    }

    #[tokio::test]
    async fn test_validate_empty_token_makes_no_call() {
        let server = MockServer::start().await;
        let client = client_for(&server, None);

        let result = client.validate("").await;

        assert!(matches!(result, Err(IssuerError::Unauthenticated(_))));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_validate_success_is_repeatable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(USERINFO_PATH))
            .and(header("authorization", "Bearer good-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sub": "user-1",
                "preferred_username": "alice"
            })))
            .expect(2)
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let first = client.validate("good-token").await.unwrap();
        let second = client.validate("good-token").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.display_name(), "alice");
    }

    #[tokio::test]
    async fn test_validate_classifies_statuses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(USERINFO_PATH))
            .and(header("authorization", "Bearer expired"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(USERINFO_PATH))
            .and(header("authorization", "Bearer broken"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        assert!(matches!(
            client.validate("expired").await,
            Err(IssuerError::InvalidOrExpiredToken(_))
        ));
        assert!(matches!(
            client.validate("broken").await,
            Err(IssuerError::Internal(_))
        ));
    }

    #[tokio::test]
    async fn test_validate_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(USERINFO_PATH))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        assert!(matches!(
            client.validate("slow").await,
            Err(IssuerError::GatewayTimeout(_))
        ));
    }

    #[tokio::test]
    async fn test_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=good-refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_payload()))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .and(body_string_contains("refresh_token=stale-refresh"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let tokens = client.refresh("good-refresh").await.unwrap();
        assert_eq!(tokens.access_token, "new-access");

        match client.refresh("stale-refresh").await {
            Err(IssuerError::RefreshFailed { status, .. }) => {
                assert_eq!(status, StatusCode::BAD_REQUEST)
            }
            other => panic!("expected RefreshFailed, got {other:?}"),
        }
    }
}
