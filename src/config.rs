//! Environment-based configuration types for the RAG API server runtime settings.

use anyhow::Result;
use std::time::Duration;
use url::Url;

use crate::errors::ConfigError;

/// Paths that bypass the authentication gate unless overridden
pub const DEFAULT_EXEMPT_PATHS: &str = "/login,/docs,/openapi.json,/redoc";

/// Name of the cookie that carries the refresh token
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

/// HTTP server port configuration
#[derive(Clone, Debug)]
pub struct HttpPort(u16);

/// Timeout applied to each outbound HTTP call
#[derive(Clone, Debug)]
pub struct HttpClientTimeout(Duration);

/// Max-Age of the refresh token cookie
#[derive(Clone, Debug)]
pub struct CookieMaxAge(Duration);

/// Request paths that skip authentication
#[derive(Clone, Debug)]
pub struct ExemptPaths(Vec<String>);

/// CORS origins; empty means any origin
#[derive(Clone, Debug)]
pub struct AllowedOrigins(Vec<String>);

/// Identity provider (Keycloak realm) settings
#[derive(Clone)]
pub struct IssuerConfig {
    pub base_url: Url,
    pub realm: String,
    pub client_id: String,
    pub client_secret: Option<String>,
    pub timeout: HttpClientTimeout,
}

impl IssuerConfig {
    fn realm_endpoint(&self, endpoint: &str) -> String {
        format!(
            "{}/realms/{}/protocol/openid-connect/{}",
            self.base_url.as_str().trim_end_matches('/'),
            self.realm,
            endpoint
        )
    }

    /// Password and refresh grant endpoint
    pub fn token_url(&self) -> String {
        self.realm_endpoint("token")
    }

    /// Bearer token introspection endpoint
    pub fn userinfo_url(&self) -> String {
        self.realm_endpoint("userinfo")
    }
}

// Keep the client secret out of logs.
impl std::fmt::Debug for IssuerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuerConfig")
            .field("base_url", &self.base_url.as_str())
            .field("realm", &self.realm)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Inference endpoint settings
#[derive(Clone)]
pub struct InferenceConfig {
    pub api_url: Url,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: HttpClientTimeout,
}

impl InferenceConfig {
    /// Full URL of the configured model
    pub fn model_url(&self) -> String {
        format!("{}/{}", self.api_url.as_str().trim_end_matches('/'), self.model)
    }
}

impl std::fmt::Debug for InferenceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceConfig")
            .field("api_url", &self.api_url.as_str())
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Main application configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub version: String,
    pub http_port: HttpPort,
    pub user_agent: String,
    pub issuer: IssuerConfig,
    pub inference: InferenceConfig,
    pub refresh_cookie_max_age: CookieMaxAge,
    pub auth_exempt_paths: ExemptPaths,
    pub cors_allowed_origins: AllowedOrigins,
}

impl Config {
    /// Create a new configuration from environment variables
    pub fn new() -> Result<Self> {
        let default_user_agent = format!("rag-api/{}", version()?);
        let http_port: HttpPort = default_env("HTTP_PORT", "8000").try_into()?;
        let user_agent = default_env("USER_AGENT", &default_user_agent);

        let issuer = IssuerConfig {
            base_url: parse_url(default_env("KEYCLOAK_URL", "http://localhost:8080"))?,
            realm: default_env("KEYCLOAK_REALM", "myrealm"),
            client_id: default_env("KEYCLOAK_CLIENT_ID", "myclient"),
            client_secret: optional_env("KEYCLOAK_CLIENT_SECRET").filter(|s| !s.is_empty()),
            timeout: default_env("ISSUER_TIMEOUT", "10s").try_into()?,
        };

        let inference = InferenceConfig {
            api_url: parse_url(default_env(
                "HUGGINGFACE_API_URL",
                "https://api-inference.huggingface.co/models",
            ))?,
            model: default_env("HUGGINGFACE_MODEL", "gpt2"),
            api_key: optional_env("HUGGINGFACE_API_KEY").filter(|s| !s.is_empty()),
            timeout: default_env("INFERENCE_TIMEOUT", "30s").try_into()?,
        };

        let refresh_cookie_max_age: CookieMaxAge =
            default_env("REFRESH_COOKIE_MAX_AGE", "30m").try_into()?;
        let auth_exempt_paths: ExemptPaths =
            default_env("AUTH_EXEMPT_PATHS", DEFAULT_EXEMPT_PATHS).try_into()?;
        let cors_allowed_origins: AllowedOrigins =
            default_env("CORS_ALLOWED_ORIGINS", "*").try_into()?;

        Ok(Self {
            version: version()?,
            http_port,
            user_agent,
            issuer,
            inference,
            refresh_cookie_max_age,
            auth_exempt_paths,
            cors_allowed_origins,
        })
    }
}

/// Get application version from build environment
pub fn version() -> Result<String> {
    option_env!("GIT_HASH")
        .or(option_env!("CARGO_PKG_VERSION"))
        .map(|val| val.to_string())
        .ok_or(ConfigError::VersionNotSet.into())
}

pub(crate) fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn default_env(name: &str, default_value: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default_value.to_string())
}

fn parse_url(value: String) -> Result<Url, ConfigError> {
    Url::parse(&value).map_err(|e| ConfigError::UrlParsingFailed(value, e))
}

impl TryFrom<String> for HttpPort {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            Ok(Self(8000))
        } else {
            value
                .parse::<u16>()
                .map(Self)
                .map_err(|err| ConfigError::PortParsingFailed(err).into())
        }
    }
}

impl AsRef<u16> for HttpPort {
    fn as_ref(&self) -> &u16 {
        &self.0
    }
}

impl TryFrom<String> for HttpClientTimeout {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        duration_str::parse(&value)
            .map(Self)
            .map_err(|e| ConfigError::DurationParsingFailed(value, e.to_string()))
    }
}

impl From<Duration> for HttpClientTimeout {
    fn from(value: Duration) -> Self {
        Self(value)
    }
}

impl AsRef<Duration> for HttpClientTimeout {
    fn as_ref(&self) -> &Duration {
        &self.0
    }
}

impl TryFrom<String> for CookieMaxAge {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        duration_str::parse(&value)
            .map(Self)
            .map_err(|e| ConfigError::DurationParsingFailed(value, e.to_string()))
    }
}

impl From<Duration> for CookieMaxAge {
    fn from(value: Duration) -> Self {
        Self(value)
    }
}

impl AsRef<Duration> for CookieMaxAge {
    fn as_ref(&self) -> &Duration {
        &self.0
    }
}

impl TryFrom<String> for ExemptPaths {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let paths = value
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| {
                if s.starts_with('/') {
                    Ok(s.to_string())
                } else {
                    Err(ConfigError::InvalidExemptPath(s.to_string()))
                }
            })
            .collect::<Result<Vec<String>, ConfigError>>()?;
        Ok(Self(paths))
    }
}

impl ExemptPaths {
    pub fn contains(&self, path: &str) -> bool {
        self.0.iter().any(|exempt| exempt == path)
    }
}

impl AsRef<Vec<String>> for ExemptPaths {
    fn as_ref(&self) -> &Vec<String> {
        &self.0
    }
}

impl TryFrom<String> for AllowedOrigins {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let origins: Vec<String> = value
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty() && *s != "*")
            .map(|s| s.to_string())
            .collect();
        Ok(Self(origins))
    }
}

impl AsRef<Vec<String>> for AllowedOrigins {
    fn as_ref(&self) -> &Vec<String> {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer_config(base: &str) -> IssuerConfig {
        IssuerConfig {
            base_url: Url::parse(base).unwrap(),
            realm: "myrealm".to_string(),
            client_id: "myclient".to_string(),
            client_secret: Some("s3cret".to_string()),
            timeout: Duration::from_secs(10).into(),
        }
    }

    #[test]
    fn test_realm_endpoints() {
        let config = issuer_config("http://localhost:8080/");
        assert_eq!(
            config.token_url(),
            "http://localhost:8080/realms/myrealm/protocol/openid-connect/token"
        );
        assert_eq!(
            config.userinfo_url(),
            "http://localhost:8080/realms/myrealm/protocol/openid-connect/userinfo"
        );
    }

    #[test]
    fn test_issuer_debug_redacts_secret() {
        let rendered = format!("{:?}", issuer_config("http://localhost:8080"));
        assert!(!rendered.contains("s3cret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_durations() {
        let timeout = HttpClientTimeout::try_from("10s".to_string()).unwrap();
        assert_eq!(*timeout.as_ref(), Duration::from_secs(10));

        let max_age = CookieMaxAge::try_from("30m".to_string()).unwrap();
        assert_eq!(*max_age.as_ref(), Duration::from_secs(1800));

        assert!(HttpClientTimeout::try_from("soon".to_string()).is_err());
    }

    #[test]
    fn test_http_port() {
        let port = HttpPort::try_from("9000".to_string()).unwrap();
        assert_eq!(*port.as_ref(), 9000);
        assert_eq!(*HttpPort::try_from(String::new()).unwrap().as_ref(), 8000);
        assert!(HttpPort::try_from("eighty".to_string()).is_err());
    }

    #[test]
    fn test_exempt_paths() {
        let paths = ExemptPaths::try_from(DEFAULT_EXEMPT_PATHS.to_string()).unwrap();
        assert!(paths.contains("/login"));
        assert!(paths.contains("/openapi.json"));
        assert!(!paths.contains("/predict"));
        assert!(!paths.contains("/login/extra"));

        assert!(ExemptPaths::try_from("login".to_string()).is_err());
    }

    #[test]
    fn test_allowed_origins_wildcard() {
        let origins = AllowedOrigins::try_from("*".to_string()).unwrap();
        assert!(origins.as_ref().is_empty());

        let origins =
            AllowedOrigins::try_from("http://localhost:3000, https://app.example.com".to_string())
                .unwrap();
        assert_eq!(origins.as_ref().len(), 2);
    }

    #[test]
    fn test_model_url() {
        let config = InferenceConfig {
            api_url: Url::parse("https://api-inference.huggingface.co/models").unwrap(),
            model: "gpt2".to_string(),
            api_key: None,
            timeout: Duration::from_secs(30).into(),
        };
        assert_eq!(
            config.model_url(),
            "https://api-inference.huggingface.co/models/gpt2"
        );
    }
}
