//! Standardized error types following the `error-rag-<domain>-<number>` format.

use axum::{
    Json,
    extract::rejection::{FormRejection, JsonRejection},
    response::{IntoResponse, Response},
};
use http::StatusCode;
use serde_json::json;
use thiserror::Error;

/// Configuration errors that occur during application startup
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Error when HTTP_PORT cannot be parsed
    #[error("error-rag-config-1 Parsing HTTP_PORT into u16 failed: {0:?}")]
    PortParsingFailed(std::num::ParseIntError),

    /// Error when version information is not available
    #[error("error-rag-config-2 One of GIT_HASH or CARGO_PKG_VERSION must be set")]
    VersionNotSet,

    /// Error when duration string cannot be parsed
    #[error("error-rag-config-3 Failed to parse duration '{0}': {1}")]
    DurationParsingFailed(String, String),

    /// Error when a configured URL cannot be parsed
    #[error("error-rag-config-4 Failed to parse URL '{0}': {1}")]
    UrlParsingFailed(String, url::ParseError),

    /// Error when an exempt path does not start with a slash
    #[error("error-rag-config-5 Exempt path must start with '/': {0}")]
    InvalidExemptPath(String),
}

/// Failures of the identity provider calls (login, userinfo, refresh)
#[derive(Debug, Error)]
pub enum IssuerError {
    /// No credential was presented at all
    #[error("error-rag-issuer-1 Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Userinfo endpoint answered 401
    #[error("error-rag-issuer-2 Invalid or expired token: {0}")]
    InvalidOrExpiredToken(String),

    /// Password grant rejected by the provider
    #[error("error-rag-issuer-3 Authentication failed with status {status}: {body}")]
    AuthenticationFailed { status: StatusCode, body: String },

    /// Refresh grant rejected by the provider
    #[error("error-rag-issuer-4 Token refresh failed with status {status}: {body}")]
    RefreshFailed { status: StatusCode, body: String },

    /// Provider call exceeded its timeout
    #[error("error-rag-issuer-5 {0}")]
    GatewayTimeout(String),

    /// Anything unclassified: transport failure, unexpected status, bad payload
    #[error("error-rag-issuer-6 Internal error: {0}")]
    Internal(String),
}

/// Failures decoding token claims locally
#[derive(Debug, Error)]
pub enum ClaimsError {
    /// Token is not three dot-separated segments
    #[error("error-rag-claims-1 Token is not a three part JWT")]
    MalformedToken,

    /// Payload segment is not base64url
    #[error("error-rag-claims-2 Token payload is not base64url: {0}")]
    InvalidEncoding(String),

    /// Payload segment is not a JSON object
    #[error("error-rag-claims-3 Token payload is not a JSON object: {0}")]
    InvalidPayload(String),
}

/// Failures of the inference endpoint calls
#[derive(Debug, Error)]
pub enum InferenceError {
    /// No API key configured
    #[error("error-rag-inference-1 HUGGINGFACE_API_KEY not set")]
    MissingApiKey,

    /// Could not reach the inference endpoint
    #[error("error-rag-inference-2 Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Inference call exceeded its timeout
    #[error("error-rag-inference-3 Request to inference API timed out")]
    GatewayTimeout,

    /// Inference endpoint answered with a non-200 status
    #[error("error-rag-inference-4 Inference failed with status {status}: {detail}")]
    Upstream { status: StatusCode, detail: String },

    /// Anything unclassified
    #[error("error-rag-inference-5 Internal error: {0}")]
    Internal(String),
}

/// Errors that cross the HTTP boundary.
///
/// Every variant renders as `{"detail": "..."}` with its status code. The
/// message of `Internal` is logged but never sent to the caller.
#[derive(Debug, Error)]
pub enum ApiError {
    /// 401
    #[error("error-rag-api-1 Unauthenticated: {0}")]
    Unauthenticated(String),

    /// 504
    #[error("error-rag-api-2 Gateway timeout: {0}")]
    GatewayTimeout(String),

    /// 503
    #[error("error-rag-api-3 Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Upstream status passed through to the caller
    #[error("error-rag-api-4 Upstream error {status}: {detail}")]
    Upstream { status: StatusCode, detail: String },

    /// 500, with a caller-safe detail and the internal cause
    #[error("error-rag-api-5 Internal error: {cause}")]
    Internal { detail: String, cause: String },

    /// Request body could not be decoded; 400, 415 or 422
    #[error("error-rag-api-6 Invalid request {status}: {detail}")]
    InvalidRequest { status: StatusCode, detail: String },
}

impl ApiError {
    /// Internal error with the generic detail.
    pub fn internal(cause: impl Into<String>) -> Self {
        Self::Internal {
            detail: "Internal server error".to_string(),
            cause: cause.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Upstream { status, .. } | Self::InvalidRequest { status, .. } => *status,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message placed in the response body.
    pub fn detail(&self) -> &str {
        match self {
            Self::Unauthenticated(detail)
            | Self::GatewayTimeout(detail)
            | Self::ServiceUnavailable(detail)
            | Self::Upstream { detail, .. }
            | Self::Internal { detail, .. }
            | Self::InvalidRequest { detail, .. } => detail,
        }
    }
}

impl From<IssuerError> for ApiError {
    fn from(error: IssuerError) -> Self {
        match error {
            IssuerError::Unauthenticated(detail) | IssuerError::InvalidOrExpiredToken(detail) => {
                Self::Unauthenticated(detail)
            }
            IssuerError::AuthenticationFailed { status, body } => Self::Upstream {
                status,
                detail: format!("Authentication failed: {body}"),
            },
            IssuerError::RefreshFailed { body, .. } => {
                Self::Unauthenticated(format!("Token refresh failed: {body}"))
            }
            IssuerError::GatewayTimeout(detail) => Self::GatewayTimeout(detail),
            IssuerError::Internal(cause) => Self::Internal {
                detail: "Token validation failed".to_string(),
                cause,
            },
        }
    }
}

impl ApiError {
    /// Maps a password grant failure. Unclassified failures carry the
    /// generic detail rather than the token validation one.
    pub fn from_login(error: IssuerError) -> Self {
        match error {
            IssuerError::Internal(cause) => Self::internal(cause),
            other => other.into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidRequest {
            status: rejection.status(),
            detail: rejection.body_text(),
        }
    }
}

impl From<FormRejection> for ApiError {
    fn from(rejection: FormRejection) -> Self {
        Self::InvalidRequest {
            status: rejection.status(),
            detail: rejection.body_text(),
        }
    }
}

impl From<InferenceError> for ApiError {
    fn from(error: InferenceError) -> Self {
        match error {
            InferenceError::MissingApiKey => Self::Internal {
                detail: "HUGGINGFACE_API_KEY not set".to_string(),
                cause: error.to_string(),
            },
            InferenceError::ServiceUnavailable(detail) => Self::ServiceUnavailable(detail),
            InferenceError::GatewayTimeout => {
                Self::GatewayTimeout("Request to inference API timed out".to_string())
            }
            InferenceError::Upstream { status, detail } => Self::Upstream { status, detail },
            InferenceError::Internal(cause) => Self::internal(cause),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }
        (status, Json(json!({ "detail": self.detail() }))).into_response()
    }
}
