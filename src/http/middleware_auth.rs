//! Authentication gate applied to every route.
//!
//! Requests to exempt paths pass straight through. Everything else needs an
//! `Authorization: Bearer <token>` header that the identity provider accepts.
//! When the provider rejects a token that carries an `exp` claim, the gate
//! tries the `refresh_token` cookie exactly once. On success the request is
//! forwarded with the new access token and the response carries the new
//! token pair back to the caller.

use axum::extract::{Request, State};
use axum::http::header::{AUTHORIZATION, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::config::ExemptPaths;
use crate::errors::{ApiError, IssuerError};
use crate::http::context::AppState;
use crate::http::cookies::{refresh_token_cookie, refresh_token_from};
use crate::oauth::{TokenIssuer, TokenSet, UnverifiedClaims, UserInfo};

/// Outcome of checking one request.
#[derive(Debug)]
pub enum AuthDecision {
    /// Path is exempt; forward untouched
    Exempt,
    /// Token accepted; forward with the caller's claims attached
    Authorized(UserInfo),
    /// Token expired and was refreshed; forward with the new access token
    RefreshedAndRetried(TokenSet),
    /// Answer with this error instead of calling the handler
    Rejected(ApiError),
}

/// Decides what happens to a request for `path` carrying `headers`.
///
/// The provider's refresh grant is called at most once per request.
pub async fn evaluate(
    issuer: &dyn TokenIssuer,
    exempt_paths: &ExemptPaths,
    path: &str,
    headers: &HeaderMap,
) -> AuthDecision {
    if exempt_paths.contains(path) {
        return AuthDecision::Exempt;
    }

    let Some(header) = headers.get(AUTHORIZATION) else {
        return AuthDecision::Rejected(ApiError::Unauthenticated(
            "Missing authorization header".to_string(),
        ));
    };

    let Some(token) = header
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "))
    else {
        return AuthDecision::Rejected(ApiError::Unauthenticated(
            "Invalid authorization header format. Expected 'Bearer <token>'".to_string(),
        ));
    };

    match issuer.validate(token).await {
        Ok(user) => {
            tracing::debug!(sub = %user.sub, path, "token accepted");
            AuthDecision::Authorized(user)
        }
        Err(IssuerError::InvalidOrExpiredToken(reason)) => {
            try_refresh(issuer, token, headers, reason).await
        }
        Err(error) => AuthDecision::Rejected(error.into()),
    }
}

async fn try_refresh(
    issuer: &dyn TokenIssuer,
    token: &str,
    headers: &HeaderMap,
    reason: String,
) -> AuthDecision {
    let claims = match UnverifiedClaims::decode(token) {
        Ok(claims) => claims,
        Err(error) => {
            tracing::warn!(?error, "rejected token is not a decodable JWT");
            return AuthDecision::Rejected(ApiError::Unauthenticated(
                "Invalid token format".to_string(),
            ));
        }
    };

    // Only tokens that can expire are worth refreshing.
    if !claims.has_expiry() {
        return AuthDecision::Rejected(ApiError::Unauthenticated(reason));
    }

    tracing::info!(
        sub = claims.subject().unwrap_or("unknown"),
        expires_at = ?claims.expires_at(),
        "token rejected, attempting refresh"
    );

    let Some(refresh_token) = refresh_token_from(headers) else {
        return AuthDecision::Rejected(ApiError::Unauthenticated(
            "Token expired and no refresh token available".to_string(),
        ));
    };

    match issuer.refresh(&refresh_token).await {
        Ok(tokens) => {
            tracing::info!("token refreshed");
            AuthDecision::RefreshedAndRetried(tokens)
        }
        Err(error) => {
            tracing::error!(?error, "token refresh failed");
            AuthDecision::Rejected(ApiError::Unauthenticated(
                "Token expired and refresh failed".to_string(),
            ))
        }
    }
}

/// Middleware entry point; see the module docs.
pub async fn auth_gate(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let decision = evaluate(
        state.issuer.as_ref(),
        &state.config.auth_exempt_paths,
        request.uri().path(),
        request.headers(),
    )
    .await;

    match decision {
        AuthDecision::Exempt => next.run(request).await,
        AuthDecision::Authorized(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        AuthDecision::RefreshedAndRetried(tokens) => {
            let cookie = refresh_token_cookie(
                &tokens.refresh_token,
                *state.config.refresh_cookie_max_age.as_ref(),
            );
            let (bearer, cookie) = match (
                HeaderValue::from_str(&format!("Bearer {}", tokens.access_token)),
                HeaderValue::from_str(&cookie.to_string()),
            ) {
                (Ok(bearer), Ok(cookie)) => (bearer, cookie),
                _ => {
                    return ApiError::internal("refreshed tokens are not valid header values")
                        .into_response();
                }
            };

            request.headers_mut().insert(AUTHORIZATION, bearer.clone());
            let mut response = next.run(request).await;

            // Attached whatever the handler answered.
            response.headers_mut().insert(AUTHORIZATION, bearer);
            response.headers_mut().append(SET_COOKIE, cookie);
            response
        }
        AuthDecision::Rejected(error) => error.into_response(),
    }
}
