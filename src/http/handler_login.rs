//! Handles POST /login - password grant against the identity provider

use axum::{
    Form, Json,
    extract::{State, rejection::FormRejection},
};
use axum_extra::extract::CookieJar;

use super::context::AppState;
use super::cookies::refresh_token_cookie;
use crate::errors::ApiError;
use crate::oauth::{Credentials, TokenSet};

/// Exchange form credentials for a token pair.
///
/// The provider's token payload is returned as-is and the refresh token is
/// also set as an HttpOnly cookie so the gate can refresh on the caller's
/// behalf later.
pub async fn handle_login(
    State(state): State<AppState>,
    jar: CookieJar,
    credentials: Result<Form<Credentials>, FormRejection>,
) -> Result<(CookieJar, Json<TokenSet>), ApiError> {
    let Form(credentials) = credentials?;
    tracing::info!(username = %credentials.username, "login attempt");

    let tokens = state
        .issuer
        .authenticate(&credentials)
        .await
        .map_err(ApiError::from_login)?;
    let cookie = refresh_token_cookie(
        &tokens.refresh_token,
        *state.config.refresh_cookie_max_age.as_ref(),
    );

    tracing::info!(username = %credentials.username, "login succeeded");
    Ok((jar.add(cookie), Json(tokens)))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::header::CONTENT_TYPE;
    use axum::http::{Request, StatusCode};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::http::build_router;
    use crate::http::context::{AppState, test_support::test_config};

    fn login_request(form: &'static str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/login")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_login_with_unreachable_provider() {
        // Nothing listens on the discard port, so the password grant cannot connect.
        let state = AppState::new(
            test_config("http://127.0.0.1:9", "http://127.0.0.1:9"),
            reqwest::Client::new(),
        );

        let response = build_router(state)
            .oneshot(login_request("username=alice&password=secret"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json_body(response).await,
            json!({ "detail": "Internal server error" })
        );
    }

    #[tokio::test]
    async fn test_login_with_incomplete_form() {
        let state = AppState::new(
            test_config("http://127.0.0.1:9", "http://127.0.0.1:9"),
            reqwest::Client::new(),
        );

        let response = build_router(state)
            .oneshot(login_request("username=alice"))
            .await
            .unwrap();

        assert!(response.status().is_client_error());
        let body = json_body(response).await;
        assert!(body["detail"].as_str().unwrap().contains("password"));
    }
}
