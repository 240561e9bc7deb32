//! Refresh token cookie handling.

use std::time::Duration;

use axum::http::HeaderMap;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::config::REFRESH_TOKEN_COOKIE;

/// Refresh token cookie: never readable by scripts, HTTPS only, never sent cross-site.
pub(crate) fn refresh_token_cookie(refresh_token: &str, max_age: Duration) -> Cookie<'static> {
    let max_age = time::Duration::seconds(i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX));

    Cookie::build((REFRESH_TOKEN_COOKIE, refresh_token.to_string()))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(max_age)
        .build()
}

/// Refresh token sent by the client, if any.
pub(crate) fn refresh_token_from(headers: &HeaderMap) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(REFRESH_TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::COOKIE;

    #[test]
    fn test_refresh_cookie_flags() {
        let rendered = refresh_token_cookie("rt-123", Duration::from_secs(1800)).to_string();

        assert!(rendered.starts_with("refresh_token=rt-123"));
        assert!(rendered.contains("HttpOnly"));
        assert!(rendered.contains("Secure"));
        assert!(rendered.contains("SameSite=Strict"));
        assert!(rendered.contains("Path=/"));
        assert!(rendered.contains("Max-Age=1800"));
    }

    #[test]
    fn test_refresh_token_from_headers() {
        let mut headers = HeaderMap::new();
        assert_eq!(refresh_token_from(&headers), None);

        headers.insert(COOKIE, "theme=dark; refresh_token=rt-123".parse().unwrap());
        assert_eq!(refresh_token_from(&headers), Some("rt-123".to_string()));

        headers.insert(COOKIE, "refresh_token=".parse().unwrap());
        assert_eq!(refresh_token_from(&headers), None);
    }
}
