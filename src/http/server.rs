//! Main router configuration assembling the login, inference and documentation routes.

use axum::{
    Router,
    http::{HeaderValue, header::AUTHORIZATION},
    middleware,
    routing::{get, post},
};
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use super::{
    context::AppState,
    handler_docs::{handle_openapi, handle_redoc, handle_swagger_ui},
    handler_generate::{handle_generate, handle_generate_stream},
    handler_login::handle_login,
    handler_predict::handle_predict,
    middleware_auth::auth_gate,
};
use crate::config::AllowedOrigins;

/// Build the application router
pub fn build_router(ctx: AppState) -> Router {
    let cors = cors_layer(&ctx.config.cors_allowed_origins);

    Router::new()
        .route("/login", post(handle_login))
        .route("/predict", post(handle_predict))
        .route("/generate", post(handle_generate))
        .route("/generate/stream", post(handle_generate_stream))
        .route("/openapi.json", get(handle_openapi))
        .route("/docs", get(handle_swagger_ui))
        .route("/redoc", get(handle_redoc))
        .layer(middleware::from_fn_with_state(ctx.clone(), auth_gate))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

/// Credentialed CORS. An empty origin list reflects the caller's origin.
fn cors_layer(origins: &AllowedOrigins) -> CorsLayer {
    let allow_origin = if origins.as_ref().is_empty() {
        AllowOrigin::mirror_request()
    } else {
        let origins: Vec<HeaderValue> = origins
            .as_ref()
            .iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(error) => {
                    tracing::warn!(origin, ?error, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
        .expose_headers([AUTHORIZATION])
}
