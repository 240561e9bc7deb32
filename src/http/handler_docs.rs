//! Handles GET /openapi.json, GET /docs and GET /redoc

use axum::{
    extract::State,
    response::{Html, Json},
};
use serde_json::{Value, json};

use super::context::AppState;

const SWAGGER_UI_PAGE: &str = r##"<!DOCTYPE html>
<html>
<head>
<title>RAG API - Swagger UI</title>
<link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/swagger-ui-dist@5/swagger-ui.css">
</head>
<body>
<div id="swagger-ui"></div>
<script src="https://cdn.jsdelivr.net/npm/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
<script>
SwaggerUIBundle({ url: "/openapi.json", dom_id: "#swagger-ui" });
</script>
</body>
</html>
"##;

const REDOC_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
<title>RAG API - ReDoc</title>
<meta charset="utf-8"/>
</head>
<body>
<redoc spec-url="/openapi.json"></redoc>
<script src="https://cdn.jsdelivr.net/npm/redoc@2/bundles/redoc.standalone.js"></script>
</body>
</html>
"#;

/// OpenAPI 3 description of the public routes
pub async fn handle_openapi(State(state): State<AppState>) -> Json<Value> {
    Json(openapi_document(&state.config.version))
}

pub async fn handle_swagger_ui() -> Html<&'static str> {
    Html(SWAGGER_UI_PAGE)
}

pub async fn handle_redoc() -> Html<&'static str> {
    Html(REDOC_PAGE)
}

fn error_response(description: &str) -> Value {
    json!({
        "description": description,
        "content": {
            "application/json": { "schema": { "$ref": "#/components/schemas/ErrorDetail" } }
        }
    })
}

pub(crate) fn openapi_document(version: &str) -> Value {
    let unauthorized = error_response("Missing, malformed or expired token");
    let generate_body = json!({
        "required": true,
        "content": {
            "application/json": { "schema": { "$ref": "#/components/schemas/GenerateRequest" } }
        }
    });

    let login = json!({
        "summary": "Exchange username and password for a token pair",
        "requestBody": {
            "required": true,
            "content": {
                "application/x-www-form-urlencoded": {
                    "schema": {
                        "type": "object",
                        "required": ["username", "password"],
                        "properties": {
                            "username": { "type": "string" },
                            "password": { "type": "string", "format": "password" }
                        }
                    }
                }
            }
        },
        "responses": {
            "200": {
                "description": "Token payload from the identity provider; the refresh token is also set as an HttpOnly cookie",
                "content": { "application/json": { "schema": { "type": "object" } } }
            },
            "504": error_response("Identity provider timed out"),
            "500": error_response("Internal server error")
        }
    });

    let predict = json!({
        "summary": "Run the model once",
        "security": [{ "bearerAuth": [] }],
        "requestBody": {
            "required": true,
            "content": {
                "application/json": { "schema": { "$ref": "#/components/schemas/PredictRequest" } }
            }
        },
        "responses": {
            "200": {
                "description": "Inference result",
                "content": { "application/json": { "schema": {} } }
            },
            "401": unauthorized.clone(),
            "503": error_response("Inference endpoint unreachable"),
            "504": error_response("Inference endpoint timed out")
        }
    });

    let generate = json!({
        "summary": "Generate text as newline-delimited JSON",
        "security": [{ "bearerAuth": [] }],
        "requestBody": generate_body.clone(),
        "responses": {
            "200": {
                "description": "One JSON value per line",
                "content": { "application/x-ndjson": { "schema": { "type": "string" } } }
            },
            "401": unauthorized.clone()
        }
    });

    let generate_stream = json!({
        "summary": "Relay a streaming generation as server-sent events",
        "security": [{ "bearerAuth": [] }],
        "requestBody": generate_body,
        "responses": {
            "200": {
                "description": "Upstream event stream",
                "content": { "text/event-stream": { "schema": { "type": "string" } } }
            },
            "401": unauthorized
        }
    });

    let schemas = json!({
        "ErrorDetail": {
            "type": "object",
            "required": ["detail"],
            "properties": { "detail": { "type": "string" } }
        },
        "PredictRequest": {
            "type": "object",
            "required": ["input_text"],
            "properties": { "input_text": { "type": "string" } }
        },
        "GenerateRequest": {
            "type": "object",
            "required": ["input_text", "prediction_data"],
            "properties": {
                "input_text": { "type": "string" },
                "prediction_data": { "type": "object" }
            }
        }
    });

    json!({
        "openapi": "3.0.3",
        "info": { "title": "RAG API", "version": version },
        "paths": {
            "/login": { "post": login },
            "/predict": { "post": predict },
            "/generate": { "post": generate },
            "/generate/stream": { "post": generate_stream }
        },
        "components": {
            "securitySchemes": {
                "bearerAuth": { "type": "http", "scheme": "bearer", "bearerFormat": "JWT" }
            },
            "schemas": schemas
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_document_lists_routes() {
        let document = openapi_document("1.2.3");

        assert_eq!(document["info"]["version"], "1.2.3");
        for path in ["/login", "/predict", "/generate", "/generate/stream"] {
            assert!(document["paths"][path]["post"].is_object(), "{path}");
        }
        assert!(document["paths"]["/login"]["post"]["security"].is_null());
        assert!(document["paths"]["/predict"]["post"]["security"].is_array());
    }

    #[test]
    fn test_documentation_pages_point_at_openapi_document() {
        assert!(SWAGGER_UI_PAGE.contains(r##"dom_id: "#swagger-ui""##));
        assert!(SWAGGER_UI_PAGE.contains(r#"url: "/openapi.json""#));
        assert!(SWAGGER_UI_PAGE.trim_end().ends_with("</html>"));
        assert!(REDOC_PAGE.contains(r#"spec-url="/openapi.json""#));
    }
}
