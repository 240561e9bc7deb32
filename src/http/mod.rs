//! Axum HTTP server: routes, handlers and the authentication gate.

pub mod context;
mod cookies;
mod handler_docs;
mod handler_generate;
mod handler_login;
mod handler_predict;
pub mod middleware_auth;
pub mod server;

pub use context::AppState;
pub use middleware_auth::{AuthDecision, auth_gate, evaluate};
pub use server::build_router;
