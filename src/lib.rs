//! RAG API library crate.
//!
//! Login against an OpenID Connect identity provider, a bearer token gate
//! that refreshes expired tokens from a cookie, and text inference routes
//! backed by a hosted model endpoint.

pub mod config;
pub mod errors;
pub mod http;
pub mod inference;
pub mod oauth;
