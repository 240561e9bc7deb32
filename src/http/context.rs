//! Application state shared by every request.

use std::sync::Arc;

use crate::config::Config;
use crate::inference::InferenceClient;
use crate::oauth::{KeycloakClient, TokenIssuer};

/// Immutable after startup; cloned into each request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Identity provider used by `/login` and the authentication gate
    pub issuer: Arc<dyn TokenIssuer>,
    pub inference: Arc<InferenceClient>,
}

impl AppState {
    /// Wires the production clients around one shared HTTP connection pool.
    pub fn new(config: Config, http_client: reqwest::Client) -> Self {
        let issuer = Arc::new(KeycloakClient::new(
            http_client.clone(),
            config.issuer.clone(),
        ));
        let inference = Arc::new(InferenceClient::new(
            http_client,
            config.inference.clone(),
        ));
        Self {
            config: Arc::new(config),
            issuer,
            inference,
        }
    }

    /// Replaces the identity provider client.
    pub fn with_issuer(mut self, issuer: Arc<dyn TokenIssuer>) -> Self {
        self.issuer = issuer;
        self
    }
}
