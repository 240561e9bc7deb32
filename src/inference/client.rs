//! Client for the text inference endpoint.
//!
//! `predict` is one blocking call. `generate` performs the same call and
//! hands the result back as a stream of chunks. `generate_stream` relays the
//! upstream body byte for byte while it arrives.

use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use http::StatusCode;
use serde_json::{Value, json};

use crate::config::InferenceConfig;
use crate::errors::InferenceError;

/// Stream of JSON chunks produced by [`InferenceClient::generate`]
pub type ChunkStream = BoxStream<'static, Value>;

/// Stream of raw upstream bytes produced by [`InferenceClient::generate_stream`]
pub type ByteStream = BoxStream<'static, Result<Bytes, InferenceError>>;

pub struct InferenceClient {
    http_client: reqwest::Client,
    config: InferenceConfig,
    model_url: String,
}

impl InferenceClient {
    pub fn new(http_client: reqwest::Client, config: InferenceConfig) -> Self {
        if config.api_key.is_none() {
            tracing::warn!("HUGGINGFACE_API_KEY not set, inference calls will fail");
        }
        let model_url = config.model_url();
        Self {
            http_client,
            config,
            model_url,
        }
    }

    fn api_key(&self) -> Result<&str, InferenceError> {
        self.config.api_key.as_deref().ok_or_else(|| {
            tracing::error!("HUGGINGFACE_API_KEY not set");
            InferenceError::MissingApiKey
        })
    }

    /// Bounds `work` by the configured inference timeout.
    async fn within<T>(
        &self,
        operation: &str,
        work: impl Future<Output = Result<T, InferenceError>>,
    ) -> Result<T, InferenceError> {
        match tokio::time::timeout(*self.config.timeout.as_ref(), work).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(operation, "request to inference API timed out");
                Err(InferenceError::GatewayTimeout)
            }
        }
    }

    /// Sends `body` to the model and returns the response once its status is 200.
    async fn send(&self, body: &Value, operation: &str) -> Result<reqwest::Response, InferenceError> {
        let api_key = self.api_key()?;

        tracing::info!(url = %self.model_url, operation, "sending inference request");

        let response = self
            .http_client
            .post(&self.model_url)
            .bearer_auth(api_key)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        tracing::info!(%status, operation, "inference response");

        if status != StatusCode::OK {
            let text = response.text().await.unwrap_or_default();
            let detail = format!("{operation} failed with status {}: {text}", status.as_u16());
            tracing::error!(%status, %detail, "inference request failed");
            return Err(InferenceError::Upstream { status, detail });
        }

        Ok(response)
    }

    /// Sends `body` and decodes the JSON result, all within the timeout.
    async fn fetch_json(&self, body: &Value, operation: &str) -> Result<Value, InferenceError> {
        self.within(operation, async {
            let response = self.send(body, operation).await?;
            response.json::<Value>().await.map_err(body_error)
        })
        .await
    }

    /// Runs the model once on `input_text` and returns its JSON result.
    pub async fn predict(&self, input_text: &str) -> Result<Value, InferenceError> {
        let result = self
            .fetch_json(&json!({ "inputs": input_text }), "Prediction")
            .await?;
        tracing::info!("prediction processed");
        Ok(result)
    }

    /// Runs the model on `input_text` and returns the result as chunks.
    ///
    /// The upstream call completes before this returns, so every failure is
    /// reported before the first chunk. A JSON array result yields one chunk
    /// per element; anything else is a single chunk.
    pub async fn generate(&self, input_text: &str) -> Result<ChunkStream, InferenceError> {
        let result = self
            .fetch_json(&json!({ "inputs": input_text }), "Generation")
            .await?;
        tracing::info!("generation processed");

        let chunks = match result {
            Value::Array(items) => items,
            other => vec![other],
        };
        Ok(stream::iter(chunks).boxed())
    }

    /// Opens a streaming generation and relays the upstream body as it arrives.
    ///
    /// A non-200 status is reported before any byte. The timeout covers the
    /// wait for response headers only, so long streamed bodies are not cut
    /// off. A transport failure after that ends the stream with an error
    /// item. Dropping the stream drops the upstream response and stops
    /// reading from it.
    pub async fn generate_stream(
        &self,
        input_text: &str,
        context: &serde_json::Map<String, Value>,
    ) -> Result<ByteStream, InferenceError> {
        let body = json!({
            "inputs": input_text,
            "parameters": { "stream": true },
            "context": context,
        });
        let response = self
            .within("Generation", self.send(&body, "Generation"))
            .await?;

        let relay = response.bytes_stream().map(|chunk| {
            chunk.map_err(|error| {
                tracing::error!(?error, "inference stream interrupted");
                InferenceError::ServiceUnavailable(format!("Inference stream interrupted: {error}"))
            })
        });
        Ok(relay.boxed())
    }
}

fn transport_error(error: reqwest::Error) -> InferenceError {
    if error.is_connect() {
        tracing::error!(?error, "failed to connect to inference API");
        InferenceError::ServiceUnavailable(format!("Failed to connect to inference API: {error}"))
    } else if error.is_timeout() {
        tracing::error!(?error, "request to inference API timed out");
        InferenceError::GatewayTimeout
    } else {
        tracing::error!(?error, "request to inference API failed");
        InferenceError::ServiceUnavailable(format!("Request to inference API failed: {error}"))
    }
}

fn body_error(error: reqwest::Error) -> InferenceError {
    if error.is_timeout() {
        return InferenceError::GatewayTimeout;
    }
    tracing::error!(?error, "unreadable inference response");
    InferenceError::Internal(format!("Unreadable inference response: {error}"))
}
