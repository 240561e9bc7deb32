//! Request bodies accepted by the inference routes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of `POST /predict`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRequest {
    pub input_text: String,
}

/// Body of `POST /generate` and `POST /generate/stream`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub input_text: String,
    pub prediction_data: Map<String, Value>,
}
