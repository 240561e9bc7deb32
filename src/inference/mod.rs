//! Text inference: the outbound client and the request bodies of the inference routes.

pub mod client;
pub mod types;

pub use client::{ByteStream, ChunkStream, InferenceClient};
pub use types::{GenerateRequest, PredictRequest};
