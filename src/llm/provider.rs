use async_trait::async_trait;

use super::types::{ChatCompletion, ChatRequest};
use crate::core::errors::ApiError;

/// The "complete chat" capability the pipeline relies on.
///
/// Implementations may fail transiently; callers wrap them in
/// [`RetryingProvider`](super::retry::RetryingProvider).
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// return the provider name (e.g. "openai")
    fn name(&self) -> &str;

    /// chat completion (non-streaming)
    async fn complete(&self, request: ChatRequest, model_id: &str)
        -> Result<ChatCompletion, ApiError>;
}

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// generate one embedding per input, in input order
    async fn embed(&self, inputs: &[String], model_id: &str) -> Result<Vec<Vec<f32>>, ApiError>;
}
