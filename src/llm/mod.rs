pub mod openai;
pub mod provider;
pub mod retry;
pub mod service;
pub mod types;

pub use openai::OpenAiProvider;
pub use provider::{CompletionProvider, EmbeddingProvider};
pub use retry::{RetryPolicy, RetryingProvider};
pub use service::LlmService;
pub use types::{ChatCompletion, ChatMessage, ChatRequest, ModelTier};
