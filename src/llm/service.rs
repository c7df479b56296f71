use std::sync::Arc;

use crate::core::config::settings::LlmSettings;
use crate::core::errors::ApiError;
use crate::llm::provider::CompletionProvider;
use crate::llm::retry::{RetryPolicy, RetryingProvider};
use crate::llm::types::{ChatCompletion, ChatMessage, ChatRequest, ModelTier};

/// End-user tag sent with every request; exchanges are anonymous.
const ANONYMOUS_USER: &str = "anon";

/// Completion entry point for the pipeline.
///
/// Every call goes through the retry wrapper and runs at temperature 0 on the
/// model selected by its [`ModelTier`].
#[derive(Clone)]
pub struct LlmService {
    provider: Arc<RetryingProvider>,
    keyword_model: String,
    answer_model: String,
}

impl LlmService {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        policy: RetryPolicy,
        keyword_model: impl Into<String>,
        answer_model: impl Into<String>,
    ) -> Self {
        Self {
            provider: Arc::new(RetryingProvider::new(provider, policy)),
            keyword_model: keyword_model.into(),
            answer_model: answer_model.into(),
        }
    }

    pub fn from_settings(
        provider: Arc<dyn CompletionProvider>,
        policy: RetryPolicy,
        settings: &LlmSettings,
    ) -> Self {
        Self::new(
            provider,
            policy,
            settings.keyword_model.clone(),
            settings.answer_model.clone(),
        )
    }

    pub fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Fast => &self.keyword_model,
            ModelTier::Capable => &self.answer_model,
        }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        self.provider.policy()
    }

    pub async fn complete(
        &self,
        tier: ModelTier,
        messages: Vec<ChatMessage>,
    ) -> Result<ChatCompletion, ApiError> {
        let model = self.model_for(tier);
        tracing::debug!("Requesting completion from {} ({} messages)", model, messages.len());

        let request = ChatRequest::new(messages)
            .deterministic()
            .with_user(ANONYMOUS_USER);
        self.provider.complete(request, model).await
    }
}
