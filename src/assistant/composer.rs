use crate::catalog::RecordJoiner;
use crate::core::errors::ApiError;
use crate::llm::{ChatMessage, LlmService, ModelTier};
use crate::rag::{Filters, Retriever};
use crate::session::{Artifact, ArtifactContent, Exchange};

use super::prompts;

/// Runs one exchange end to end and returns its finalized artifact.
#[derive(Clone)]
pub struct AnswerComposer {
    retriever: Retriever,
    joiner: RecordJoiner,
    llm: LlmService,
    gen_ed_resource: String,
}

impl AnswerComposer {
    pub fn new(
        retriever: Retriever,
        joiner: RecordJoiner,
        llm: LlmService,
        gen_ed_resource: impl Into<String>,
    ) -> Self {
        Self {
            retriever,
            joiner,
            llm,
            gen_ed_resource: gen_ed_resource.into(),
        }
    }

    pub async fn answer(
        &self,
        query: &str,
        history: &[ArtifactContent],
        filters: &Filters,
    ) -> Result<Artifact, ApiError> {
        self.answer_with_threshold(query, history, filters, None).await
    }

    /// Like [`answer`](Self::answer) with a one-off similarity threshold.
    pub async fn answer_with_threshold(
        &self,
        query: &str,
        history: &[ArtifactContent],
        filters: &Filters,
        threshold: Option<f32>,
    ) -> Result<Artifact, ApiError> {
        let prior_user_messages: Vec<String> = history
            .iter()
            .map(|exchange| exchange.query_message.clone())
            .collect();

        let retrieval = self
            .retriever
            .retrieve(query, filters, &prior_user_messages, threshold)
            .await?;
        let records = self.joiner.resolve(&retrieval.fragments).await?;

        let prompt = if records.is_empty() {
            prompts::no_context_prompt(query)
        } else {
            prompts::with_context_prompt(&records, query)?
        };

        let mut messages = Vec::with_capacity(history.len() * 2 + 2);
        messages.push(ChatMessage::system(prompts::system_role(&self.gen_ed_resource)));
        for exchange in history {
            if let (Some(prompt), Some(response)) =
                (exchange.latest_prompt(), exchange.latest_response())
            {
                messages.push(ChatMessage::user(prompt));
                messages.push(ChatMessage::assistant(response));
            }
        }
        messages.push(ChatMessage::user(prompt.clone()));

        let completion = self.llm.complete(ModelTier::Capable, messages).await?;

        let mut artifact = retrieval.artifact;
        let answer = completion.content.clone();
        artifact.append(Exchange::new(prompt, completion.raw, completion.content))?;
        artifact.set_references(records);
        artifact.finalize(answer)?;

        tracing::info!(
            "Answered query with {} references after {} completions",
            artifact.references().len(),
            artifact.exchanges().len()
        );
        Ok(artifact)
    }
}
