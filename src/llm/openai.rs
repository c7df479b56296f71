use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::provider::{CompletionProvider, EmbeddingProvider};
use super::types::{ChatCompletion, ChatRequest};
use crate::core::errors::ApiError;

/// OpenAI-compatible chat and embedding client.
#[derive(Clone)]
pub struct OpenAiProvider {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(
        base_url: String,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::internal)?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    fn post(&self, url: &str) -> reqwest::RequestBuilder {
        let builder = self.client.post(url);
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

fn chat_body(request: &ChatRequest, model_id: &str) -> Value {
    let mut body = json!({
        "model": model_id,
        "messages": request.messages,
        "stream": false,
    });

    if let Some(obj) = body.as_object_mut() {
        if let Some(t) = request.temperature { obj.insert("temperature".to_string(), json!(t)); }
        if let Some(u) = &request.user { obj.insert("user".to_string(), json!(u)); }
    }

    body
}

/// Keeps the provider body verbatim and pulls out the first choice's text.
fn completion_from_body(raw: String) -> Result<ChatCompletion, ApiError> {
    let payload: Value = serde_json::from_str(&raw)
        .map_err(|e| ApiError::upstream(format!("Malformed completion body: {}", e)))?;

    let content = payload["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| ApiError::upstream("Completion body has no message content"))?
        .to_string();

    Ok(ChatCompletion { raw, content })
}

fn embeddings_from_body(payload: &Value) -> Vec<Vec<f32>> {
    let mut embeddings = Vec::new();
    if let Some(data) = payload["data"].as_array() {
        for item in data {
            if let Some(vals) = item["embedding"].as_array() {
                let vec: Vec<f32> = vals.iter().filter_map(|v| v.as_f64().map(|f| f as f32)).collect();
                embeddings.push(vec);
            }
        }
    }
    embeddings
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(
        &self,
        request: ChatRequest,
        model_id: &str,
    ) -> Result<ChatCompletion, ApiError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = chat_body(&request, model_id);

        let res = self.post(&url)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::upstream)?;

        let status = res.status();
        let text = res.text().await.map_err(ApiError::upstream)?;
        if !status.is_success() {
            return Err(ApiError::Upstream(format!(
                "OpenAI chat error ({}): {}",
                status, text
            )));
        }

        completion_from_body(text)
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    async fn embed(&self, inputs: &[String], model_id: &str) -> Result<Vec<Vec<f32>>, ApiError> {
        let url = format!("{}/v1/embeddings", self.base_url);

        let body = json!({
            "model": model_id,
            "input": inputs,
        });

        let res = self.post(&url)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::upstream)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!(
                "OpenAI embed error ({}): {}",
                status, text
            )));
        }

        let payload: Value = res.json().await.map_err(ApiError::upstream)?;
        let embeddings = embeddings_from_body(&payload);
        if embeddings.len() != inputs.len() {
            return Err(ApiError::Upstream(format!(
                "Expected {} embeddings, got {}",
                inputs.len(),
                embeddings.len()
            )));
        }

        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::ChatMessage;

    #[test]
    fn chat_body_carries_sampling_options() {
        let request = ChatRequest::new(vec![ChatMessage::user("hi")])
            .deterministic()
            .with_user("anon");

        let body = chat_body(&request, "gpt-4-turbo");

        assert_eq!(body["model"], "gpt-4-turbo");
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["user"], "anon");
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[test]
    fn chat_body_sends_only_known_fields() {
        let request = ChatRequest::new(vec![ChatMessage::user("hi")])
            .deterministic()
            .with_user("anon");

        let body = chat_body(&request, "gpt-4-turbo");

        let mut keys: Vec<&str> = body
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["messages", "model", "stream", "temperature", "user"]);
    }

    #[test]
    fn completion_keeps_raw_body_and_extracts_content() {
        let raw = r#"{"id":"chatcmpl-1","choices":[{"index":0,"message":{"role":"assistant","content":"CS 201 covers graphs."}}]}"#;

        let completion = completion_from_body(raw.to_string()).unwrap();

        assert_eq!(completion.content, "CS 201 covers graphs.");
        assert_eq!(completion.raw, raw);
    }

    #[test]
    fn completion_without_content_is_upstream_error() {
        let err = completion_from_body(r#"{"choices":[]}"#.to_string()).unwrap_err();
        assert!(matches!(err, ApiError::Upstream(_)));

        let err = completion_from_body("<html>gateway timeout</html>".to_string()).unwrap_err();
        assert!(matches!(err, ApiError::Upstream(_)));
    }

    #[test]
    fn embeddings_are_read_in_order() {
        let payload = json!({
            "data": [
                { "index": 0, "embedding": [0.5, 0.25] },
                { "index": 1, "embedding": [1.0, 0.0] }
            ]
        });

        let embeddings = embeddings_from_body(&payload);

        assert_eq!(embeddings, vec![vec![0.5, 0.25], vec![1.0, 0.0]]);
    }
}
