//! Test doubles for the pipeline's collaborators.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::catalog::{CourseCatalog, CourseRecord};
use crate::core::errors::ApiError;
use crate::llm::{ChatCompletion, ChatRequest, CompletionProvider, RetryPolicy};
use crate::rag::{ConstraintMap, RetrievedFragment, VectorIndex};

/// Three attempts with no waiting.
pub fn instant_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        min_wait: Duration::ZERO,
        max_wait: Duration::ZERO,
        multiplier: Duration::ZERO,
    }
}

pub fn fragment(id: &str, score: f32, course_id: &str) -> RetrievedFragment {
    RetrievedFragment {
        id: id.to_string(),
        score,
        metadata: json!({ "courseID": course_id, "courseTitle": format!("Course {course_id}") })
            .as_object()
            .cloned()
            .unwrap_or_default(),
    }
}

pub fn course(id: &str) -> CourseRecord {
    CourseRecord {
        course_id: id.to_string(),
        course_number: format!("CS {}", id.len() * 100),
        course_title: format!("Course {id}"),
        course_description: format!("Everything about {id}"),
        published_instructors: r#"["Ada Lovelace"]"#.to_string(),
        meetings: r#"[{"days": "MW"}]"#.to_string(),
    }
}

/// Replies from a fixed script, one entry per call. `Err` entries fail the
/// call with an upstream error.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<(ChatRequest, String)>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Result<String, String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Every request received, with the model it was sent to.
    pub fn requests(&self) -> Vec<(ChatRequest, String)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        request: ChatRequest,
        model_id: &str,
    ) -> Result<ChatCompletion, ApiError> {
        self.requests
            .lock()
            .unwrap()
            .push((request, model_id.to_string()));

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Ok(content)) => Ok(ChatCompletion {
                raw: json!({
                    "model": model_id,
                    "choices": [{ "message": { "role": "assistant", "content": content } }]
                })
                .to_string(),
                content,
            }),
            Some(Err(message)) => Err(ApiError::Upstream(message)),
            None => Err(ApiError::Upstream("script exhausted".to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IndexCall {
    pub collection: String,
    pub query_text: String,
    pub n_results: usize,
    pub filter: ConstraintMap,
}

/// Returns preset fragments (at most `n_results`) and records each query.
pub struct RecordingIndex {
    fragments: Vec<RetrievedFragment>,
    calls: Mutex<Vec<IndexCall>>,
}

impl RecordingIndex {
    pub fn new(fragments: Vec<RetrievedFragment>) -> Self {
        Self {
            fragments,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_call(&self) -> Option<IndexCall> {
        self.calls.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl VectorIndex for RecordingIndex {
    async fn query(
        &self,
        collection: &str,
        query_text: &str,
        n_results: usize,
        filter: &ConstraintMap,
    ) -> Result<Vec<RetrievedFragment>, ApiError> {
        self.calls.lock().unwrap().push(IndexCall {
            collection: collection.to_string(),
            query_text: query_text.to_string(),
            n_results,
            filter: filter.clone(),
        });
        Ok(self.fragments.iter().take(n_results).cloned().collect())
    }
}

/// Catalog holding rows for a fixed id set; records every lookup.
#[derive(Default)]
pub struct RecordingCatalog {
    rows: Vec<CourseRecord>,
    lookups: Mutex<Vec<Vec<String>>>,
}

impl RecordingCatalog {
    pub fn with_rows(ids: Vec<&str>) -> Self {
        Self {
            rows: ids.into_iter().map(course).collect(),
            lookups: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.lookups.lock().unwrap().len()
    }

    pub fn last_ids(&self) -> Vec<String> {
        self.lookups.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl CourseCatalog for RecordingCatalog {
    async fn lookup(&self, ids: &[String]) -> Result<Vec<CourseRecord>, ApiError> {
        self.lookups.lock().unwrap().push(ids.to_vec());
        Ok(self
            .rows
            .iter()
            .filter(|row| ids.contains(&row.course_id))
            .cloned()
            .collect())
    }
}
