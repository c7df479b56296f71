//! Per-exchange audit record.
//!
//! An [`Artifact`] owns every prompt sent to the model during one user
//! exchange together with what came back. Prompts and responses are stored as
//! pairs, so the transport arrays in [`ArtifactContent`] line up by
//! construction.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::CourseRecord;
use crate::core::errors::ApiError;

#[derive(Debug, Error, PartialEq)]
pub enum ArtifactError {
    #[error("artifact answer is already set")]
    AlreadyFinalized,
    #[error("artifact is finalized; no further exchanges can be appended")]
    Finalized,
    #[error(
        "misaligned artifact content: {prompts} prompts, {objects} response objects, {contents} response contents"
    )]
    Misaligned {
        prompts: usize,
        objects: usize,
        contents: usize,
    },
}

impl From<ArtifactError> for ApiError {
    fn from(err: ArtifactError) -> Self {
        match err {
            ArtifactError::Misaligned { .. } => ApiError::BadRequest(err.to_string()),
            other => ApiError::internal(other),
        }
    }
}

/// One prompt and the model's reply to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Exchange {
    pub prompt: String,
    /// Raw serialized provider response.
    pub response_object: String,
    pub response_content: String,
}

impl Exchange {
    pub fn new(
        prompt: impl Into<String>,
        response_object: impl Into<String>,
        response_content: impl Into<String>,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            response_object: response_object.into(),
            response_content: response_content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    query_message: String,
    exchanges: Vec<Exchange>,
    references: Vec<CourseRecord>,
    answer: Option<String>,
}

impl Artifact {
    pub fn new(query_message: impl Into<String>) -> Self {
        Self {
            query_message: query_message.into(),
            exchanges: Vec::new(),
            references: Vec::new(),
            answer: None,
        }
    }

    pub fn query_message(&self) -> &str {
        &self.query_message
    }

    pub fn exchanges(&self) -> &[Exchange] {
        &self.exchanges
    }

    pub fn append(&mut self, exchange: Exchange) -> Result<(), ArtifactError> {
        if self.answer.is_some() {
            return Err(ArtifactError::Finalized);
        }
        self.exchanges.push(exchange);
        Ok(())
    }

    pub fn latest_prompt(&self) -> Option<&str> {
        self.exchanges.last().map(|e| e.prompt.as_str())
    }

    pub fn latest_response(&self) -> Option<&str> {
        self.exchanges.last().map(|e| e.response_content.as_str())
    }

    pub fn references(&self) -> &[CourseRecord] {
        &self.references
    }

    pub fn set_references(&mut self, references: Vec<CourseRecord>) {
        self.references = references;
    }

    pub fn answer(&self) -> Option<&str> {
        self.answer.as_deref()
    }

    pub fn is_finalized(&self) -> bool {
        self.answer.is_some()
    }

    /// Sets the user-facing answer. Allowed once, after the last exchange.
    pub fn finalize(&mut self, answer: impl Into<String>) -> Result<(), ArtifactError> {
        if self.answer.is_some() {
            return Err(ArtifactError::AlreadyFinalized);
        }
        self.answer = Some(answer.into());
        Ok(())
    }

    pub fn to_content(&self) -> ArtifactContent {
        ArtifactContent {
            query_message: self.query_message.clone(),
            prompts: self.exchanges.iter().map(|e| e.prompt.clone()).collect(),
            response_objects: self
                .exchanges
                .iter()
                .map(|e| e.response_object.clone())
                .collect(),
            response_contents: self
                .exchanges
                .iter()
                .map(|e| e.response_content.clone())
                .collect(),
            references: self.references.clone(),
            answer: self.answer.clone().unwrap_or_default(),
            finalized: self.answer.is_some(),
        }
    }
}

/// Transport projection of an [`Artifact`], as exchanged with clients and
/// stored in session history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtifactContent {
    pub query_message: String,
    #[serde(default)]
    pub prompts: Vec<String>,
    #[serde(default)]
    pub response_objects: Vec<String>,
    #[serde(default)]
    pub response_contents: Vec<String>,
    #[serde(default)]
    pub references: Vec<CourseRecord>,
    #[serde(default)]
    pub answer: String,
    /// Distinguishes an empty final answer from no answer. Older payloads
    /// without it count as finalized when `answer` is non-empty.
    #[serde(default)]
    pub finalized: bool,
}

impl ArtifactContent {
    pub fn latest_prompt(&self) -> Option<&str> {
        self.prompts.last().map(String::as_str)
    }

    pub fn latest_response(&self) -> Option<&str> {
        self.response_contents.last().map(String::as_str)
    }
}

impl From<&Artifact> for ArtifactContent {
    fn from(artifact: &Artifact) -> Self {
        artifact.to_content()
    }
}

impl TryFrom<ArtifactContent> for Artifact {
    type Error = ArtifactError;

    fn try_from(content: ArtifactContent) -> Result<Self, Self::Error> {
        let (prompts, objects, contents) = (
            content.prompts.len(),
            content.response_objects.len(),
            content.response_contents.len(),
        );
        if prompts != objects || prompts != contents {
            return Err(ArtifactError::Misaligned {
                prompts,
                objects,
                contents,
            });
        }

        let exchanges = content
            .prompts
            .into_iter()
            .zip(content.response_objects)
            .zip(content.response_contents)
            .map(|((prompt, response_object), response_content)| Exchange {
                prompt,
                response_object,
                response_content,
            })
            .collect();

        Ok(Self {
            query_message: content.query_message,
            exchanges,
            references: content.references,
            answer: (content.finalized || !content.answer.is_empty()).then_some(content.answer),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> CourseRecord {
        CourseRecord {
            course_id: id.to_string(),
            course_number: "CS 101".to_string(),
            course_title: "Intro".to_string(),
            course_description: "Basics".to_string(),
            published_instructors: "Ada".to_string(),
            meetings: "MWF".to_string(),
        }
    }

    #[test]
    fn appends_keep_arrays_aligned() {
        let mut artifact = Artifact::new("stats courses?");
        for i in 0..4 {
            artifact
                .append(Exchange::new(format!("p{i}"), format!("{{\"n\":{i}}}"), format!("c{i}")))
                .unwrap();
            let content = artifact.to_content();
            assert_eq!(content.prompts.len(), i + 1);
            assert_eq!(content.prompts.len(), content.response_objects.len());
            assert_eq!(content.prompts.len(), content.response_contents.len());
        }
        assert_eq!(artifact.latest_prompt(), Some("p3"));
        assert_eq!(artifact.latest_response(), Some("c3"));
    }

    #[test]
    fn answer_is_set_once_and_closes_the_log() {
        let mut artifact = Artifact::new("hi");
        artifact.append(Exchange::new("p", "{}", "c")).unwrap();
        assert_eq!(artifact.to_content().answer, "");

        artifact.finalize("hello").unwrap();
        assert_eq!(artifact.finalize("again"), Err(ArtifactError::AlreadyFinalized));
        assert_eq!(
            artifact.append(Exchange::new("late", "{}", "late")),
            Err(ArtifactError::Finalized)
        );
        assert_eq!(artifact.answer(), Some("hello"));
        assert_eq!(artifact.exchanges().len(), 1);
    }

    #[test]
    fn content_converts_back_when_aligned() {
        let mut artifact = Artifact::new("algorithms");
        artifact.append(Exchange::new("p1", "{}", "c1")).unwrap();
        artifact.append(Exchange::new("p2", "{}", "c2")).unwrap();
        artifact.set_references(vec![record("c-1")]);
        artifact.finalize("c2").unwrap();

        let restored = Artifact::try_from(artifact.to_content()).unwrap();

        assert_eq!(restored, artifact);
    }

    #[test]
    fn empty_answer_stays_finalized_across_transport() {
        let mut artifact = Artifact::new("hi");
        artifact.append(Exchange::new("p", "{}", "")).unwrap();
        artifact.finalize("").unwrap();

        let content = artifact.to_content();
        assert!(content.finalized);
        let json = serde_json::to_value(&content).unwrap();
        let mut restored =
            Artifact::try_from(serde_json::from_value::<ArtifactContent>(json).unwrap()).unwrap();

        assert!(restored.is_finalized());
        assert_eq!(restored.answer(), Some(""));
        assert_eq!(
            restored.append(Exchange::new("late", "{}", "late")),
            Err(ArtifactError::Finalized)
        );
        assert_eq!(restored.finalize("again"), Err(ArtifactError::AlreadyFinalized));
    }

    #[test]
    fn payload_without_finalized_flag_uses_answer() {
        let answered: ArtifactContent =
            serde_json::from_value(serde_json::json!({ "query_message": "q", "answer": "hello" }))
                .unwrap();
        let open: ArtifactContent =
            serde_json::from_value(serde_json::json!({ "query_message": "q" })).unwrap();

        assert!(Artifact::try_from(answered).unwrap().is_finalized());
        assert!(!Artifact::try_from(open).unwrap().is_finalized());
    }

    #[test]
    fn misaligned_content_is_rejected() {
        let content = ArtifactContent {
            query_message: "q".to_string(),
            prompts: vec!["a".into(), "b".into()],
            response_objects: vec!["{}".into()],
            response_contents: vec!["x".into(), "y".into()],
            ..Default::default()
        };

        let err = Artifact::try_from(content).unwrap_err();

        assert!(matches!(err, ArtifactError::Misaligned { prompts: 2, objects: 1, contents: 2 }));
        assert!(matches!(ApiError::from(err), ApiError::BadRequest(_)));
    }

    #[test]
    fn transport_field_names_are_stable() {
        let value = serde_json::to_value(Artifact::new("q").to_content()).unwrap();
        for key in ["query_message", "prompts", "response_objects", "response_contents", "references", "answer", "finalized"] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
    }
}
