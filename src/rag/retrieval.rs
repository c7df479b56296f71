//! Retrieval stage: intent → cleaned filters → vector query → threshold.

use std::sync::Arc;

use super::filters::Filters;
use super::intent::{IntentDecision, IntentExtractor};
use super::store::{RetrievedFragment, VectorIndex};
use crate::core::config::settings::RetrievalSettings;
use crate::core::errors::ApiError;
use crate::session::Artifact;

/// Output of one retrieval pass.
#[derive(Debug)]
pub struct Retrieval {
    pub decision: IntentDecision,
    pub fragments: Vec<RetrievedFragment>,
    /// Audit record opened by intent extraction.
    pub artifact: Artifact,
}

#[derive(Clone)]
pub struct Retriever {
    extractor: IntentExtractor,
    index: Arc<dyn VectorIndex>,
    collection: String,
    threshold: Option<f32>,
}

impl Retriever {
    pub fn new(
        extractor: IntentExtractor,
        index: Arc<dyn VectorIndex>,
        settings: &RetrievalSettings,
    ) -> Self {
        Self {
            extractor,
            index,
            collection: settings.collection.clone(),
            threshold: settings.similarity_threshold,
        }
    }

    /// `threshold` overrides the configured cutoff for this call only.
    pub async fn retrieve(
        &self,
        query: &str,
        filters: &Filters,
        prior_user_messages: &[String],
        threshold: Option<f32>,
    ) -> Result<Retrieval, ApiError> {
        let (decision, artifact) = self.extractor.extract(query, prior_user_messages).await?;

        let Some(intent) = decision.search_intent() else {
            return Ok(Retrieval {
                decision,
                fragments: Vec::new(),
                artifact,
            });
        };

        let constraints = filters.clean();
        tracing::debug!(
            "Querying '{}' for {} results with constraints {:?}",
            self.collection,
            intent.num_results,
            constraints.keys().collect::<Vec<_>>()
        );

        let hits = self
            .index
            .query(&self.collection, &intent.keywords, intent.num_results, &constraints)
            .await?;

        let cutoff = threshold.or(self.threshold);
        let total = hits.len();
        let fragments = apply_threshold(hits, cutoff);
        tracing::info!(
            "Retrieved {} fragments, {} kept (threshold {:?})",
            total,
            fragments.len(),
            cutoff
        );

        Ok(Retrieval {
            decision,
            fragments,
            artifact,
        })
    }
}

/// Keeps exactly the fragments scoring strictly above `threshold`.
/// Distances are never negative, so an unset or non-positive threshold
/// drops nothing and an exact match (distance 0) is always kept.
pub fn apply_threshold(
    fragments: Vec<RetrievedFragment>,
    threshold: Option<f32>,
) -> Vec<RetrievedFragment> {
    match threshold {
        Some(cutoff) if cutoff > 0.0 => fragments
            .into_iter()
            .filter(|fragment| fragment.score > cutoff)
            .collect(),
        _ => fragments,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{EmbeddingProvider, LlmService};
    use crate::rag::sqlite::{FragmentInput, SqliteVectorIndex};
    use crate::testing::{fragment, instant_retry, RecordingIndex, ScriptedProvider};
    use async_trait::async_trait;
    use serde_json::json;

    /// One axis per known word, so "algorithms" matches "Algorithms" exactly.
    struct KeywordEmbedder;

    #[async_trait]
    impl EmbeddingProvider for KeywordEmbedder {
        async fn embed(&self, inputs: &[String], _model_id: &str) -> Result<Vec<Vec<f32>>, ApiError> {
            Ok(inputs
                .iter()
                .map(|text| {
                    let text = text.to_lowercase();
                    vec![
                        if text.contains("algorithm") { 0.6 } else { 0.0 },
                        if text.contains("graph") { 0.8 } else { 0.0 },
                    ]
                })
                .collect())
        }
    }

    fn retriever(reply: &str, index: Arc<RecordingIndex>) -> Retriever {
        let scripted = Arc::new(ScriptedProvider::new(vec![Ok(reply.to_string())]));
        let llm = LlmService::new(scripted, instant_retry(), "fast", "smart");
        Retriever::new(
            IntentExtractor::new(llm, 5, 20),
            index,
            &RetrievalSettings::default(),
        )
    }

    fn ids(fragments: &[RetrievedFragment]) -> Vec<&str> {
        fragments.iter().map(|f| f.id.as_str()).collect()
    }

    #[test]
    fn unset_threshold_keeps_every_fragment() {
        let fragments = vec![
            fragment("a", 0.0, "c-a"),
            fragment("b", 0.2, "c-b"),
            fragment("c", 0.5, "c-c"),
        ];

        assert_eq!(ids(&apply_threshold(fragments.clone(), None)), vec!["a", "b", "c"]);
        assert_eq!(ids(&apply_threshold(fragments, Some(0.0))), vec!["a", "b", "c"]);
    }

    #[test]
    fn configured_threshold_is_strict() {
        let fragments = vec![
            fragment("a", 0.0, "c-a"),
            fragment("b", 0.2, "c-b"),
            fragment("c", 0.5, "c-c"),
        ];

        assert_eq!(ids(&apply_threshold(fragments, Some(0.2))), vec!["c"]);
    }

    #[tokio::test]
    async fn exact_match_survives_default_settings() {
        let tmp = tempfile::tempdir().unwrap();
        let index = SqliteVectorIndex::with_path(
            tmp.path().join("index.db"),
            Arc::new(KeywordEmbedder),
            "keyword",
        )
        .await
        .unwrap();
        index
            .upsert(
                "course_chunks",
                vec![
                    FragmentInput {
                        id: "exact".to_string(),
                        document: "Algorithms".to_string(),
                        metadata: fragment("exact", 0.0, "c-1").metadata,
                    },
                    FragmentInput {
                        id: "near".to_string(),
                        document: "Graph algorithms".to_string(),
                        metadata: fragment("near", 0.0, "c-2").metadata,
                    },
                ],
            )
            .await
            .unwrap();

        let scripted = Arc::new(ScriptedProvider::new(vec![Ok(
            r#"{"keywords": "algorithms", "num_results": 3}"#.to_string(),
        )]));
        let llm = LlmService::new(scripted, instant_retry(), "fast", "smart");
        let retriever = Retriever::new(
            IntentExtractor::new(llm, 5, 20),
            Arc::new(index),
            &RetrievalSettings::default(),
        );

        let retrieval = retriever
            .retrieve("algorithms", &Filters::default(), &[], None)
            .await
            .unwrap();

        assert_eq!(ids(&retrieval.fragments), vec!["exact", "near"]);
        assert_eq!(retrieval.fragments[0].score, 0.0);
    }

    #[tokio::test]
    async fn no_intent_never_touches_the_index() {
        for reply in ["null", "not json at all"] {
            let index = Arc::new(RecordingIndex::new(vec![fragment("a", 0.4, "c-a")]));
            let retrieval = retriever(reply, index.clone())
                .retrieve("what's your name", &Filters::default(), &[], None)
                .await
                .unwrap();

            assert!(retrieval.fragments.is_empty());
            assert_eq!(index.call_count(), 0);
            assert!(retrieval.decision.search_intent().is_none());
        }
    }

    #[tokio::test]
    async fn query_uses_intent_count_and_clean_constraints() {
        let index = Arc::new(RecordingIndex::new(vec![
            fragment("a", 0.1, "c-a"),
            fragment("b", 0.3, "c-b"),
        ]));
        let filters: Filters = serde_json::from_value(json!({
            "num_embeds": 2,
            "catalogSubject": "CS",
            "termDescription": ""
        }))
        .unwrap();

        let retrieval = retriever(r#"{"keywords": "algorithms", "num_results": 5}"#, index.clone())
            .retrieve("Find me 5 courses about algorithms", &filters, &[], None)
            .await
            .unwrap();

        let call = index.last_call().unwrap();
        assert_eq!(call.collection, "course_chunks");
        assert_eq!(call.query_text, "algorithms");
        assert_eq!(call.n_results, 5);
        assert_eq!(call.filter.len(), 1);
        assert_eq!(call.filter["catalogSubject"], "CS");
        assert_eq!(retrieval.fragments.len(), 2);
    }

    #[tokio::test]
    async fn per_call_threshold_overrides_config() {
        let index = Arc::new(RecordingIndex::new(vec![
            fragment("a", 0.1, "c-a"),
            fragment("b", 0.6, "c-b"),
        ]));

        let retrieval = retriever(r#"{"keywords": "poetry", "num_results": 3}"#, index)
            .retrieve("poetry", &Filters::default(), &[], Some(0.5))
            .await
            .unwrap();

        assert_eq!(retrieval.fragments.len(), 1);
        assert_eq!(retrieval.fragments[0].id, "b");
    }

    #[tokio::test]
    async fn empty_index_is_not_an_error() {
        let index = Arc::new(RecordingIndex::new(Vec::new()));

        let retrieval = retriever(r#"{"keywords": "underwater basket weaving"}"#, index.clone())
            .retrieve("underwater basket weaving", &Filters::default(), &[], None)
            .await
            .unwrap();

        assert!(retrieval.fragments.is_empty());
        assert_eq!(index.call_count(), 1);
        assert_eq!(retrieval.artifact.exchanges().len(), 1);
    }
}
