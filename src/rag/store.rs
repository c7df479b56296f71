//! VectorIndex trait: the narrow contract the retrieval stage consumes.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::errors::ApiError;

/// Metadata equality constraints sent to the index. Empty means unfiltered.
pub type ConstraintMap = BTreeMap<String, Value>;

/// Metadata key holding the stable course identifier.
pub const COURSE_ID_KEY: &str = "courseID";

/// One vector-index hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedFragment {
    pub id: String,
    /// Distance to the query (lower = more similar).
    pub score: f32,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl RetrievedFragment {
    pub fn course_id(&self) -> Option<&str> {
        self.metadata
            .get(COURSE_ID_KEY)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Up to `n_results` fragments of `collection` closest to `query_text`,
    /// best match first, restricted to rows whose metadata equals every entry
    /// of `filter`.
    async fn query(
        &self,
        collection: &str,
        query_text: &str,
        n_results: usize,
        filter: &ConstraintMap,
    ) -> Result<Vec<RetrievedFragment>, ApiError>;
}
