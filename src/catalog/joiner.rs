use std::collections::HashSet;
use std::sync::Arc;

use super::{CourseCatalog, CourseRecord};
use crate::core::errors::ApiError;
use crate::rag::store::RetrievedFragment;

/// Resolves retrieved fragments to the canonical rows they were cut from.
#[derive(Clone)]
pub struct RecordJoiner {
    catalog: Arc<dyn CourseCatalog>,
}

impl RecordJoiner {
    pub fn new(catalog: Arc<dyn CourseCatalog>) -> Self {
        Self { catalog }
    }

    pub async fn resolve(
        &self,
        fragments: &[RetrievedFragment],
    ) -> Result<Vec<CourseRecord>, ApiError> {
        let ids = unique_course_ids(fragments);
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let records = self.catalog.lookup(&ids).await?;
        if records.len() < ids.len() {
            tracing::debug!(
                "{} of {} course ids have no catalog row",
                ids.len() - records.len(),
                ids.len()
            );
        }
        tracing::info!("Joined {} fragments to {} course records", fragments.len(), records.len());
        Ok(records)
    }
}

/// Course ids in first-seen order, without duplicates.
pub fn unique_course_ids(fragments: &[RetrievedFragment]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();

    for fragment in fragments {
        match fragment.course_id() {
            Some(id) => {
                if seen.insert(id.to_string()) {
                    ids.push(id.to_string());
                }
            }
            None => tracing::debug!("Fragment {} has no courseID; skipping", fragment.id),
        }
    }

    ids
}
