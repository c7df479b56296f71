//! Canonical course records and the join from retrieved fragments to them.

pub mod joiner;
pub mod sqlite;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;

pub use joiner::RecordJoiner;
pub use sqlite::SqliteCourseCatalog;

/// Loaded projection of a row in the `courses` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseRecord {
    #[serde(rename = "courseID")]
    pub course_id: String,
    #[serde(rename = "courseNumber", default)]
    pub course_number: String,
    #[serde(rename = "courseTitle", default)]
    pub course_title: String,
    #[serde(rename = "courseDescription", default)]
    pub course_description: String,
    #[serde(rename = "publishedInstructors", default)]
    pub published_instructors: String,
    #[serde(default)]
    pub meetings: String,
}

/// Read-only lookup of canonical course rows.
#[async_trait]
pub trait CourseCatalog: Send + Sync {
    /// Rows whose id is in `ids`. Unknown ids are absent from the result.
    async fn lookup(&self, ids: &[String]) -> Result<Vec<CourseRecord>, ApiError>;
}
