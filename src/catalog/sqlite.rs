//! SQLite-backed course catalog.

use std::path::PathBuf;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};

use super::{CourseCatalog, CourseRecord};
use crate::core::errors::ApiError;

const SELECT_COLUMNS: &str =
    "courseID, courseNumber, courseTitle, courseDescription, publishedInstructors, meetings";

pub struct SqliteCourseCatalog {
    pool: SqlitePool,
}

impl SqliteCourseCatalog {
    pub async fn with_path(db_path: PathBuf) -> Result<Self, ApiError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(ApiError::internal)?;

        let catalog = Self { pool };
        catalog.init_schema().await?;
        Ok(catalog)
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS courses (
                courseID TEXT,
                term TEXT,
                termDescription TEXT,
                catalogSubject TEXT,
                catalogSubjectDescription TEXT,
                courseDescription TEXT,
                courseNumber TEXT,
                courseTitle TEXT,
                publishedInstructors TEXT,
                meetings TEXT
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_courses_id ON courses(courseID)")
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(())
    }

    /// Adds one course row. Seeding and tests only; the service never writes.
    pub async fn insert(
        &self,
        record: &CourseRecord,
        term_description: Option<&str>,
        catalog_subject: Option<&str>,
    ) -> Result<(), ApiError> {
        sqlx::query(
            "INSERT INTO courses (
                courseID, termDescription, catalogSubject, courseDescription,
                courseNumber, courseTitle, publishedInstructors, meetings
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&record.course_id)
        .bind(term_description)
        .bind(catalog_subject)
        .bind(&record.course_description)
        .bind(&record.course_number)
        .bind(&record.course_title)
        .bind(&record.published_instructors)
        .bind(&record.meetings)
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(())
    }

    fn row_to_record(row: &SqliteRow) -> CourseRecord {
        let text = |column: &str| -> String {
            row.try_get::<Option<String>, _>(column)
                .ok()
                .flatten()
                .unwrap_or_default()
        };

        CourseRecord {
            course_id: text("courseID"),
            course_number: text("courseNumber"),
            course_title: text("courseTitle"),
            course_description: text("courseDescription"),
            published_instructors: text("publishedInstructors"),
            meetings: text("meetings"),
        }
    }
}

/// `?, ?, ?` with one placeholder per id.
fn in_placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

pub(crate) fn lookup_sql(count: usize) -> String {
    format!(
        "SELECT {} FROM courses WHERE courseID IN ({})",
        SELECT_COLUMNS,
        in_placeholders(count)
    )
}

#[async_trait]
impl CourseCatalog for SqliteCourseCatalog {
    async fn lookup(&self, ids: &[String]) -> Result<Vec<CourseRecord>, ApiError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = lookup_sql(ids.len());
        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(id);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(rows.iter().map(Self::row_to_record).collect())
    }
}
