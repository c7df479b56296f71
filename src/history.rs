//! Session history: every finalized exchange, replayable per session.

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::core::errors::ApiError;
use crate::session::ArtifactContent;

const SCHEMA_VERSION: i64 = 1;
const MAX_HISTORY_LIMIT: i64 = 1000;
const MAX_TITLE_LEN: usize = 160;
const PREVIEW_LEN: usize = 100;

#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub id: String,
    pub title: String,
    pub created_at: String,
    pub updated_at: String,
    pub exchange_count: i64,
    /// Start of the most recent query.
    pub preview: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionDetail {
    pub id: String,
    pub title: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoredExchange {
    pub id: i64,
    pub session_id: String,
    pub artifact: ArtifactContent,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct HistoryStore {
    db_path: PathBuf,
    pool: SqlitePool,
}

impl HistoryStore {
    pub async fn new(db_path: PathBuf) -> Result<Self, ApiError> {
        let connect_options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(8)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(connect_options)
            .await
            .map_err(ApiError::internal)?;

        let store = Self { db_path, pool };
        store.init_db().await?;
        Ok(store)
    }

    pub fn db_path(&self) -> &PathBuf {
        &self.db_path
    }

    async fn init_db(&self) -> Result<(), ApiError> {
        let version: i64 = sqlx::query_scalar("PRAGMA user_version")
            .fetch_one(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        if version != SCHEMA_VERSION {
            if version != 0 {
                tracing::warn!(
                    "Session store schema v{} is not v{}; rebuilding",
                    version,
                    SCHEMA_VERSION
                );
            }
            self.rebuild_schema().await?;
        }

        Ok(())
    }

    async fn rebuild_schema(&self) -> Result<(), ApiError> {
        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;

        for statement in [
            "DROP TABLE IF EXISTS exchanges",
            "DROP TABLE IF EXISTS sessions",
            "CREATE TABLE sessions (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL CHECK(length(trim(title)) > 0),
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now')),
                updated_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
            "CREATE TABLE exchanges (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                query_message TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now')),
                FOREIGN KEY (session_id) REFERENCES sessions(id) ON DELETE CASCADE
            )",
            "CREATE INDEX idx_sessions_updated_at ON sessions(updated_at DESC)",
            "CREATE INDEX idx_exchanges_session_id_id ON exchanges(session_id, id)",
        ] {
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .map_err(ApiError::internal)?;
        }

        let pragma = format!("PRAGMA user_version = {}", SCHEMA_VERSION);
        sqlx::query(&pragma)
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;

        tx.commit().await.map_err(ApiError::internal)?;
        Ok(())
    }

    pub async fn list_sessions(&self) -> Result<Vec<SessionInfo>, ApiError> {
        let rows = sqlx::query(
            "\
            SELECT s.id, s.title, s.created_at, s.updated_at,
                   (SELECT COUNT(*) FROM exchanges WHERE session_id = s.id) as exchange_count,
                   (SELECT query_message FROM exchanges WHERE session_id = s.id ORDER BY id DESC LIMIT 1) as last_query
            FROM sessions s
            ORDER BY s.updated_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        rows.into_iter()
            .map(session_info_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(ApiError::internal)
    }

    pub async fn create_session(&self, title: Option<String>) -> Result<String, ApiError> {
        let session_id = Uuid::new_v4().to_string();
        let title = normalize_title(title);

        sqlx::query("INSERT INTO sessions (id, title) VALUES (?1, ?2)")
            .bind(&session_id)
            .bind(title)
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(session_id)
    }

    pub async fn get_session(&self, session_id: &str) -> Result<Option<SessionDetail>, ApiError> {
        let row =
            sqlx::query("SELECT id, title, created_at, updated_at FROM sessions WHERE id = ?1")
                .bind(session_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(ApiError::internal)?;

        row.map(session_detail_from_row)
            .transpose()
            .map_err(ApiError::internal)
    }

    pub async fn delete_session(&self, session_id: &str) -> Result<bool, ApiError> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = ?1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(result.rows_affected() > 0)
    }

    /// Appends a finalized exchange to an existing session.
    pub async fn record_exchange(
        &self,
        session_id: &str,
        artifact: &ArtifactContent,
    ) -> Result<i64, ApiError> {
        let payload = serde_json::to_string(artifact).map_err(ApiError::internal)?;
        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;

        let touched = sqlx::query(
            "UPDATE sessions SET updated_at = STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now') WHERE id = ?1",
        )
        .bind(session_id)
        .execute(&mut *tx)
        .await
        .map_err(ApiError::internal)?;
        if touched.rows_affected() == 0 {
            return Err(ApiError::NotFound(format!("Session '{}' not found", session_id)));
        }

        let result = sqlx::query(
            "INSERT INTO exchanges (session_id, query_message, content) VALUES (?1, ?2, ?3)",
        )
        .bind(session_id)
        .bind(&artifact.query_message)
        .bind(payload)
        .execute(&mut *tx)
        .await
        .map_err(ApiError::internal)?;

        tx.commit().await.map_err(ApiError::internal)?;
        Ok(result.last_insert_rowid())
    }

    /// The most recent `limit` exchanges, oldest first.
    pub async fn get_exchanges(
        &self,
        session_id: &str,
        limit: i64,
    ) -> Result<Vec<StoredExchange>, ApiError> {
        let limit = sanitize_limit(limit);

        let rows = sqlx::query(
            "\
            SELECT id, session_id, content, created_at
            FROM (
                SELECT id, session_id, content, created_at
                FROM exchanges
                WHERE session_id = ?1
                ORDER BY id DESC
                LIMIT ?2
            )
            ORDER BY id ASC",
        )
        .bind(session_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        let mut exchanges = Vec::with_capacity(rows.len());
        for row in rows {
            let raw: String = row.try_get("content").map_err(ApiError::internal)?;
            let artifact = match serde_json::from_str::<ArtifactContent>(&raw) {
                Ok(artifact) => artifact,
                Err(err) => {
                    tracing::warn!("Skipping unreadable stored exchange: {}", err);
                    continue;
                }
            };
            exchanges.push(StoredExchange {
                id: row.try_get("id").map_err(ApiError::internal)?,
                session_id: row.try_get("session_id").map_err(ApiError::internal)?,
                artifact,
                created_at: row.try_get("created_at").map_err(ApiError::internal)?,
            });
        }

        Ok(exchanges)
    }
}

fn session_info_from_row(row: sqlx::sqlite::SqliteRow) -> Result<SessionInfo, sqlx::Error> {
    let last_query: Option<String> = row.try_get("last_query")?;
    let preview = last_query.unwrap_or_default().chars().take(PREVIEW_LEN).collect();

    Ok(SessionInfo {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        exchange_count: row.try_get("exchange_count")?,
        preview,
    })
}

fn session_detail_from_row(row: sqlx::sqlite::SqliteRow) -> Result<SessionDetail, sqlx::Error> {
    Ok(SessionDetail {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn sanitize_limit(limit: i64) -> i64 {
    if limit <= 0 {
        return 1;
    }
    limit.min(MAX_HISTORY_LIMIT)
}

fn normalize_title(title: Option<String>) -> String {
    let fallback = || format!("Session {}", Utc::now().format("%Y-%m-%d %H:%M"));

    let Some(raw) = title else {
        return fallback();
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return fallback();
    }

    trimmed.chars().take(MAX_TITLE_LEN).collect()
}
