//! SQLite-backed vector index.
//!
//! Fragments live in one table with their metadata as JSON and embeddings as
//! little-endian f32 BLOBs. Queries embed the query text and rank by brute
//! force cosine distance.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::store::{ConstraintMap, RetrievedFragment, VectorIndex};
use crate::core::errors::ApiError;
use crate::llm::EmbeddingProvider;

/// A fragment to be stored: its text is embedded on upsert.
#[derive(Debug, Clone)]
pub struct FragmentInput {
    pub id: String,
    pub document: String,
    pub metadata: Map<String, Value>,
}

pub struct SqliteVectorIndex {
    pool: SqlitePool,
    embedder: Arc<dyn EmbeddingProvider>,
    embedding_model: String,
}

impl SqliteVectorIndex {
    pub async fn with_path(
        db_path: PathBuf,
        embedder: Arc<dyn EmbeddingProvider>,
        embedding_model: impl Into<String>,
    ) -> Result<Self, ApiError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(ApiError::internal)?;

        let index = Self {
            pool,
            embedder,
            embedding_model: embedding_model.into(),
        };
        index.init_schema().await?;
        Ok(index)
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS fragments (
                fragment_id TEXT NOT NULL,
                collection TEXT NOT NULL,
                document TEXT NOT NULL DEFAULT '',
                metadata TEXT NOT NULL DEFAULT '{}',
                embedding BLOB,
                PRIMARY KEY (collection, fragment_id)
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(())
    }

    /// Embeds and stores fragments, replacing any with the same id.
    pub async fn upsert(
        &self,
        collection: &str,
        fragments: Vec<FragmentInput>,
    ) -> Result<usize, ApiError> {
        if fragments.is_empty() {
            return Ok(0);
        }

        let documents: Vec<String> = fragments.iter().map(|f| f.document.clone()).collect();
        let embeddings = self
            .embedder
            .embed(&documents, &self.embedding_model)
            .await?;

        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;
        for (fragment, embedding) in fragments.iter().zip(embeddings.iter()) {
            let metadata = serde_json::to_string(&fragment.metadata).map_err(ApiError::internal)?;
            sqlx::query(
                "INSERT OR REPLACE INTO fragments (fragment_id, collection, document, metadata, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(&fragment.id)
            .bind(collection)
            .bind(&fragment.document)
            .bind(&metadata)
            .bind(serialize_embedding(embedding))
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;
        }
        tx.commit().await.map_err(ApiError::internal)?;

        tracing::info!("Upserted {} fragments into '{}'", fragments.len(), collection);
        Ok(fragments.len())
    }

    pub async fn count(&self, collection: &str) -> Result<usize, ApiError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM fragments WHERE collection = ?1")
            .bind(collection)
            .fetch_one(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(count as usize)
    }
}

fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;

    if denom <= f32::EPSILON {
        0.0
    } else {
        dot / denom
    }
}

/// `1 - cosine_similarity`, floored at zero so rounding never yields a
/// negative distance for an exact match.
fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    (1.0 - cosine_similarity(a, b)).max(0.0)
}

fn matches_filter(metadata: &Map<String, Value>, filter: &ConstraintMap) -> bool {
    filter
        .iter()
        .all(|(key, expected)| metadata.get(key) == Some(expected))
}

#[async_trait]
impl VectorIndex for SqliteVectorIndex {
    async fn query(
        &self,
        collection: &str,
        query_text: &str,
        n_results: usize,
        filter: &ConstraintMap,
    ) -> Result<Vec<RetrievedFragment>, ApiError> {
        if n_results == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self
            .embedder
            .embed(&[query_text.to_string()], &self.embedding_model)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::upstream("Embedding provider returned no vector"))?;

        let rows = sqlx::query(
            "SELECT fragment_id, metadata, embedding FROM fragments WHERE collection = ?1",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        let mut scored: Vec<RetrievedFragment> = rows
            .iter()
            .filter_map(|row| {
                let metadata_str: String = row.get("metadata");
                let metadata = serde_json::from_str::<Map<String, Value>>(&metadata_str)
                    .unwrap_or_default();
                if !matches_filter(&metadata, filter) {
                    return None;
                }

                let embedding_bytes: Option<Vec<u8>> = row.get("embedding");
                let stored = deserialize_embedding(&embedding_bytes?);
                if stored.is_empty() {
                    return None;
                }

                Some(RetrievedFragment {
                    id: row.get("fragment_id"),
                    score: cosine_distance(&query_embedding, &stored),
                    metadata,
                })
            })
            .collect();

        scored.sort_by(|a, b| {
            a.score
                .partial_cmp(&b.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(n_results);

        Ok(scored)
    }
}
