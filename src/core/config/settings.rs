//! Typed view over the merged YAML configuration.
//!
//! Every field has a default so an empty `config.yml` yields a working setup
//! (apart from the API key, which must come from `secrets.yaml` or
//! `OPENAI_API_KEY`).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::defaults::*;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantSettings {
    pub server: ServerSettings,
    pub llm: LlmSettings,
    pub retry: RetrySettings,
    pub retrieval: RetrievalSettings,
    pub storage: StorageSettings,
    pub assistant: ComposerSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            cors_allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    /// Cheaper tier used for keyword extraction.
    pub keyword_model: String,
    /// Higher-capability tier used for the final answer.
    pub answer_model: String,
    pub embedding_model: String,
    pub request_timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_LLM_BASE_URL.to_string(),
            api_key: None,
            keyword_model: DEFAULT_KEYWORD_MODEL.to_string(),
            answer_model: DEFAULT_ANSWER_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl LlmSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub min_wait_secs: f64,
    pub max_wait_secs: f64,
    pub multiplier_secs: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            min_wait_secs: DEFAULT_MIN_WAIT_SECS,
            max_wait_secs: DEFAULT_MAX_WAIT_SECS,
            multiplier_secs: DEFAULT_BACKOFF_MULTIPLIER_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub collection: String,
    /// When set, fragments must score strictly above it to be kept.
    /// Unset keeps every fragment the index returns.
    pub similarity_threshold: Option<f32>,
    pub max_results: usize,
    /// Number of prior user messages shown to the keyword extractor.
    pub history_window: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            collection: DEFAULT_COLLECTION.to_string(),
            similarity_threshold: None,
            max_results: DEFAULT_MAX_RESULTS,
            history_window: DEFAULT_HISTORY_WINDOW,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub courses_db: String,
    pub vector_db: String,
    pub sessions_db: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            courses_db: DEFAULT_COURSES_DB.to_string(),
            vector_db: DEFAULT_VECTOR_DB.to_string(),
            sessions_db: DEFAULT_SESSIONS_DB.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposerSettings {
    pub gen_ed_resource: String,
    pub history_limit: i64,
}

impl Default for ComposerSettings {
    fn default() -> Self {
        Self {
            gen_ed_resource: DEFAULT_GEN_ED_RESOURCE.to_string(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}
