use std::sync::Arc;

use crate::assistant::AnswerComposer;
use crate::catalog::{RecordJoiner, SqliteCourseCatalog};
use crate::core::config::{AppPaths, AssistantSettings, ConfigService};
use crate::history::HistoryStore;
use crate::llm::{LlmService, OpenAiProvider, RetryPolicy};
use crate::rag::{IntentExtractor, Retriever, SqliteVectorIndex};

pub mod error;

use error::InitializationError;

/// Application state shared across all routes.
///
/// Everything the pipeline talks to is built here once and handed down by
/// constructor; nothing is reached through globals.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub settings: Arc<AssistantSettings>,
    pub composer: AnswerComposer,
    pub history: HistoryStore,
}

impl AppState {
    pub fn new(
        paths: Arc<AppPaths>,
        settings: AssistantSettings,
        composer: AnswerComposer,
        history: HistoryStore,
    ) -> Arc<Self> {
        Arc::new(Self {
            paths,
            settings: Arc::new(settings),
            composer,
            history,
        })
    }

    /// Loads configuration and opens every store and client.
    pub async fn initialize(paths: Arc<AppPaths>) -> Result<Arc<Self>, InitializationError> {
        let config = ConfigService::new(paths.clone());
        let settings = config
            .load_settings()
            .map_err(|e| InitializationError::Config(e.into()))?;

        if settings.llm.api_key.is_none() {
            tracing::warn!("No LLM API key configured; completions will likely be rejected");
        }

        let provider = Arc::new(
            OpenAiProvider::new(
                settings.llm.base_url.clone(),
                settings.llm.api_key.clone(),
                settings.llm.request_timeout(),
            )
            .map_err(|e| InitializationError::Llm(e.into()))?,
        );
        let llm = LlmService::from_settings(
            provider.clone(),
            RetryPolicy::from_settings(&settings.retry),
            &settings.llm,
        );

        let index = SqliteVectorIndex::with_path(
            paths.resolve(&settings.storage.vector_db),
            provider,
            settings.llm.embedding_model.clone(),
        )
        .await
        .map_err(|e| InitializationError::VectorIndex(e.into()))?;

        let catalog = SqliteCourseCatalog::with_path(paths.resolve(&settings.storage.courses_db))
            .await
            .map_err(|e| InitializationError::Catalog(e.into()))?;

        let history = HistoryStore::new(paths.resolve(&settings.storage.sessions_db))
            .await
            .map_err(|e| InitializationError::History(e.into()))?;

        let extractor = IntentExtractor::new(
            llm.clone(),
            settings.retrieval.history_window,
            settings.retrieval.max_results,
        );
        let retriever = Retriever::new(extractor, Arc::new(index), &settings.retrieval);
        let composer = AnswerComposer::new(
            retriever,
            RecordJoiner::new(Arc::new(catalog)),
            llm,
            settings.assistant.gen_ed_resource.clone(),
        );

        Ok(Self::new(paths, settings, composer, history))
    }
}
