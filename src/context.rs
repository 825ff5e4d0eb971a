//! Explicit application context.
//!
//! [`AppContext`] owns every long-lived component: the database pool, the
//! vector index, the embedder, the knowledge-base manager, the retrieval
//! tool, the router, and the chat store. It is built once at startup and
//! passed by reference; tests build one from fakes with
//! [`AppContext::from_parts`].

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use sqlx::SqlitePool;

use crate::chat_store::{ChatStore, SqliteChatStore};
use crate::chunk::TextSplitter;
use crate::config::Config;
use crate::db;
use crate::embedding::{create_embedder, Embedder};
use crate::knowledge::KnowledgeBase;
use crate::migrate::run_migrations;
use crate::retrieval::RetrievalTool;
use crate::router::{KeywordRouter, QuestionRouter};
use crate::store::{InMemoryIndex, SqliteIndex, VectorIndex};
use crate::traits::{ToolContext, ToolRegistry};

pub struct AppContext {
    pub config: Arc<Config>,
    pub index: Arc<dyn VectorIndex>,
    pub embedder: Arc<dyn Embedder>,
    pub knowledge: Arc<KnowledgeBase>,
    pub retrieval: Arc<RetrievalTool>,
    pub router: Arc<dyn QuestionRouter>,
    pub chat: Arc<dyn ChatStore>,
    pool: SqlitePool,
}

impl AppContext {
    /// Connect, migrate, and wire every component from `config`.
    pub async fn open(config: Config) -> Result<Self> {
        let pool = db::connect(&config).await?;
        run_migrations(&pool).await?;

        let index: Arc<dyn VectorIndex> = match config.index.backend.as_str() {
            "memory" => Arc::new(InMemoryIndex::new()),
            _ => Arc::new(SqliteIndex::new(
                pool.clone(),
                Duration::from_secs(config.index.timeout_secs),
            )),
        };
        let embedder = create_embedder(&config.embedding)?;

        tracing::debug!(
            db = %config.db.path.display(),
            backend = %config.index.backend,
            provider = %config.embedding.provider,
            model = embedder.model_name(),
            "opened application context"
        );

        Ok(Self::from_parts(config, pool, index, embedder))
    }

    /// Wire components around an existing pool, index, and embedder.
    pub fn from_parts(
        config: Config,
        pool: SqlitePool,
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        let knowledge = Arc::new(KnowledgeBase::new(
            index.clone(),
            embedder.clone(),
            TextSplitter::from_config(&config.chunking),
        ));
        let retrieval = Arc::new(RetrievalTool::new(
            index.clone(),
            embedder.clone(),
            config.retrieval.top_k,
        ));
        let router: Arc<dyn QuestionRouter> = Arc::new(KeywordRouter::from_config(&config.router));
        let chat: Arc<dyn ChatStore> = Arc::new(SqliteChatStore::new(pool.clone()));

        Self {
            config: Arc::new(config),
            index,
            embedder,
            knowledge,
            retrieval,
            router,
            chat,
            pool,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Tools available to the knowledge-base agent.
    pub fn tools(&self) -> (ToolRegistry, ToolContext) {
        (
            ToolRegistry::with_builtins(),
            ToolContext::new(self.retrieval.clone()),
        )
    }

    /// Close the database pool, waiting for in-flight queries.
    pub async fn close(self) {
        self.pool.close().await;
    }
}
