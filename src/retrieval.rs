//! Query-time retrieval for knowledge-base agents.
//!
//! [`RetrievalTool::retrieve`] embeds the question, asks the index for the
//! nearest chunks, and renders them as source-attributed passages:
//!
//! ```text
//! From koalas.txt:
//! Koalas live in eucalyptus forests.
//!
//! ---
//!
//! From lions.txt:
//! Lions live in prides.
//! ```
//!
//! An empty result is reported with [`NO_RESULTS_MESSAGE`], never an empty
//! string. Failures propagate as [`KbError`].

use std::sync::Arc;

use crate::embedding::Embedder;
use crate::error::KbResult;
use crate::models::QueryHit;
use crate::store::VectorIndex;

pub const NO_RESULTS_MESSAGE: &str = "No relevant information found in the knowledge base. \
The knowledge base may be empty or the question doesn't match any stored content.";

const HIT_SEPARATOR: &str = "\n\n---\n\n";

pub struct RetrievalTool {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
    default_k: usize,
}

impl RetrievalTool {
    pub fn new(index: Arc<dyn VectorIndex>, embedder: Arc<dyn Embedder>, default_k: usize) -> Self {
        Self {
            index,
            embedder,
            default_k: default_k.max(1),
        }
    }

    /// Nearest chunks for `question`, nearest first.
    ///
    /// An empty index returns no hits without calling the embedder.
    pub async fn search(&self, question: &str, k: Option<usize>) -> KbResult<Vec<QueryHit>> {
        if self.index.count().await? == 0 {
            tracing::debug!("retrieval skipped: index is empty");
            return Ok(Vec::new());
        }

        let k = k.unwrap_or(self.default_k);
        let vector = self.embedder.embed_one(question).await?;
        let hits = self.index.query(&vector, k).await?;

        tracing::debug!(k, hits = hits.len(), "retrieval query");
        Ok(hits)
    }

    /// Formatted context for `question`, or [`NO_RESULTS_MESSAGE`].
    pub async fn retrieve(&self, question: &str, k: Option<usize>) -> KbResult<String> {
        let hits = self.search(question, k).await?;
        Ok(format_hits(&hits))
    }
}

/// Render hits as `From {source}:\n{text}` blocks.
pub fn format_hits(hits: &[QueryHit]) -> String {
    if hits.is_empty() {
        return NO_RESULTS_MESSAGE.to_string();
    }

    hits.iter()
        .map(|hit| format!("From {}:\n{}", hit.metadata.source(), hit.text))
        .collect::<Vec<_>>()
        .join(HIT_SEPARATOR)
}
