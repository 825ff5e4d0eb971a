//! Knowledge-base manager: the single writer of indexed documents.
//!
//! A document is identified by the SHA-256 of its normalized text. Adding it
//! splits the text with the configured [`TextSplitter`], embeds every chunk
//! in one [`Embedder::embed_many`] call, and replaces whatever the index held
//! for that hash.
//!
//! # Write path
//!
//! ```text
//! add_or_replace(content, name)
//!   ├── normalize + hash
//!   ├── lock(hash)                      ← per-hash, held until return
//!   ├── get_where(DocumentHash)         ← snapshot, decides was_duplicate
//!   ├── split → embed_many              ← failure: index untouched
//!   ├── delete_where(DocumentHash)
//!   └── upsert(new entries)             ← failure: snapshot restored
//! ```
//!
//! Writers for the same hash are serialized; writers for different hashes
//! and all readers run concurrently. Nothing here retries: a retryable
//! [`KbError`] is handed back to the caller.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use serde::Serialize;

use crate::chunk::TextSplitter;
use crate::embedding::{check_batch, Embedder};
use crate::error::{KbError, KbResult};
use crate::locks::KeyedLocks;
use crate::models::{Document, IndexEntry};
use crate::store::{MetadataFilter, VectorIndex};

/// Result of [`KnowledgeBase::add_or_replace`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddOutcome {
    pub doc_hash: String,
    /// True iff entries for this hash already existed before the call.
    pub was_duplicate: bool,
    pub chunk_count: usize,
}

/// One indexed document, as shown by listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentSummary {
    pub doc_hash: String,
    pub display_name: String,
    pub chunk_count: usize,
}

/// Tally of a [`KnowledgeBase::load_directory`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub files: usize,
    pub added: usize,
    pub duplicates: usize,
    pub failed: usize,
}

pub struct KnowledgeBase {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
    splitter: TextSplitter,
    locks: KeyedLocks,
}

impl KnowledgeBase {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn Embedder>,
        splitter: TextSplitter,
    ) -> Self {
        Self {
            index,
            embedder,
            splitter,
            locks: KeyedLocks::new(),
        }
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    pub fn splitter(&self) -> &TextSplitter {
        &self.splitter
    }

    /// Index `content`, replacing any chunks already stored for the same text.
    ///
    /// When the content is already indexed, the display name on record wins;
    /// a different `display_name` is logged as duplicate content rather than
    /// treated as a rename.
    pub async fn add_or_replace(
        &self,
        content: &str,
        display_name: Option<&str>,
    ) -> KbResult<AddOutcome> {
        if content.is_empty() {
            return Err(KbError::unsupported("document content is empty"));
        }

        let doc = Document::new(content, display_name);
        let _guard = self.locks.lock(&doc.hash).await;

        let filter = MetadataFilter::DocumentHash(doc.hash.clone());
        let snapshot = self.index.get_where(&filter).await?;
        let was_duplicate = !snapshot.is_empty();

        let recorded_name = snapshot
            .first()
            .map(|e| e.metadata.display_name.as_str())
            .filter(|n| !n.is_empty());
        let name = match (recorded_name, doc.display_name.as_deref()) {
            (Some(recorded), requested) => {
                if requested.is_some_and(|r| r != recorded) {
                    tracing::warn!(
                        doc_hash = %doc.hash,
                        existing = recorded,
                        requested = requested.unwrap_or_default(),
                        "duplicate content under a different name; keeping existing name"
                    );
                }
                recorded.to_string()
            }
            (None, requested) => requested.unwrap_or_default().to_string(),
        };

        let chunks = self.splitter.chunk_document(&doc);
        if chunks.is_empty() {
            tracing::info!(doc_hash = %doc.hash, "document has no indexable text");
            return Ok(AddOutcome {
                doc_hash: doc.hash,
                was_duplicate,
                chunk_count: 0,
            });
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed_many(&texts).await?;
        check_batch(texts.len(), self.embedder.dims(), &vectors)?;

        let entries: Vec<IndexEntry> = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexEntry::from_chunk(chunk, vector, &name))
            .collect();

        self.index.delete_where(&filter).await?;

        if let Err(err) = self.index.upsert(&entries).await {
            tracing::error!(doc_hash = %doc.hash, error = %err, "index write failed; restoring previous chunks");
            if let Err(restore_err) = self.index.upsert(&snapshot).await {
                tracing::error!(doc_hash = %doc.hash, error = %restore_err, "failed to restore previous chunks");
            }
            return Err(err);
        }

        tracing::info!(
            doc_hash = %doc.hash,
            display_name = %name,
            chunks = entries.len(),
            replaced = snapshot.len(),
            was_duplicate,
            "indexed document"
        );

        Ok(AddOutcome {
            doc_hash: doc.hash,
            was_duplicate,
            chunk_count: entries.len(),
        })
    }

    /// Decode `bytes` as UTF-8 and index the text.
    pub async fn add_bytes(
        &self,
        bytes: &[u8],
        display_name: Option<&str>,
    ) -> KbResult<AddOutcome> {
        let content = std::str::from_utf8(bytes)
            .map_err(|e| KbError::unsupported(format!("content is not UTF-8 text: {}", e)))?;
        self.add_or_replace(content, display_name).await
    }

    /// Remove every chunk of `doc_hash`. Returns whether anything was removed.
    pub async fn delete(&self, doc_hash: &str) -> KbResult<bool> {
        let _guard = self.locks.lock(doc_hash).await;
        let removed = self
            .index
            .delete_where(&MetadataFilter::DocumentHash(doc_hash.to_string()))
            .await?;

        if removed > 0 {
            tracing::info!(doc_hash, chunks = removed, "deleted document");
        }
        Ok(removed > 0)
    }

    pub async fn exists(&self, doc_hash: &str) -> KbResult<bool> {
        let entries = self
            .index
            .get_where(&MetadataFilter::DocumentHash(doc_hash.to_string()))
            .await?;
        Ok(!entries.is_empty())
    }

    /// Every indexed document hash, sorted.
    pub async fn list_all(&self) -> KbResult<Vec<String>> {
        let entries = self.index.get_where(&MetadataFilter::All).await?;
        let hashes: BTreeSet<String> = entries
            .into_iter()
            .map(|e| e.metadata.document_hash)
            .collect();
        Ok(hashes.into_iter().collect())
    }

    /// Per-document summaries, sorted by hash.
    pub async fn list_documents(&self) -> KbResult<Vec<DocumentSummary>> {
        let entries = self.index.get_where(&MetadataFilter::All).await?;
        let mut docs: BTreeMap<String, DocumentSummary> = BTreeMap::new();

        for entry in entries {
            docs.entry(entry.metadata.document_hash.clone())
                .or_insert_with(|| DocumentSummary {
                    doc_hash: entry.metadata.document_hash.clone(),
                    display_name: entry.metadata.display_name.clone(),
                    chunk_count: 0,
                })
                .chunk_count += 1;
        }

        Ok(docs.into_values().collect())
    }

    /// Hashes of documents recorded under `display_name`.
    pub async fn find_by_name(&self, display_name: &str) -> KbResult<Vec<String>> {
        let entries = self
            .index
            .get_where(&MetadataFilter::DisplayName(display_name.to_string()))
            .await?;
        let hashes: BTreeSet<String> = entries
            .into_iter()
            .map(|e| e.metadata.document_hash)
            .collect();
        Ok(hashes.into_iter().collect())
    }

    /// Index every `*.txt` file directly inside `dir`, named by file name.
    ///
    /// Files that fail to read or index are logged and counted; only a
    /// failure to list the directory itself is returned as an error.
    pub async fn load_directory(&self, dir: &Path) -> anyhow::Result<LoadReport> {
        let mut paths = Vec::new();
        let read_dir = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read knowledge directory: {}", dir.display()))?;
        for entry in read_dir {
            let path = entry?.path();
            let is_txt = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("txt"));
            if path.is_file() && is_txt {
                paths.push(path);
            }
        }
        paths.sort();

        let mut report = LoadReport {
            files: paths.len(),
            ..LoadReport::default()
        };

        for path in paths {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned());

            let bytes = match std::fs::read(&path) {
                Ok(b) => b,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable file");
                    report.failed += 1;
                    continue;
                }
            };

            match self.add_bytes(&bytes, name.as_deref()).await {
                Ok(outcome) if outcome.was_duplicate => report.duplicates += 1,
                Ok(_) => report.added += 1,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to index file");
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            dir = %dir.display(),
            files = report.files,
            added = report.added,
            duplicates = report.duplicates,
            failed = report.failed,
            "loaded knowledge directory"
        );

        Ok(report)
    }
}
