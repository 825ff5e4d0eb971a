//! Core data models used throughout the knowledge base and chat history.
//!
//! These types represent the documents, chunks, index entries, and chat
//! records that flow through ingestion, retrieval, and conversation storage.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Namespace for deterministic index entry ids.
const ENTRY_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2a4e_9b3d_4c7a_8e51_d02f_7a9c_3b64);

/// A document submitted for ingestion.
///
/// Identity is the hash of the normalized text; the display name is advisory.
#[derive(Debug, Clone)]
pub struct Document {
    pub hash: String,
    pub display_name: Option<String>,
    pub text: String,
}

impl Document {
    /// Normalize `content` and derive its content hash.
    pub fn new(content: &str, display_name: Option<&str>) -> Self {
        let text = normalize_content(content);
        Self {
            hash: content_hash(&text),
            display_name: display_name.map(str::to_string),
            text,
        }
    }
}

/// A chunk of a document's text, ready for embedding.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    pub document_hash: String,
    pub chunk_index: i64,
    pub text: String,
}

impl Chunk {
    pub fn new(document_hash: &str, chunk_index: i64, text: impl Into<String>) -> Self {
        Self {
            id: entry_id(document_hash, chunk_index),
            document_hash: document_hash.to_string(),
            chunk_index,
            text: text.into(),
        }
    }
}

/// Metadata persisted alongside every index entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub document_hash: String,
    pub chunk_index: i64,
    pub display_name: String,
}

/// A persisted chunk: identity, vector, text, and metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub id: String,
    pub vector: Vec<f32>,
    pub text: String,
    pub metadata: ChunkMetadata,
}

impl IndexEntry {
    /// Build the entry for `chunk` with its embedding.
    pub fn from_chunk(chunk: &Chunk, vector: Vec<f32>, display_name: &str) -> Self {
        Self {
            id: chunk.id.clone(),
            vector,
            text: chunk.text.clone(),
            metadata: ChunkMetadata {
                document_hash: chunk.document_hash.clone(),
                chunk_index: chunk.chunk_index,
                display_name: display_name.to_string(),
            },
        }
    }

    /// The label shown to agents when citing this chunk.
    pub fn source(&self) -> &str {
        self.metadata.source()
    }
}

impl ChunkMetadata {
    /// Display name when one was recorded, otherwise the document hash.
    pub fn source(&self) -> &str {
        if self.display_name.is_empty() {
            &self.document_hash
        } else {
            &self.display_name
        }
    }
}

/// A single similarity search hit, nearest first.
#[derive(Debug, Clone, Serialize)]
pub struct QueryHit {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
    /// Cosine distance in `[0.0, 2.0]`; smaller is more similar.
    pub distance: f32,
}

/// Role of a chat message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

/// A chat session header.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: i64,
    pub created_at: String,
}

/// A stored chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

/// Strip a UTF-8 BOM and normalize line endings to `\n`.
pub fn normalize_content(content: &str) -> String {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    content.replace("\r\n", "\n").replace('\r', "\n")
}

/// SHA-256 of the text, lowercase hex.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Deterministic index entry id for a document chunk.
///
/// Re-indexing the same document with the same chunking parameters yields
/// the same ids, so upserts overwrite instead of duplicating.
pub fn entry_id(document_hash: &str, chunk_index: i64) -> String {
    Uuid::new_v5(
        &ENTRY_NAMESPACE,
        format!("{}:{}", document_hash, chunk_index).as_bytes(),
    )
    .to_string()
}
