//! Typed failures for the retrieval core.
//!
//! The knowledge-base manager, the retrieval tool, the embedding clients and
//! the vector index all return [`KbError`]. Application plumbing (config
//! loading, CLI, migrations, chat history) stays on `anyhow` and converts at
//! the edge.
//!
//! | Variant | Raised when |
//! |---------|-------------|
//! | [`UnsupportedInput`](KbError::UnsupportedInput) | Content is not UTF-8 text, or the add request is empty |
//! | [`EmbeddingFailure`](KbError::EmbeddingFailure) | The embedding service failed, timed out, or returned a malformed batch |
//! | [`IndexFailure`](KbError::IndexFailure) | A vector index read or write failed or timed out |
//! | [`NotFound`](KbError::NotFound) | A caller-facing lookup found nothing (only used at the CLI boundary) |

use thiserror::Error;

/// Error taxonomy for knowledge-base and retrieval operations.
#[derive(Debug, Error)]
pub enum KbError {
    #[error("unsupported input: {0}")]
    UnsupportedInput(String),

    #[error("embedding failure: {message}")]
    EmbeddingFailure { message: String, retryable: bool },

    #[error("index failure: {message}")]
    IndexFailure { message: String, retryable: bool },

    #[error("not found: {0}")]
    NotFound(String),
}

pub type KbResult<T> = Result<T, KbError>;

impl KbError {
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedInput(message.into())
    }

    /// A permanent embedding failure (bad request, bad response, disabled provider).
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::EmbeddingFailure {
            message: message.into(),
            retryable: false,
        }
    }

    /// A transient embedding failure (timeout, rate limit, exhausted retries).
    pub fn embedding_retryable(message: impl Into<String>) -> Self {
        Self::EmbeddingFailure {
            message: message.into(),
            retryable: true,
        }
    }

    pub fn index(message: impl Into<String>) -> Self {
        Self::IndexFailure {
            message: message.into(),
            retryable: false,
        }
    }

    pub fn index_retryable(message: impl Into<String>) -> Self {
        Self::IndexFailure {
            message: message.into(),
            retryable: true,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Whether retrying the same call later may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::EmbeddingFailure { retryable, .. } | Self::IndexFailure { retryable, .. } => {
                *retryable
            }
            Self::UnsupportedInput(_) | Self::NotFound(_) => false,
        }
    }
}

impl From<sqlx::Error> for KbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => Self::index_retryable(err.to_string()),
            other => Self::index(other.to_string()),
        }
    }
}
