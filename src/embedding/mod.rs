//! Embedding client abstraction and implementations.
//!
//! Defines the [`Embedder`] trait and concrete implementations:
//! - **[`DisabledEmbedder`]**: fails every call; used when embeddings are not configured.
//! - **[`OpenAIEmbedder`]**: calls the OpenAI embeddings API with batching, retry, and backoff.
//! - **[`OllamaEmbedder`]**: calls a local Ollama instance's `/api/embed` endpoint.
//! - **[`HashEmbedder`]**: offline feature-hashing vectors for development and tests.
//!
//! Also provides vector utilities used by the index backends:
//! - [`cosine_similarity`] / [`cosine_distance`]
//! - [`vec_to_blob`] / [`blob_to_vec`]: little-endian `f32` BLOB encoding
//!
//! # Retry Strategy
//!
//! The HTTP embedders retry transient errors with exponential backoff:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors and timeouts → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)
//!
//! Exhausted retries surface as a retryable [`KbError::EmbeddingFailure`];
//! the knowledge-base manager never retries on its own.

mod hash;

pub use hash::HashEmbedder;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::EmbeddingConfig;
use crate::error::{KbError, KbResult};

/// Converts text into fixed-length vectors.
///
/// Implementations must return exactly one vector per input, in input
/// order, each of length [`dims`](Embedder::dims).
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;

    /// Returns the embedding vector dimensionality (e.g. `1536`).
    fn dims(&self) -> usize;

    /// Embed a batch of texts.
    async fn embed_many(&self, texts: &[String]) -> KbResult<Vec<Vec<f32>>>;

    /// Embed a single text (e.g. a search query).
    async fn embed_one(&self, text: &str) -> KbResult<Vec<f32>> {
        let results = self.embed_many(&[text.to_string()]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| KbError::embedding("Empty embedding response"))
    }
}

/// Reject a batch whose shape does not match the request.
pub fn check_batch(expected: usize, dims: usize, vectors: &[Vec<f32>]) -> KbResult<()> {
    if vectors.len() != expected {
        return Err(KbError::embedding(format!(
            "expected {} embeddings, got {}",
            expected,
            vectors.len()
        )));
    }
    if let Some(bad) = vectors.iter().find(|v| v.len() != dims) {
        return Err(KbError::embedding(format!(
            "expected {} dimensions, got {}",
            dims,
            bad.len()
        )));
    }
    Ok(())
}

// ============ Disabled ============

/// An embedder that always fails.
///
/// Used when `embedding.provider = "disabled"`. Listing and deleting
/// documents still work; adding and searching do not.
pub struct DisabledEmbedder;

#[async_trait]
impl Embedder for DisabledEmbedder {
    fn model_name(&self) -> &str {
        "disabled"
    }

    fn dims(&self) -> usize {
        0
    }

    async fn embed_many(&self, _texts: &[String]) -> KbResult<Vec<Vec<f32>>> {
        Err(KbError::embedding(
            "Embedding provider is disabled. Set [embedding] provider in config.",
        ))
    }
}

// ============ OpenAI ============

/// Embedder backed by the OpenAI embeddings API.
///
/// Calls `POST {url}/v1/embeddings` (default `https://api.openai.com`).
/// Requires the `OPENAI_API_KEY` environment variable.
pub struct OpenAIEmbedder {
    client: reqwest::Client,
    api_key: String,
    url: String,
    model: String,
    dims: usize,
    batch_size: usize,
    max_retries: u32,
}

impl OpenAIEmbedder {
    /// Create a new OpenAI embedder from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `model` or `dims` is not set in config,
    /// or if `OPENAI_API_KEY` is not in the environment.
    pub fn new(config: &EmbeddingConfig) -> anyhow::Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("embedding.model required for OpenAI provider"))?;
        let dims = config
            .dims
            .ok_or_else(|| anyhow::anyhow!("embedding.dims required for OpenAI provider"))?;
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            url: config
                .url
                .clone()
                .unwrap_or_else(|| "https://api.openai.com".to_string()),
            model,
            dims,
            batch_size: config.batch_size.max(1),
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_many(&self, texts: &[String]) -> KbResult<Vec<Vec<f32>>> {
        let mut all = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            let body = serde_json::json!({
                "model": self.model,
                "input": batch,
            });
            let request = self
                .client
                .post(format!("{}/v1/embeddings", self.url))
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&body);

            let json = send_with_retry(request, self.max_retries, "OpenAI").await?;
            let vectors = parse_openai_response(&json)?;
            check_batch(batch.len(), self.dims, &vectors)?;
            all.extend(vectors);
        }

        Ok(all)
    }
}

/// Parse the OpenAI embeddings response, ordered by each item's `index`.
fn parse_openai_response(json: &serde_json::Value) -> KbResult<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| KbError::embedding("Invalid OpenAI response: missing data array"))?;

    let mut indexed = Vec::with_capacity(data.len());

    for (pos, item) in data.iter().enumerate() {
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| KbError::embedding("Invalid OpenAI response: missing embedding"))?;
        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .map(|i| i as usize)
            .unwrap_or(pos);

        indexed.push((index, json_to_vec(embedding)?));
    }

    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

// ============ Ollama ============

/// Embedder backed by a local Ollama instance.
///
/// Calls `POST {url}/api/embed` (default `http://localhost:11434`).
pub struct OllamaEmbedder {
    client: reqwest::Client,
    url: String,
    model: String,
    dims: usize,
    batch_size: usize,
    max_retries: u32,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> anyhow::Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("embedding.model required for Ollama provider"))?;
        let dims = config
            .dims
            .ok_or_else(|| anyhow::anyhow!("embedding.dims required for Ollama provider"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            url: config
                .url
                .clone()
                .unwrap_or_else(|| "http://localhost:11434".to_string()),
            model,
            dims,
            batch_size: config.batch_size.max(1),
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_many(&self, texts: &[String]) -> KbResult<Vec<Vec<f32>>> {
        let mut all = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            let body = serde_json::json!({
                "model": self.model,
                "input": batch,
            });
            let request = self
                .client
                .post(format!("{}/api/embed", self.url))
                .json(&body);

            let json = send_with_retry(request, self.max_retries, "Ollama").await?;
            let vectors = parse_ollama_response(&json)?;
            check_batch(batch.len(), self.dims, &vectors)?;
            all.extend(vectors);
        }

        Ok(all)
    }
}

fn parse_ollama_response(json: &serde_json::Value) -> KbResult<Vec<Vec<f32>>> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| KbError::embedding("Invalid Ollama response: missing embeddings array"))?;

    embeddings
        .iter()
        .map(|embedding| {
            let values = embedding.as_array().ok_or_else(|| {
                KbError::embedding("Invalid Ollama response: embedding is not an array")
            })?;
            json_to_vec(values)
        })
        .collect()
}

// ============ Shared HTTP plumbing ============

/// Send a JSON request, retrying transient failures with exponential backoff.
async fn send_with_retry(
    request: reqwest::RequestBuilder,
    max_retries: u32,
    label: &str,
) -> KbResult<serde_json::Value> {
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tracing::warn!(provider = label, attempt, ?delay, "retrying embedding request");
            tokio::time::sleep(delay).await;
        }

        let request = request
            .try_clone()
            .ok_or_else(|| KbError::embedding("embedding request body is not cloneable"))?;

        match request.send().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    return response.json().await.map_err(|e| {
                        KbError::embedding(format!("{} response was not JSON: {}", label, e))
                    });
                }

                let body_text = response.text().await.unwrap_or_default();

                // Rate limited or server error, retry
                if status.as_u16() == 429 || status.is_server_error() {
                    last_err = Some(format!("{} API error {}: {}", label, status, body_text));
                    continue;
                }

                return Err(KbError::embedding(format!(
                    "{} API error {}: {}",
                    label, status, body_text
                )));
            }
            Err(e) if e.is_timeout() => {
                last_err = Some(format!("{} request timed out: {}", label, e));
            }
            Err(e) => {
                last_err = Some(format!("{} connection error: {}", label, e));
            }
        }
    }

    Err(KbError::embedding_retryable(last_err.unwrap_or_else(|| {
        format!("{} embedding failed after retries", label)
    })))
}

fn json_to_vec(values: &[serde_json::Value]) -> KbResult<Vec<f32>> {
    values
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| KbError::embedding("embedding contains a non-numeric value"))
        })
        .collect()
}

// ============ Construction ============

/// Create the [`Embedder`] selected by configuration.
///
/// | Config Value | Embedder |
/// |-------------|----------|
/// | `"disabled"` | [`DisabledEmbedder`] |
/// | `"openai"` | [`OpenAIEmbedder`] |
/// | `"ollama"` | [`OllamaEmbedder`] |
/// | `"hash"` | [`HashEmbedder`] |
pub fn create_embedder(config: &EmbeddingConfig) -> anyhow::Result<Arc<dyn Embedder>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledEmbedder)),
        "openai" => Ok(Arc::new(OpenAIEmbedder::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaEmbedder::new(config)?)),
        "hash" => Ok(Arc::new(HashEmbedder::new(config.dims.unwrap_or(256)))),
        other => anyhow::bail!("Unknown embedding provider: {}", other),
    }
}

// ============ Vector utilities ============

/// Encode a float vector as a BLOB (little-endian f32 bytes).
///
/// ```rust
/// use rag_chat::embedding::{vec_to_blob, blob_to_vec};
///
/// let v = vec![1.0f32, -2.5, 3.125];
/// let blob = vec_to_blob(&v);
/// assert_eq!(blob.len(), 12); // 3 × 4 bytes
/// assert_eq!(blob_to_vec(&blob), v);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`, or `0.0` for empty vectors, zero
/// vectors, or vectors of different lengths.
///
/// ```text
///            a · b
/// cos(θ) = ─────────
///          ‖a‖ × ‖b‖
/// ```
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

/// Cosine distance: `1 - cosine_similarity`, in `[0.0, 2.0]`.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}
