//! TOML configuration parsing and validation.
//!
//! The configuration file (default `./config/ragchat.toml`) controls the
//! database location, chunking, retrieval depth, vector index backend,
//! embedding provider, router keywords, and logging.
//!
//! ```toml
//! [db]
//! path = "./data/ragchat.sqlite"
//!
//! [chunking]
//! chunk_size = 1000
//! chunk_overlap = 200
//!
//! [retrieval]
//! top_k = 5
//!
//! [embedding]
//! provider = "openai"
//! model = "text-embedding-3-small"
//! dims = 1536
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub router: RouterConfig,
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    5
}

/// Which [`VectorIndex`](crate::store::VectorIndex) backend to open.
#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    #[serde(default = "default_index_backend")]
    pub backend: String,
    /// Upper bound on any single index operation.
    #[serde(default = "default_index_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend: default_index_backend(),
            timeout_secs: default_index_timeout_secs(),
        }
    }
}

fn default_index_backend() -> String {
    "sqlite".to_string()
}
fn default_index_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL override (OpenAI-compatible gateway or Ollama host).
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            dims: None,
            url: None,
            batch_size: 64,
            max_retries: 5,
            timeout_secs: 30,
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RouterConfig {
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            keywords: default_keywords(),
        }
    }
}

fn default_keywords() -> Vec<String> {
    ["koala", "lion", "rabbit", "animal", "habitat", "species"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Optional directory of retained document originals (`*.txt`).
#[derive(Debug, Deserialize, Clone, Default)]
pub struct KnowledgeConfig {
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl Config {
    /// A config with every default and the given database path.
    pub fn minimal(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db: DbConfig {
                path: db_path.into(),
            },
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            index: IndexConfig::default(),
            embedding: EmbeddingConfig::default(),
            router: RouterConfig::default(),
            knowledge: KnowledgeConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            bail!("chunking.chunk_size must be > 0");
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            bail!("chunking.chunk_overlap must be smaller than chunking.chunk_size");
        }

        if self.retrieval.top_k < 1 {
            bail!("retrieval.top_k must be >= 1");
        }

        match self.index.backend.as_str() {
            "sqlite" | "memory" => {}
            other => bail!(
                "Unknown index backend: '{}'. Must be sqlite or memory.",
                other
            ),
        }
        if self.index.timeout_secs == 0 {
            bail!("index.timeout_secs must be > 0");
        }

        match self.embedding.provider.as_str() {
            "disabled" | "openai" | "ollama" | "hash" => {}
            other => bail!(
                "Unknown embedding provider: '{}'. Must be disabled, openai, ollama, or hash.",
                other
            ),
        }

        if self.embedding.is_enabled() {
            if self.embedding.dims.is_none() || self.embedding.dims == Some(0) {
                bail!(
                    "embedding.dims must be > 0 when provider is '{}'",
                    self.embedding.provider
                );
            }
            if self.embedding.model.is_none() && self.embedding.provider != "hash" {
                bail!(
                    "embedding.model must be specified when provider is '{}'",
                    self.embedding.provider
                );
            }
            if self.embedding.batch_size == 0 {
                bail!("embedding.batch_size must be > 0");
            }
        }

        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;

    Ok(config)
}
