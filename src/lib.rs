//! # RAG Chat
//!
//! The retrieval core of a retrieval-augmented question-answering chat
//! service.
//!
//! Documents are identified by the hash of their normalized text, split into
//! overlapping chunks, embedded, and stored in a vector index. At question
//! time a router decides whether the knowledge base is needed, and the
//! retrieval tool returns source-attributed passages for the agent to ground
//! its answer in. Chat sessions and their messages are kept alongside the
//! index in the same SQLite database.
//!
//! ## Architecture
//!
//! ```text
//!  document ──▶ ┌───────────────┐   ┌─────────┐   ┌──────────┐
//!               │ KnowledgeBase │──▶│ Chunker │──▶│ Embedder │
//!               └───────┬───────┘   └─────────┘   └────┬─────┘
//!                       │ replace by hash              │
//!                       ▼                              ▼
//!               ┌─────────────────────────────────────────┐
//!               │       VectorIndex (SQLite / memory)     │
//!               └───────────────────▲─────────────────────┘
//!                                   │ k nearest
//!  question ──▶ Router ──▶ RetrievalTool ──▶ "From koalas.txt:\n…"
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! ragchat init
//! ragchat add ./knowledge/koalas.txt
//! ragchat retrieve "What do koalas eat?"
//! ragchat route "What is 2+2?"
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types and content hashing |
//! | [`error`] | Typed retrieval-core errors |
//! | [`chunk`] | Boundary-aware overlapping chunker |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`store`] | Vector index trait and backends |
//! | [`locks`] | Per-key async locks |
//! | [`knowledge`] | Knowledge-base manager |
//! | [`retrieval`] | Query-time retrieval and formatting |
//! | [`router`] | Keyword question router |
//! | [`traits`] | Agent tool extension point |
//! | [`chat_store`] | Chat session persistence |
//! | [`context`] | Application context wiring |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`logging`] | Tracing subscriber setup |

pub mod chat_store;
pub mod chunk;
pub mod commands;
pub mod config;
pub mod context;
pub mod db;
pub mod embedding;
pub mod error;
pub mod knowledge;
pub mod locks;
pub mod logging;
pub mod migrate;
pub mod models;
pub mod retrieval;
pub mod router;
pub mod stats;
pub mod store;
pub mod traits;
