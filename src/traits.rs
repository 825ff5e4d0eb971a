//! Tool extension point for agent orchestration.
//!
//! Agents discover tools through a [`ToolRegistry`] and call them with JSON
//! parameters. The only built-in is [`RetrieveTool`], which the orchestrator
//! exposes to the knowledge-base agent when the router decides a question
//! needs retrieval.
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │              ToolRegistry                │
//! │  ┌──────────────────────┐ ┌────────────┐ │
//! │  │ Built-in             │ │  Custom    │ │
//! │  │ retrieve_from_       │ │  (Rust)    │ │
//! │  │ knowledge_base       │ │  Tools     │ │
//! │  └──────────────────────┘ └────────────┘ │
//! └──────────────┬───────────────────────────┘
//!                ▼
//!       agent function-calling loop
//! ```
//!
//! # Usage
//!
//! ```rust
//! use rag_chat::traits::ToolRegistry;
//!
//! let tools = ToolRegistry::with_builtins();
//! assert!(tools.find("retrieve_from_knowledge_base").is_some());
//! ```

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::retrieval::RetrievalTool;

// ═══════════════════════════════════════════════════════════════════════
// Tool Trait
// ═══════════════════════════════════════════════════════════════════════

/// A tool that agents can discover and call.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use anyhow::Result;
/// use serde_json::{json, Value};
/// use rag_chat::traits::{Tool, ToolContext};
///
/// pub struct HasKnowledgeTool;
///
/// #[async_trait]
/// impl Tool for HasKnowledgeTool {
///     fn name(&self) -> &str { "has_knowledge" }
///     fn description(&self) -> &str { "Whether the knowledge base has any content" }
///
///     fn parameters_schema(&self) -> Value {
///         json!({ "type": "object", "properties": {}, "required": [] })
///     }
///
///     async fn execute(&self, _params: Value, ctx: &ToolContext) -> Result<Value> {
///         let hits = ctx.retrieval().search("", Some(1)).await?;
///         Ok(json!({ "any": !hits.is_empty() }))
///     }
/// }
/// ```
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the tool's name, a lowercase identifier with underscores.
    fn name(&self) -> &str;

    /// Returns a one-line description for agent discovery.
    ///
    /// Agents use this to decide whether to call the tool.
    fn description(&self) -> &str;

    /// Whether this tool ships with the crate. Defaults to `false`.
    fn is_builtin(&self) -> bool {
        false
    }

    /// Returns the OpenAI function-calling JSON Schema for parameters.
    fn parameters_schema(&self) -> Value;

    /// Execute the tool with JSON parameters (always a JSON object).
    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value>;
}

// ═══════════════════════════════════════════════════════════════════════
// ToolContext
// ═══════════════════════════════════════════════════════════════════════

/// Bridge from a tool invocation to the knowledge base.
pub struct ToolContext {
    retrieval: Arc<RetrievalTool>,
}

impl ToolContext {
    pub fn new(retrieval: Arc<RetrievalTool>) -> Self {
        Self { retrieval }
    }

    pub fn retrieval(&self) -> &RetrievalTool {
        &self.retrieval
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Built-in Tool Implementations
// ═══════════════════════════════════════════════════════════════════════

/// Built-in retrieval tool. Delegates to [`RetrievalTool::retrieve`].
pub struct RetrieveTool;

#[async_trait]
impl Tool for RetrieveTool {
    fn name(&self) -> &str {
        "retrieve_from_knowledge_base"
    }

    fn description(&self) -> &str {
        "Retrieve relevant passages from the knowledge base to answer a question"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "question": { "type": "string", "description": "The user's question" },
                "k": { "type": "integer", "description": "Number of passages to return", "minimum": 1 }
            },
            "required": ["question"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let question = params["question"].as_str().unwrap_or("");
        if question.trim().is_empty() {
            anyhow::bail!("question must not be empty");
        }

        let k = params["k"].as_u64().map(|k| (k as usize).max(1));
        let context = ctx.retrieval.retrieve(question, k).await?;

        Ok(serde_json::json!({ "context": context }))
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Registry
// ═══════════════════════════════════════════════════════════════════════

/// Registry for tools (built-in and custom Rust).
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty tool registry.
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Create a tool registry pre-loaded with the retrieval tool.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(RetrieveTool));
        registry
    }

    /// Register a tool.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(tool);
    }

    /// Get all registered tools.
    pub fn tools(&self) -> &[Box<dyn Tool>] {
        &self.tools
    }

    /// Find a tool by name.
    pub fn find(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Return the count of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
