//! Per-question agent routing.
//!
//! A [`QuestionRouter`] decides whether a question should go to the
//! knowledge-base agent (which may call the retrieval tool) or to the plain
//! agent. Routing is pure and never fails.

use serde::Serialize;

use crate::config::RouterConfig;

/// Which agent answers a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Agent {
    KnowledgeBase,
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RouteDecision {
    pub needs_retrieval: bool,
}

impl RouteDecision {
    pub fn agent(&self) -> Agent {
        if self.needs_retrieval {
            Agent::KnowledgeBase
        } else {
            Agent::Plain
        }
    }
}

pub trait QuestionRouter: Send + Sync {
    fn route(&self, question: &str) -> RouteDecision;
}

/// Routes to retrieval when the question mentions any configured keyword.
///
/// Matching is a case-insensitive substring test, so `"koala"` also
/// matches `"Koalas"`.
#[derive(Debug, Clone)]
pub struct KeywordRouter {
    keywords: Vec<String>,
}

impl KeywordRouter {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &RouterConfig) -> Self {
        Self::new(&config.keywords)
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }
}

impl Default for KeywordRouter {
    fn default() -> Self {
        Self::from_config(&RouterConfig::default())
    }
}

impl QuestionRouter for KeywordRouter {
    fn route(&self, question: &str) -> RouteDecision {
        let question = question.to_lowercase();
        RouteDecision {
            needs_retrieval: self.keywords.iter().any(|k| question.contains(k.as_str())),
        }
    }
}
