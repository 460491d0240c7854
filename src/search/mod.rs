//! Web search and context extraction handles.
//!
//! The pipeline only sees [`SearchProvider`]; [`TavilyClient`] is the
//! concrete HTTP implementation.

pub mod tavily;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AgentError;

pub use tavily::TavilyClient;

/// One search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Page title.
    #[serde(default)]
    pub title: String,
    /// Page URL.
    pub url: String,
    /// Snippet of matching content.
    #[serde(alias = "content")]
    pub snippet: String,
}

/// Search response returned to the research agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Query that produced these hits.
    pub query: String,
    /// Hits in ranking order.
    pub results: Vec<SearchHit>,
}

/// Extracted page content keyed by URL.
pub type ContextMap = BTreeMap<String, String>;

/// Search/extraction capability used by the tool adapters.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &'static str;

    /// Runs a web search returning at most `max_results` hits.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Search`] on transport or API failure.
    async fn search(&self, query: &str, max_results: usize) -> Result<SearchResult, AgentError>;

    /// Extracts page content for each URL.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Extraction`] on transport or API failure.
    async fn extract(&self, urls: &[String]) -> Result<ContextMap, AgentError>;
}
