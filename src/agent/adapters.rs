//! `search` and `extract_context` tool adapters.
//!
//! Stateless wrappers over the active [`SearchProvider`]: no caching, no
//! URL de-duplication, and a failing call fails the whole adapter call.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::agentic_loop::ToolDispatch;
use super::tool::{EXTRACT_CONTEXT_TOOL, SEARCH_TOOL, ToolCall, ToolResult};
use crate::error::AgentError;
use crate::search::{ContextMap, SearchProvider, SearchResult};

/// Adapters the research agent calls through function-calling.
#[derive(Clone)]
pub struct ToolAdapters {
    search: Arc<dyn SearchProvider>,
    max_results: usize,
}

impl ToolAdapters {
    /// Creates adapters over `search`, requesting `max_results` per search.
    #[must_use]
    pub fn new(search: Arc<dyn SearchProvider>, max_results: usize) -> Self {
        Self {
            search,
            max_results,
        }
    }

    /// Results requested per search.
    #[must_use]
    pub const fn max_results(&self) -> usize {
        self.max_results
    }

    /// Searches the web.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Search`] when the handle fails.
    pub async fn search(&self, query: &str) -> Result<SearchResult, AgentError> {
        self.search
            .search(query, self.max_results)
            .await
            .map_err(|e| match e {
                e @ AgentError::Search { .. } => e,
                other => AgentError::Search {
                    message: other.to_string(),
                    source: Some(Box::new(other)),
                },
            })
    }

    /// Extracts page content for `urls`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Extraction`] when the handle fails.
    pub async fn extract_context(&self, urls: &[String]) -> Result<ContextMap, AgentError> {
        self.search.extract(urls).await.map_err(|e| match e {
            e @ AgentError::Extraction { .. } => e,
            other => AgentError::Extraction {
                message: other.to_string(),
                source: Some(Box::new(other)),
            },
        })
    }
}

/// Unknown tools and malformed arguments come back as error results the
/// model can correct. Failures of the external call itself are returned as
/// `Err` and abort the run.
#[async_trait]
impl ToolDispatch for ToolAdapters {
    async fn dispatch(&self, call: &ToolCall) -> Result<ToolResult, AgentError> {
        #[derive(Deserialize)]
        struct SearchArgs {
            query: String,
        }
        #[derive(Deserialize)]
        struct ExtractArgs {
            urls: Vec<String>,
        }

        debug!(tool = %call.name, call_id = %call.id, "dispatching research tool");
        match call.name.as_str() {
            SEARCH_TOOL => {
                let args: SearchArgs = match serde_json::from_str(&call.arguments) {
                    Ok(args) => args,
                    Err(e) => return Ok(ToolResult::error(call, format!("invalid arguments: {e}"))),
                };
                let result = self.search(&args.query).await?;
                Ok(ToolResult::ok(call, to_json(SEARCH_TOOL, &result)?))
            }
            EXTRACT_CONTEXT_TOOL => {
                let args = match serde_json::from_str::<ExtractArgs>(&call.arguments) {
                    Ok(args) if !args.urls.is_empty() => args,
                    Ok(_) => return Ok(ToolResult::error(call, "urls must not be empty")),
                    Err(e) => return Ok(ToolResult::error(call, format!("invalid arguments: {e}"))),
                };
                let context = self.extract_context(&args.urls).await?;
                Ok(ToolResult::ok(call, to_json(EXTRACT_CONTEXT_TOOL, &context)?))
            }
            other => Ok(ToolResult::error(call, format!("unknown tool '{other}'"))),
        }
    }
}

fn to_json<T: serde::Serialize>(tool: &str, value: &T) -> Result<String, AgentError> {
    serde_json::to_string(value).map_err(|e| AgentError::ToolExecution {
        name: tool.to_string(),
        message: format!("serialization error: {e}"),
    })
}

impl std::fmt::Debug for ToolAdapters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolAdapters")
            .field("search", &self.search.name())
            .field("max_results", &self.max_results)
            .finish()
    }
}
