//! Parallel research agent.
//!
//! Runs one tool-enabled loop per planned step, several at a time, and
//! collects the facts each step reports. Steps share nothing but the
//! adapters, so they may finish in any order.

use futures_util::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::adapters::ToolAdapters;
use super::config::{AgentConfig, ModelTier};
use super::prompt::build_research_prompt;
use super::provider::LlmProvider;
use super::tool::ToolSet;
use super::traits::{Agent, AgentDefinition, execute_with_tools};
use crate::error::AgentError;

/// Maximum facts kept from a single step.
const MAX_FACTS_PER_STEP: usize = 20;

/// A fact snippet with provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fact {
    /// Step that produced the fact.
    pub step: String,
    /// The fact itself.
    pub fact: String,
    /// Source URL, when the model reported one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Deserialize)]
struct ReportedFact {
    fact: String,
    #[serde(default, alias = "url")]
    source: Option<String>,
}

#[derive(Deserialize)]
struct FactsEnvelope {
    facts: Vec<ReportedFact>,
}

/// Agent that researches steps with `search` and `extract_context`.
pub struct ResearchAgent {
    definition: AgentDefinition,
    max_concurrency: usize,
}

impl ResearchAgent {
    /// Creates a research agent on the standard model.
    #[must_use]
    pub fn new(config: &AgentConfig, instructions: String) -> Self {
        Self {
            definition: AgentDefinition::new(
                "research",
                ModelTier::Standard,
                config,
                instructions,
                ToolSet::research_tools(),
            ),
            max_concurrency: config.max_concurrency.max(1),
        }
    }

    /// Researches every step and returns the combined facts.
    ///
    /// At most `max_concurrency` steps are in flight at once.
    ///
    /// # Errors
    ///
    /// The first failing step fails the whole stage.
    pub async fn research(
        &self,
        provider: &dyn LlmProvider,
        adapters: &ToolAdapters,
        query: &str,
        steps: &[String],
    ) -> Result<Vec<Fact>, AgentError> {
        let mut facts = Vec::new();
        for batch in steps.chunks(self.max_concurrency) {
            let per_step = try_join_all(
                batch
                    .iter()
                    .map(|step| self.research_step(provider, adapters, query, step)),
            )
            .await?;
            facts.extend(per_step.into_iter().flatten());
        }
        debug!(steps = steps.len(), facts = facts.len(), "research complete");
        Ok(facts)
    }

    async fn research_step(
        &self,
        provider: &dyn LlmProvider,
        adapters: &ToolAdapters,
        query: &str,
        step: &str,
    ) -> Result<Vec<Fact>, AgentError> {
        let input = build_research_prompt(query, step);
        let outcome = execute_with_tools(self, provider, &input, adapters).await?;
        debug!(step, total_tokens = outcome.usage().total_tokens, "research step finished");
        match outcome.final_text() {
            Some(text) => Ok(parse_facts(step, text)),
            None => Err(AgentError::Orchestration {
                message: "research agent cannot hand off".to_string(),
            }),
        }
    }
}

impl Agent for ResearchAgent {
    fn definition(&self) -> &AgentDefinition {
        &self.definition
    }
}

/// Parses reported facts. Non-JSON answers become a single unsourced fact.
fn parse_facts(step: &str, content: &str) -> Vec<Fact> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    let json_str = if trimmed.starts_with("```") {
        trimmed
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim()
    } else {
        trimmed
    };

    let reported = serde_json::from_str::<FactsEnvelope>(json_str)
        .map(|e| e.facts)
        .or_else(|_| serde_json::from_str::<Vec<ReportedFact>>(json_str));

    match reported {
        Ok(facts) => facts
            .into_iter()
            .filter(|f| !f.fact.trim().is_empty())
            .take(MAX_FACTS_PER_STEP)
            .map(|f| Fact {
                step: step.to_string(),
                fact: f.fact.trim().to_string(),
                source: f.source.filter(|s| !s.trim().is_empty()),
            })
            .collect(),
        Err(_) => vec![Fact {
            step: step.to_string(),
            fact: trimmed.to_string(),
            source: None,
        }],
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::agent::message::{ChatRequest, ChatResponse};
    use crate::agent::tool::{SEARCH_TOOL, ToolCall};
    use crate::search::{ContextMap, SearchHit, SearchProvider, SearchResult};

    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    /// Searches once per step, then reports one sourced fact.
    struct StepProvider;

    #[async_trait]
    impl LlmProvider for StepProvider {
        fn name(&self) -> &'static str {
            "step"
        }

        async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
            let searched = request.messages.iter().any(|m| !m.tool_calls.is_empty());
            if searched {
                return Ok(ChatResponse {
                    content: r#"{"facts":[{"fact":"learned","source":"https://x.example"}]}"#
                        .to_string(),
                    ..ChatResponse::default()
                });
            }
            Ok(ChatResponse {
                tool_calls: vec![ToolCall {
                    id: "s1".to_string(),
                    name: SEARCH_TOOL.to_string(),
                    arguments: r#"{"query":"anything"}"#.to_string(),
                }],
                ..ChatResponse::default()
            })
        }
    }

    struct CountingSearch {
        calls: AtomicUsize,
        fail: bool,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl SearchProvider for CountingSearch {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn search(&self, query: &str, _max: usize) -> Result<SearchResult, AgentError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if self.fail {
                return Err(AgentError::Search {
                    message: "HTTP 401: invalid key".to_string(),
                    source: None,
                });
            }
            Ok(SearchResult {
                query: query.to_string(),
                results: vec![SearchHit {
                    title: "x".to_string(),
                    url: "https://x.example".to_string(),
                    snippet: "x".to_string(),
                }],
            })
        }

        async fn extract(&self, _urls: &[String]) -> Result<ContextMap, AgentError> {
            Ok(ContextMap::new())
        }
    }

    fn adapters(fail: bool) -> (ToolAdapters, Arc<CountingSearch>) {
        let search = Arc::new(CountingSearch {
            calls: AtomicUsize::new(0),
            fail,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        (ToolAdapters::new(search.clone(), 2), search)
    }

    #[tokio::test]
    async fn test_research_collects_facts_per_step() {
        let agent = ResearchAgent::new(&AgentConfig::default(), "research".to_string());
        let (adapters, search) = adapters(false);
        let steps = vec!["alpha".to_string(), "beta".to_string(), "gamma".to_string()];

        let mut facts = agent
            .research(&StepProvider, &adapters, "q", &steps)
            .await
            .unwrap_or_else(|e| panic!("research: {e}"));
        facts.sort_by(|a, b| a.step.cmp(&b.step));

        let got: Vec<&str> = facts.iter().map(|f| f.step.as_str()).collect();
        assert_eq!(got, vec!["alpha", "beta", "gamma"]);
        assert!(facts.iter().all(|f| f.source.as_deref() == Some("https://x.example")));
        assert_eq!(search.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let config = AgentConfig::builder().max_concurrency(2).build();
        let agent = ResearchAgent::new(&config, "research".to_string());
        let (adapters, search) = adapters(false);
        let steps: Vec<String> = (1..=5).map(|n| format!("step {n}")).collect();

        let facts = agent
            .research(&StepProvider, &adapters, "q", &steps)
            .await
            .unwrap_or_else(|e| panic!("research: {e}"));

        assert_eq!(facts.len(), 5);
        assert_eq!(search.calls.load(Ordering::SeqCst), 5);
        let peak = search.peak.load(Ordering::SeqCst);
        assert!((1..=2).contains(&peak), "peak in-flight searches was {peak}");
    }

    #[tokio::test]
    async fn test_search_failure_fails_stage() {
        let agent = ResearchAgent::new(&AgentConfig::default(), "research".to_string());
        let (adapters, _) = adapters(true);
        let steps = vec!["alpha".to_string()];

        let err = agent
            .research(&StepProvider, &adapters, "q", &steps)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Search { .. }));
    }

    #[test]
    fn test_parse_facts_json_and_fallback() {
        let facts = parse_facts("s", r#"[{"fact":"A","url":"https://a"},{"fact":"  "}]"#);
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].source.as_deref(), Some("https://a"));

        let facts = parse_facts("s", "Plain prose answer.");
        assert_eq!(
            facts,
            vec![Fact {
                step: "s".to_string(),
                fact: "Plain prose answer.".to_string(),
                source: None,
            }]
        );

        assert!(parse_facts("s", "  ").is_empty());
    }

    #[test]
    fn test_agent_properties() {
        let config = AgentConfig::builder().standard_model("std").max_concurrency(0).build();
        let agent = ResearchAgent::new(&config, "r".to_string());
        assert_eq!(agent.name(), "research");
        assert_eq!(agent.model(), "std");
        assert_eq!(agent.tools().len(), 2);
        assert_eq!(agent.max_concurrency, 1);
    }
}
