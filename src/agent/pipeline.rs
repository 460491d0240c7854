//! The research pipeline: controller → planning → research → summarizer.
//!
//! The controller runs an agentic loop in which planning and research are
//! tools. When it hands off, the summarizer writes the answer from the
//! gathered facts and the controller does not run again.

use async_trait::async_trait;
use tracing::info;

use super::adapters::ToolAdapters;
use super::agentic_loop::LoopOutcome;
use super::config::AgentConfig;
use super::controller::{ControllerAgent, ControllerDispatch};
use super::planning::PlanningAgent;
use super::prompt::PromptSet;
use super::research::ResearchAgent;
use super::summarizer::SummarizerAgent;
use super::tool::SUMMARIZER_HANDOFF;
use super::traits::execute_with_tools;
use crate::capability::CapabilityClients;
use crate::error::AgentError;

/// Something that answers a query with the given clients.
#[async_trait]
pub trait ResearchPipeline: Send + Sync {
    /// Runs one query to completion.
    ///
    /// # Errors
    ///
    /// Any stage failure fails the whole run; there is no partial result.
    async fn run(&self, clients: &CapabilityClients, query: &str) -> Result<String, AgentError>;
}

/// The four-agent pipeline.
pub struct AgentPipeline {
    planning: PlanningAgent,
    research: ResearchAgent,
    summarizer: SummarizerAgent,
    controller: ControllerAgent,
    search_max_results: usize,
}

impl AgentPipeline {
    /// Builds the agents, loading instructions from
    /// [`AgentConfig::prompt_dir`] with compiled-in fallbacks.
    #[must_use]
    pub fn new(config: &AgentConfig) -> Self {
        Self::with_prompts(config, PromptSet::load(config.prompt_dir.as_deref()))
    }

    /// Builds the agents with explicit instructions.
    #[must_use]
    pub fn with_prompts(config: &AgentConfig, prompts: PromptSet) -> Self {
        Self {
            planning: PlanningAgent::new(config, prompts.planning),
            research: ResearchAgent::new(config, prompts.research),
            summarizer: SummarizerAgent::new(config, prompts.summarizer),
            controller: ControllerAgent::new(config, prompts.controller),
            search_max_results: config.search_max_results,
        }
    }
}

#[async_trait]
impl ResearchPipeline for AgentPipeline {
    async fn run(&self, clients: &CapabilityClients, query: &str) -> Result<String, AgentError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AgentError::Validation {
                message: "query must not be empty".to_string(),
            });
        }

        let provider = clients.model.as_ref();
        let adapters = ToolAdapters::new(clients.search.clone(), self.search_max_results);
        let dispatch =
            ControllerDispatch::new(query, provider, &adapters, &self.planning, &self.research);

        info!(stage = "controller", "pipeline started");
        let outcome = execute_with_tools(&self.controller, provider, query, &dispatch).await?;
        info!(
            stage = "controller",
            total_tokens = outcome.usage().total_tokens,
            "controller loop finished"
        );
        match outcome {
            LoopOutcome::Handoff { target, .. } if target == SUMMARIZER_HANDOFF => {
                let facts = dispatch.facts().unwrap_or_default();
                info!(stage = "summarizer", facts = facts.len(), "handed off to summarizer");
                self.summarizer.summarize(provider, query, &facts).await
            }
            LoopOutcome::Handoff { target, .. } => Err(AgentError::Orchestration {
                message: format!("unknown handoff target '{target}'"),
            }),
            LoopOutcome::Final(response) => {
                let text = response.content.trim();
                if text.is_empty() {
                    return Err(AgentError::Orchestration {
                        message: "controller finished without an answer".to_string(),
                    });
                }
                info!(stage = "controller", "controller answered without handoff");
                Ok(text.to_string())
            }
        }
    }
}
