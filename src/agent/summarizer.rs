//! Summarizer agent.
//!
//! Reached only through the controller's handoff. Writes the final answer
//! from the research facts; nothing runs after it.

use tracing::debug;

use super::config::{AgentConfig, ModelTier};
use super::prompt::build_summarizer_prompt;
use super::provider::LlmProvider;
use super::research::Fact;
use super::tool::ToolSet;
use super::traits::{Agent, AgentDefinition};
use crate::error::AgentError;

/// Agent that turns facts into the final bullet-point answer.
pub struct SummarizerAgent {
    definition: AgentDefinition,
}

impl SummarizerAgent {
    /// Creates a summarizer on the lightweight model.
    #[must_use]
    pub fn new(config: &AgentConfig, instructions: String) -> Self {
        Self {
            definition: AgentDefinition::new(
                "summarizer",
                ModelTier::Lightweight,
                config,
                instructions,
                ToolSet::none(),
            ),
        }
    }

    /// Summarizes `facts` as the answer to `query`.
    ///
    /// # Errors
    ///
    /// Propagates model-call failures. Returns [`AgentError::Orchestration`]
    /// if the model produced no text.
    pub async fn summarize(
        &self,
        provider: &dyn LlmProvider,
        query: &str,
        facts: &[Fact],
    ) -> Result<String, AgentError> {
        let response = self
            .execute(provider, &build_summarizer_prompt(query, facts))
            .await?;
        let text = response.content.trim();
        if text.is_empty() {
            return Err(AgentError::Orchestration {
                message: "summarizer returned an empty answer".to_string(),
            });
        }
        debug!(facts = facts.len(), chars = text.len(), "summary ready");
        Ok(text.to_string())
    }
}

impl Agent for SummarizerAgent {
    fn definition(&self) -> &AgentDefinition {
        &self.definition
    }
}
