//! Agent trait definition.
//!
//! All agents (planning, research, summarizer, controller) implement this
//! trait, which gives the pipeline one way to build requests and run them.

use async_trait::async_trait;

use super::agentic_loop::{LoopOutcome, ToolDispatch, agentic_loop};
use super::config::{AgentConfig, ModelTier};
use super::message::{ChatRequest, TokenUsage};
use super::provider::LlmProvider;
use super::tool::ToolSet;
use crate::error::AgentError;

/// Response from an agent execution.
#[derive(Debug, Clone)]
pub struct AgentResponse {
    /// The agent's text output.
    pub content: String,
    /// Token usage for this call.
    pub usage: TokenUsage,
    /// Why the model stopped generating (e.g. `"stop"`, `"length"`).
    pub finish_reason: Option<String>,
}

/// A named role bound to a model, instructions and delegations.
///
/// Immutable once the pipeline is built.
#[derive(Debug, Clone)]
pub struct AgentDefinition {
    name: &'static str,
    tier: ModelTier,
    model: String,
    instructions: String,
    temperature: f32,
    max_tokens: u32,
    max_tool_iterations: usize,
    tools: ToolSet,
}

impl AgentDefinition {
    /// Binds a role to the model `config` resolves for `tier`.
    #[must_use]
    pub fn new(
        name: &'static str,
        tier: ModelTier,
        config: &AgentConfig,
        instructions: String,
        tools: ToolSet,
    ) -> Self {
        Self {
            name,
            tier,
            model: config.model_for(tier).to_string(),
            instructions,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_tool_iterations: config.max_tool_iterations,
            tools,
        }
    }

    /// Model tier.
    #[must_use]
    pub const fn tier(&self) -> ModelTier {
        self.tier
    }
}

/// Trait implemented by all agents in the system.
#[async_trait]
pub trait Agent: Send + Sync {
    /// The role this agent plays.
    fn definition(&self) -> &AgentDefinition;

    /// Agent name for logging and identification.
    fn name(&self) -> &'static str {
        self.definition().name
    }

    /// Model identifier to use for this agent.
    fn model(&self) -> &str {
        &self.definition().model
    }

    /// Instructions that define the agent's role.
    fn instructions(&self) -> &str {
        &self.definition().instructions
    }

    /// Whether to request JSON-formatted output.
    fn json_mode(&self) -> bool {
        false
    }

    /// Tools and handoffs available to this agent.
    fn tools(&self) -> &ToolSet {
        &self.definition().tools
    }

    /// Builds the opening request for `input`.
    fn request(&self, input: &str) -> ChatRequest {
        let definition = self.definition();
        let mut request = ChatRequest::new(self.model(), self.instructions(), input);
        request.temperature = Some(definition.temperature);
        request.max_tokens = Some(definition.max_tokens);
        request.json_mode = self.json_mode();
        request.tools = self.tools().definitions().to_vec();
        request
    }

    /// Executes the agent with the given user message (no tools).
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on model-call failures.
    async fn execute(
        &self,
        provider: &dyn LlmProvider,
        input: &str,
    ) -> Result<AgentResponse, AgentError> {
        let mut request = self.request(input);
        request.tools.clear();

        let response = provider.chat(&request).await?;

        Ok(AgentResponse {
            content: response.content,
            usage: response.usage,
            finish_reason: response.finish_reason,
        })
    }
}

/// Executes an agent with tool-calling support.
///
/// Agents without tools are run as a single model call wrapped in
/// [`LoopOutcome::Final`].
///
/// # Errors
///
/// Returns [`AgentError`] on model-call failures, dispatch failures, or if
/// the tool loop exceeds the agent's iteration limit.
pub async fn execute_with_tools(
    agent: &dyn Agent,
    provider: &dyn LlmProvider,
    input: &str,
    dispatch: &dyn ToolDispatch,
) -> Result<LoopOutcome, AgentError> {
    let mut request = agent.request(input);
    let max_iterations = if request.tools.is_empty() {
        1
    } else {
        agent.definition().max_tool_iterations
    };
    agentic_loop(provider, &mut request, dispatch, max_iterations).await
}
