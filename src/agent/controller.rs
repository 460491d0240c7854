//! Controller agent and its delegation dispatcher.
//!
//! The controller sees planning and research as call-and-return tools and
//! the summarizer as a one-way handoff. [`ControllerDispatch`] runs the
//! delegated agents and keeps the stages in order: a research call before a
//! plan exists, or a handoff before research finished, is answered with a
//! corrective tool error instead of running.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use super::adapters::ToolAdapters;
use super::agentic_loop::ToolDispatch;
use super::config::{AgentConfig, ModelTier};
use super::planning::PlanningAgent;
use super::provider::LlmProvider;
use super::research::{Fact, ResearchAgent};
use super::tool::{
    PARALLEL_RESEARCH_TOOL, PLANNING_TOOL, SUMMARIZER_HANDOFF, ToolCall, ToolResult, ToolSet,
};
use super::traits::{Agent, AgentDefinition};
use crate::error::AgentError;

/// Entry agent of the pipeline.
pub struct ControllerAgent {
    definition: AgentDefinition,
}

impl ControllerAgent {
    /// Creates a controller on the standard model.
    #[must_use]
    pub fn new(config: &AgentConfig, instructions: String) -> Self {
        Self {
            definition: AgentDefinition::new(
                "controller",
                ModelTier::Standard,
                config,
                instructions,
                ToolSet::controller_delegations(),
            ),
        }
    }
}

impl Agent for ControllerAgent {
    fn definition(&self) -> &AgentDefinition {
        &self.definition
    }
}

/// Stage progress of one controller turn.
#[derive(Debug, Default)]
struct Stages {
    steps: Option<Vec<String>>,
    facts: Option<Vec<Fact>>,
}

/// Runs the controller's tool calls against the planning and research agents.
pub struct ControllerDispatch<'a> {
    query: &'a str,
    provider: &'a dyn LlmProvider,
    adapters: &'a ToolAdapters,
    planning: &'a PlanningAgent,
    research: &'a ResearchAgent,
    stages: Mutex<Stages>,
}

impl<'a> ControllerDispatch<'a> {
    /// Creates a dispatcher for one run of `query`.
    #[must_use]
    pub fn new(
        query: &'a str,
        provider: &'a dyn LlmProvider,
        adapters: &'a ToolAdapters,
        planning: &'a PlanningAgent,
        research: &'a ResearchAgent,
    ) -> Self {
        Self {
            query,
            provider,
            adapters,
            planning,
            research,
            stages: Mutex::new(Stages::default()),
        }
    }

    /// Facts gathered so far, or `None` if research has not run.
    #[must_use]
    pub fn facts(&self) -> Option<Vec<Fact>> {
        self.stages().facts.clone()
    }

    fn stages(&self) -> MutexGuard<'_, Stages> {
        self.stages.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn plan(&self, call: &ToolCall) -> Result<ToolResult, AgentError> {
        #[derive(Deserialize)]
        struct PlanArgs {
            #[serde(default)]
            input: String,
        }

        if self.stages().facts.is_some() {
            return Ok(ToolResult::error(
                call,
                format!("research is already complete, call {SUMMARIZER_HANDOFF} now"),
            ));
        }
        let args: PlanArgs = match serde_json::from_str(&call.arguments) {
            Ok(args) => args,
            Err(e) => return Ok(ToolResult::error(call, format!("invalid arguments: {e}"))),
        };
        let input = if args.input.trim().is_empty() {
            self.query
        } else {
            args.input.as_str()
        };

        info!(stage = "planning", "delegating to planning agent");
        let steps = self.planning.plan(self.provider, input).await?;
        let content = serde_json::json!({ "steps": steps }).to_string();
        self.stages().steps = Some(steps);
        Ok(ToolResult::ok(call, content))
    }

    async fn research(&self, call: &ToolCall) -> Result<ToolResult, AgentError> {
        #[derive(Deserialize)]
        struct ResearchArgs {
            #[serde(default)]
            steps: Vec<String>,
        }

        let planned = {
            let stages = self.stages();
            if stages.facts.is_some() {
                return Ok(ToolResult::error(
                    call,
                    format!("research is already complete, call {SUMMARIZER_HANDOFF} now"),
                ));
            }
            stages.steps.clone()
        };
        let Some(planned) = planned else {
            return Ok(ToolResult::error(
                call,
                format!("no plan yet, call {PLANNING_TOOL} first"),
            ));
        };
        let args: ResearchArgs = match serde_json::from_str(&call.arguments) {
            Ok(args) => args,
            Err(e) => return Ok(ToolResult::error(call, format!("invalid arguments: {e}"))),
        };
        let requested: Vec<String> = args
            .steps
            .into_iter()
            .filter(|s| !s.trim().is_empty())
            .collect();
        let steps = if requested.is_empty() { planned } else { requested };

        info!(stage = "research", steps = steps.len(), "delegating to research agent");
        let facts = self
            .research
            .research(self.provider, self.adapters, self.query, &steps)
            .await?;
        let content = serde_json::to_string(&facts).map_err(|e| AgentError::ToolExecution {
            name: PARALLEL_RESEARCH_TOOL.to_string(),
            message: format!("serialization error: {e}"),
        })?;
        self.stages().facts = Some(facts);
        Ok(ToolResult::ok(call, content))
    }
}

#[async_trait]
impl ToolDispatch for ControllerDispatch<'_> {
    async fn dispatch(&self, call: &ToolCall) -> Result<ToolResult, AgentError> {
        debug!(tool = %call.name, call_id = %call.id, "controller delegation");
        match call.name.as_str() {
            PLANNING_TOOL => self.plan(call).await,
            PARALLEL_RESEARCH_TOOL => self.research(call).await,
            other => Ok(ToolResult::error(call, format!("unknown tool '{other}'"))),
        }
    }

    fn check_handoff(&self, _call: &ToolCall) -> Option<String> {
        let stages = self.stages();
        if stages.facts.is_some() {
            return None;
        }
        Some(if stages.steps.is_none() {
            format!("no plan yet, call {PLANNING_TOOL} first")
        } else {
            format!("research has not run yet, call {PARALLEL_RESEARCH_TOOL} first")
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::agent::message::{ChatRequest, ChatResponse};
    use crate::search::{ContextMap, SearchProvider, SearchResult};

    use std::sync::Arc;

    /// Plans two steps; research answers with prose.
    struct ScriptedModel;

    #[async_trait]
    impl LlmProvider for ScriptedModel {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
            let content = if request.json_mode {
                r#"{"steps":["one","two"]}"#
            } else {
                "a fact"
            };
            Ok(ChatResponse {
                content: content.to_string(),
                ..ChatResponse::default()
            })
        }
    }

    struct NoSearch;

    #[async_trait]
    impl SearchProvider for NoSearch {
        fn name(&self) -> &'static str {
            "none"
        }

        async fn search(&self, query: &str, _max: usize) -> Result<SearchResult, AgentError> {
            Ok(SearchResult {
                query: query.to_string(),
                results: Vec::new(),
            })
        }

        async fn extract(&self, _urls: &[String]) -> Result<ContextMap, AgentError> {
            Ok(ContextMap::new())
        }
    }

    fn call(name: &str, arguments: &str) -> ToolCall {
        ToolCall {
            id: format!("{name}_call"),
            name: name.to_string(),
            arguments: arguments.to_string(),
        }
    }

    struct Fixture {
        adapters: ToolAdapters,
        planning: PlanningAgent,
        research: ResearchAgent,
    }

    impl Fixture {
        fn new() -> Self {
            let config = AgentConfig::default();
            Self {
                adapters: ToolAdapters::new(Arc::new(NoSearch), 2),
                planning: PlanningAgent::new(&config, "plan".to_string()),
                research: ResearchAgent::new(&config, "research".to_string()),
            }
        }

        fn dispatch(&self) -> ControllerDispatch<'_> {
            ControllerDispatch::new(
                "question",
                &ScriptedModel,
                &self.adapters,
                &self.planning,
                &self.research,
            )
        }
    }

    #[tokio::test]
    async fn test_stage_order_enforced() {
        let fixture = Fixture::new();
        let dispatch = fixture.dispatch();
        let handoff = call(SUMMARIZER_HANDOFF, "{}");

        assert!(dispatch.check_handoff(&handoff).is_some_and(|m| m.contains(PLANNING_TOOL)));
        let early = dispatch
            .dispatch(&call(PARALLEL_RESEARCH_TOOL, "{}"))
            .await
            .unwrap_or_else(|e| panic!("dispatch: {e}"));
        assert!(early.is_error);

        let plan = dispatch
            .dispatch(&call(PLANNING_TOOL, r#"{"input":"question"}"#))
            .await
            .unwrap_or_else(|e| panic!("dispatch: {e}"));
        assert!(!plan.is_error);
        assert!(plan.content.contains("two"));
        assert!(
            dispatch
                .check_handoff(&handoff)
                .is_some_and(|m| m.contains(PARALLEL_RESEARCH_TOOL))
        );

        let research = dispatch
            .dispatch(&call(PARALLEL_RESEARCH_TOOL, "{}"))
            .await
            .unwrap_or_else(|e| panic!("dispatch: {e}"));
        assert!(!research.is_error);
        assert!(dispatch.check_handoff(&handoff).is_none());
        assert_eq!(dispatch.facts().map(|f| f.len()), Some(2));

        let again = dispatch
            .dispatch(&call(PLANNING_TOOL, r#"{"input":"question"}"#))
            .await
            .unwrap_or_else(|e| panic!("dispatch: {e}"));
        assert!(again.is_error);
    }

    #[tokio::test]
    async fn test_explicit_steps_override_plan() {
        let fixture = Fixture::new();
        let dispatch = fixture.dispatch();
        dispatch
            .dispatch(&call(PLANNING_TOOL, "{}"))
            .await
            .unwrap_or_else(|e| panic!("dispatch: {e}"));
        dispatch
            .dispatch(&call(PARALLEL_RESEARCH_TOOL, r#"{"steps":["only"]}"#))
            .await
            .unwrap_or_else(|e| panic!("dispatch: {e}"));
        let facts = dispatch.facts().unwrap_or_default();
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].step, "only");
    }

    #[tokio::test]
    async fn test_bad_arguments_are_tool_errors() {
        let fixture = Fixture::new();
        let dispatch = fixture.dispatch();
        let result = dispatch
            .dispatch(&call(PLANNING_TOOL, "{not json"))
            .await
            .unwrap_or_else(|e| panic!("dispatch: {e}"));
        assert!(result.is_error);
        let result = dispatch
            .dispatch(&call("search", "{}"))
            .await
            .unwrap_or_else(|e| panic!("dispatch: {e}"));
        assert!(result.content.contains("unknown tool"));
    }

    #[test]
    fn test_agent_properties() {
        let config = AgentConfig::builder().standard_model("std").build();
        let agent = ControllerAgent::new(&config, "ctl".to_string());
        assert_eq!(agent.name(), "controller");
        assert_eq!(agent.model(), "std");
        assert_eq!(agent.tools().len(), 3);
    }
}
