//! Agentic tool-calling loop.
//!
//! Drives the LLM ↔ tool execution round-trip: sends a request to the model,
//! dispatches any tool calls in the response, appends results, and repeats
//! until the model produces a final text response, hands off to another
//! agent, or the iteration limit is reached.

use async_trait::async_trait;
use tracing::debug;

use super::message::{
    ChatMessage, ChatRequest, ChatResponse, TokenUsage, assistant_tool_calls_message, tool_message,
};
use super::provider::LlmProvider;
use super::tool::{ToolCall, ToolResult};
use crate::error::AgentError;

/// Executes the tool calls an agent makes.
#[async_trait]
pub trait ToolDispatch: Send + Sync {
    /// Runs one call-and-return tool.
    ///
    /// Problems the model can fix (bad arguments, unknown tool, calls out of
    /// order) come back as error results. `Err` aborts the loop.
    async fn dispatch(&self, call: &ToolCall) -> Result<ToolResult, AgentError>;

    /// Decides whether a handoff may happen now.
    ///
    /// Returns a corrective message when the handoff is premature.
    fn check_handoff(&self, _call: &ToolCall) -> Option<String> {
        None
    }
}

/// How an agentic loop ended.
#[derive(Debug, Clone)]
pub enum LoopOutcome {
    /// The model answered with text.
    Final(ChatResponse),
    /// The model transferred control to another agent.
    Handoff {
        /// Handoff function the model called.
        target: String,
        /// Conversation up to and including the handoff request.
        context: Vec<ChatMessage>,
        /// Token usage summed over the loop.
        usage: TokenUsage,
    },
}

impl LoopOutcome {
    /// Token usage summed over every model call the loop made.
    #[must_use]
    pub const fn usage(&self) -> TokenUsage {
        match self {
            Self::Final(response) => response.usage,
            Self::Handoff { usage, .. } => *usage,
        }
    }

    /// Final text, if the loop ended without a handoff.
    #[must_use]
    pub fn final_text(&self) -> Option<&str> {
        match self {
            Self::Final(response) => Some(&response.content),
            Self::Handoff { .. } => None,
        }
    }
}

/// Runs an agentic loop: model → tool calls → tool results → model → …
///
/// Calls to definitions marked as handoffs in `request.tools` end the loop
/// with [`LoopOutcome::Handoff`] once the dispatcher allows them. Any other
/// calls in the same turn are still answered first, so the transcript stays
/// well formed.
///
/// # Errors
///
/// Returns [`AgentError::ToolLoopExceeded`] if the model keeps requesting
/// tools beyond `max_iterations`. Propagates provider and dispatch errors.
pub async fn agentic_loop(
    provider: &dyn LlmProvider,
    request: &mut ChatRequest,
    dispatch: &dyn ToolDispatch,
    max_iterations: usize,
) -> Result<LoopOutcome, AgentError> {
    let mut usage = TokenUsage::default();
    for iteration in 0..max_iterations {
        let mut response = provider.chat(request).await?;
        usage.accumulate(response.usage);

        if response.tool_calls.is_empty() {
            debug!(
                iteration,
                total_tokens = usage.total_tokens,
                "agentic loop completed with final text response"
            );
            response.usage = usage;
            return Ok(LoopOutcome::Final(response));
        }

        debug!(
            iteration,
            tool_count = response.tool_calls.len(),
            "executing tool calls"
        );

        request.messages.push(assistant_tool_calls_message(
            &response.content,
            response.tool_calls.clone(),
        ));

        let mut handoff = None;
        for call in &response.tool_calls {
            let is_handoff = request
                .tools
                .iter()
                .any(|d| d.name == call.name && d.is_handoff());

            let result = if is_handoff {
                match dispatch.check_handoff(call) {
                    Some(correction) => ToolResult::error(call, correction),
                    None if handoff.is_none() => {
                        handoff = Some(call.name.clone());
                        ToolResult::ok(call, format!("transferred to {}", call.name))
                    }
                    None => ToolResult::error(call, "a handoff is already in progress"),
                }
            } else {
                dispatch.dispatch(call).await?
            };

            debug!(
                tool = call.name,
                call_id = call.id,
                is_error = result.is_error,
                "tool execution complete"
            );
            request
                .messages
                .push(tool_message(&result.tool_call_id, &result.content));
        }

        if let Some(target) = handoff {
            debug!(iteration, target, "agentic loop handed off");
            return Ok(LoopOutcome::Handoff {
                target,
                context: request.messages.clone(),
                usage,
            });
        }
    }

    Err(AgentError::ToolLoopExceeded { max_iterations })
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::agent::message::{Role, TokenUsage};
    use crate::agent::tool::{SUMMARIZER_HANDOFF, ToolSet};

    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns tool calls on the first N calls, then a final text response.
    struct MockToolProvider {
        call_count: AtomicUsize,
        tool_rounds: usize,
        tool_name: &'static str,
    }

    impl MockToolProvider {
        fn new(tool_rounds: usize, tool_name: &'static str) -> Self {
            Self {
                call_count: AtomicUsize::new(0),
                tool_rounds,
                tool_name,
            }
        }
    }

    #[async_trait]
    impl LlmProvider for MockToolProvider {
        fn name(&self) -> &'static str {
            "mock"
        }

        async fn chat(&self, _request: &ChatRequest) -> Result<ChatResponse, AgentError> {
            let count = self.call_count.fetch_add(1, Ordering::SeqCst);

            if count < self.tool_rounds {
                Ok(ChatResponse {
                    content: String::new(),
                    usage: TokenUsage {
                        prompt_tokens: 10,
                        completion_tokens: 2,
                        total_tokens: 12,
                    },
                    tool_calls: vec![ToolCall {
                        id: format!("call_{count}"),
                        name: self.tool_name.to_string(),
                        arguments: "{}".to_string(),
                    }],
                    finish_reason: Some("tool_calls".to_string()),
                })
            } else {
                Ok(ChatResponse {
                    content: "Final answer based on tool results.".to_string(),
                    usage: TokenUsage {
                        prompt_tokens: 20,
                        completion_tokens: 5,
                        total_tokens: 25,
                    },
                    tool_calls: Vec::new(),
                    finish_reason: Some("stop".to_string()),
                })
            }
        }
    }

    /// Echoes calls back and optionally refuses the first N handoffs.
    #[derive(Default)]
    struct EchoDispatch {
        dispatched: AtomicUsize,
        refusals: Mutex<usize>,
    }

    #[async_trait]
    impl ToolDispatch for EchoDispatch {
        async fn dispatch(&self, call: &ToolCall) -> Result<ToolResult, AgentError> {
            self.dispatched.fetch_add(1, Ordering::SeqCst);
            Ok(ToolResult::ok(call, format!("echo {}", call.name)))
        }

        fn check_handoff(&self, _call: &ToolCall) -> Option<String> {
            let mut refusals = self.refusals.lock().unwrap_or_else(|e| panic!("poisoned: {e}"));
            if *refusals > 0 {
                *refusals -= 1;
                return Some("research first".to_string());
            }
            None
        }
    }

    fn request(tools: &ToolSet) -> ChatRequest {
        let mut request = ChatRequest::new("test", "You are a test agent.", "query");
        request.tools = tools.definitions().to_vec();
        request
    }

    #[tokio::test]
    async fn test_agentic_loop_single_tool_round() {
        let provider = MockToolProvider::new(1, "search");
        let dispatch = EchoDispatch::default();
        let mut request = request(&ToolSet::research_tools());

        let outcome = agentic_loop(&provider, &mut request, &dispatch, 10)
            .await
            .unwrap_or_else(|e| panic!("agentic_loop failed: {e}"));

        assert_eq!(outcome.final_text(), Some("Final answer based on tool results."));
        assert_eq!(outcome.usage().total_tokens, 37);
        assert_eq!(outcome.usage().prompt_tokens, 30);
        // system + user + assistant(tool_calls) + tool(result)
        assert_eq!(request.messages.len(), 4);
        assert_eq!(dispatch.dispatched.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_agentic_loop_exceeds_max() {
        let provider = MockToolProvider::new(100, "search");
        let mut request = request(&ToolSet::research_tools());

        let err = agentic_loop(&provider, &mut request, &EchoDispatch::default(), 2)
            .await
            .unwrap_err();
        assert!(
            matches!(err, AgentError::ToolLoopExceeded { max_iterations: 2 }),
            "Expected ToolLoopExceeded, got: {err}"
        );
    }

    #[tokio::test]
    async fn test_agentic_loop_no_tools() {
        let provider = MockToolProvider::new(0, "search");
        let mut request = request(&ToolSet::none());

        let outcome = agentic_loop(&provider, &mut request, &EchoDispatch::default(), 10)
            .await
            .unwrap_or_else(|e| panic!("agentic_loop failed: {e}"));

        assert!(matches!(outcome, LoopOutcome::Final(_)));
        assert_eq!(request.messages.len(), 2);
    }

    #[tokio::test]
    async fn test_handoff_ends_loop_without_dispatch() {
        let provider = MockToolProvider::new(5, SUMMARIZER_HANDOFF);
        let dispatch = EchoDispatch::default();
        let mut request = request(&ToolSet::controller_delegations());

        let outcome = agentic_loop(&provider, &mut request, &dispatch, 10)
            .await
            .unwrap_or_else(|e| panic!("agentic_loop failed: {e}"));

        match outcome {
            LoopOutcome::Handoff {
                target,
                context,
                usage,
            } => {
                assert_eq!(target, SUMMARIZER_HANDOFF);
                assert_eq!(usage.total_tokens, 12);
                assert_eq!(context.last().map(|m| m.role), Some(Role::Tool));
            }
            LoopOutcome::Final(_) => panic!("expected a handoff"),
        }
        assert_eq!(provider.call_count.load(Ordering::SeqCst), 1);
        assert_eq!(dispatch.dispatched.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_refused_handoff_is_fed_back() {
        let provider = MockToolProvider::new(3, SUMMARIZER_HANDOFF);
        let dispatch = EchoDispatch {
            refusals: Mutex::new(1),
            ..EchoDispatch::default()
        };
        let mut request = request(&ToolSet::controller_delegations());

        let outcome = agentic_loop(&provider, &mut request, &dispatch, 10)
            .await
            .unwrap_or_else(|e| panic!("agentic_loop failed: {e}"));

        assert!(matches!(outcome, LoopOutcome::Handoff { .. }));
        assert_eq!(provider.call_count.load(Ordering::SeqCst), 2);
        assert!(request.messages.iter().any(|m| m.content == "research first"));
    }

    #[tokio::test]
    async fn test_handoff_name_is_plain_tool_when_not_declared() {
        // Without the handoff definition in the request the call is dispatched.
        let provider = MockToolProvider::new(1, SUMMARIZER_HANDOFF);
        let dispatch = EchoDispatch::default();
        let mut request = request(&ToolSet::research_tools());

        let outcome = agentic_loop(&provider, &mut request, &dispatch, 10)
            .await
            .unwrap_or_else(|e| panic!("agentic_loop failed: {e}"));

        assert!(matches!(outcome, LoopOutcome::Final(_)));
        assert_eq!(dispatch.dispatched.load(Ordering::SeqCst), 1);
    }
}
