//! Tool and handoff definitions for function-calling.
//!
//! Every callable target is described to the model as a function. The
//! [`Delegation`] attached to each definition decides what happens when the
//! model calls it: a tool returns its result to the caller, a handoff ends
//! the caller's turn and gives the conversation to another agent.

use serde::{Deserialize, Serialize};
use serde_json::json;

/// Web search tool.
pub const SEARCH_TOOL: &str = "search";
/// Page extraction tool.
pub const EXTRACT_CONTEXT_TOOL: &str = "extract_context";
/// Planning agent exposed as a tool.
pub const PLANNING_TOOL: &str = "planning_tool";
/// Research agent exposed as a tool.
pub const PARALLEL_RESEARCH_TOOL: &str = "parallel_research_tool";
/// Handoff to the summarizer agent.
pub const SUMMARIZER_HANDOFF: &str = "transfer_to_summarizer";

/// How control flows when the model calls a definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delegation {
    /// Call/return: the result goes back to the calling agent.
    #[default]
    Tool,
    /// One-way transfer: the calling agent's turn ends.
    Handoff,
}

/// A function the model may call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Function name.
    pub name: String,
    /// What the function does, shown to the model.
    pub description: String,
    /// JSON Schema of the arguments.
    pub parameters: serde_json::Value,
    /// Delegation kind. Not sent to the model.
    #[serde(skip)]
    pub delegation: Delegation,
}

impl ToolDefinition {
    /// Returns `true` if calling this definition hands off control.
    #[must_use]
    pub fn is_handoff(&self) -> bool {
        self.delegation == Delegation::Handoff
    }
}

/// A tool call requested by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Provider-assigned call ID.
    pub id: String,
    /// Function name.
    pub name: String,
    /// JSON-encoded arguments.
    pub arguments: String,
}

/// Result of a tool call, fed back to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Call this result answers.
    pub tool_call_id: String,
    /// Result content (JSON on success, message on error).
    pub content: String,
    /// Whether the model should treat this as an error.
    pub is_error: bool,
}

impl ToolResult {
    /// Successful result.
    #[must_use]
    pub fn ok(call: &ToolCall, content: String) -> Self {
        Self {
            tool_call_id: call.id.clone(),
            content,
            is_error: false,
        }
    }

    /// Corrective error the model can recover from.
    #[must_use]
    pub fn error(call: &ToolCall, message: impl Into<String>) -> Self {
        Self {
            tool_call_id: call.id.clone(),
            content: message.into(),
            is_error: true,
        }
    }
}

/// The definitions available to one agent.
#[derive(Debug, Clone, Default)]
pub struct ToolSet {
    definitions: Vec<ToolDefinition>,
}

impl ToolSet {
    /// Returns all definitions.
    #[must_use]
    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    /// Returns `true` if this set contains no definitions.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Number of definitions.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Looks up a definition by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.definitions.iter().find(|d| d.name == name)
    }

    /// Tools for the research agent: `search` and `extract_context`.
    #[must_use]
    pub fn research_tools() -> Self {
        Self {
            definitions: vec![def_search(), def_extract_context()],
        }
    }

    /// Controller delegations: two sub-agent tools and the summarizer handoff.
    #[must_use]
    pub fn controller_delegations() -> Self {
        Self {
            definitions: vec![
                def_planning_tool(),
                def_parallel_research_tool(),
                def_summarizer_handoff(),
            ],
        }
    }

    /// Empty set.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }
}

fn def_search() -> ToolDefinition {
    ToolDefinition {
        name: SEARCH_TOOL.to_string(),
        description: "Search the web. Returns titles, URLs and snippets for the top results."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Search query text." }
            },
            "required": ["query"],
            "additionalProperties": false
        }),
        delegation: Delegation::Tool,
    }
}

fn def_extract_context() -> ToolDefinition {
    ToolDefinition {
        name: EXTRACT_CONTEXT_TOOL.to_string(),
        description: "Fetch the readable content of one or more web pages. Returns an object \
                      mapping each URL to its extracted text."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "urls": {
                    "type": "array",
                    "items": { "type": "string" },
                    "minItems": 1,
                    "description": "URLs to extract, usually taken from search results."
                }
            },
            "required": ["urls"],
            "additionalProperties": false
        }),
        delegation: Delegation::Tool,
    }
}

fn def_planning_tool() -> ToolDefinition {
    ToolDefinition {
        name: PLANNING_TOOL.to_string(),
        description: "Break the question into steps.".to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "input": { "type": "string", "description": "The user's question." }
            },
            "required": ["input"],
            "additionalProperties": false
        }),
        delegation: Delegation::Tool,
    }
}

fn def_parallel_research_tool() -> ToolDefinition {
    ToolDefinition {
        name: PARALLEL_RESEARCH_TOOL.to_string(),
        description: "Research the planned steps in parallel and return facts with sources."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "steps": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Steps to research. Defaults to the plan from planning_tool."
                }
            },
            "additionalProperties": false
        }),
        delegation: Delegation::Tool,
    }
}

fn def_summarizer_handoff() -> ToolDefinition {
    ToolDefinition {
        name: SUMMARIZER_HANDOFF.to_string(),
        description: "Hand off to the summarizer agent, which writes the final answer from the \
                      research facts. Ends your turn."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {},
            "additionalProperties": false
        }),
        delegation: Delegation::Handoff,
    }
}
