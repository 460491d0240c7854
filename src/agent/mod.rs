//! Research agent pipeline.
//!
//! A controller agent drives three delegations through tool calls and ends
//! with a handoff to the summarizer. Model access goes through the
//! [`LlmProvider`] abstraction backed by OpenAI-compatible APIs.
//!
//! # Architecture
//!
//! ```text
//! User query → ControllerAgent
//!   ├── planning_tool → PlanningAgent (query → ordered steps)
//!   ├── parallel_research_tool → N concurrent ResearchAgent runs
//!   │   └── Each step uses search + extract_context → Vec<Fact>
//!   └── transfer_to_summarizer → SummarizerAgent → bullet-point answer
//! ```

pub mod adapters;
pub mod agentic_loop;
pub mod config;
pub mod controller;
pub mod message;
pub mod pipeline;
pub mod planning;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod research;
pub mod summarizer;
pub mod tool;
pub mod traits;

// Re-export key types
pub use adapters::ToolAdapters;
pub use agentic_loop::{LoopOutcome, ToolDispatch, agentic_loop};
pub use config::{AgentConfig, ModelTier};
pub use controller::{ControllerAgent, ControllerDispatch};
pub use message::{ChatMessage, ChatRequest, ChatResponse, Role, TokenUsage};
pub use pipeline::{AgentPipeline, ResearchPipeline};
pub use planning::PlanningAgent;
pub use prompt::PromptSet;
pub use provider::{BoundedProvider, LlmProvider};
pub use research::{Fact, ResearchAgent};
pub use summarizer::SummarizerAgent;
pub use tool::{ToolCall, ToolDefinition, ToolResult, ToolSet};
pub use traits::{Agent, AgentDefinition, AgentResponse, execute_with_tools};
