//! Planning agent.
//!
//! Breaks the user's question into an ordered list of research steps.

use serde::Deserialize;

use super::config::{AgentConfig, ModelTier};
use super::provider::LlmProvider;
use super::tool::ToolSet;
use super::traits::{Agent, AgentDefinition};
use crate::error::AgentError;

/// Upper bound on planned steps. Extra steps are dropped.
const MAX_STEPS: usize = 12;

/// Agent that turns a question into research steps.
pub struct PlanningAgent {
    definition: AgentDefinition,
}

impl PlanningAgent {
    /// Creates a planning agent on the lightweight model.
    #[must_use]
    pub fn new(config: &AgentConfig, instructions: String) -> Self {
        Self {
            definition: AgentDefinition::new(
                "planning",
                ModelTier::Lightweight,
                config,
                instructions,
                ToolSet::none(),
            ),
        }
    }

    /// Plans `input` into steps.
    ///
    /// # Errors
    ///
    /// Propagates model-call failures. Returns [`AgentError::Orchestration`]
    /// if the response contains no usable step.
    pub async fn plan(
        &self,
        provider: &dyn LlmProvider,
        input: &str,
    ) -> Result<Vec<String>, AgentError> {
        let response = self.execute(provider, input).await?;
        let steps = parse_steps(&response.content);
        if steps.is_empty() {
            return Err(AgentError::Orchestration {
                message: format!("planning produced no steps for '{input}'"),
            });
        }
        tracing::debug!(steps = steps.len(), "plan ready");
        Ok(steps)
    }
}

impl Agent for PlanningAgent {
    fn definition(&self) -> &AgentDefinition {
        &self.definition
    }

    fn json_mode(&self) -> bool {
        true
    }
}

#[derive(Deserialize)]
struct PlanEnvelope {
    steps: Vec<String>,
}

/// Parses a plan from JSON (`{"steps": [...]}` or a bare array), falling back
/// to a numbered or bulleted list.
pub(crate) fn parse_steps(content: &str) -> Vec<String> {
    let trimmed = content.trim();
    let json_str = if trimmed.starts_with("```") {
        trimmed
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim()
    } else {
        trimmed
    };

    let steps = serde_json::from_str::<PlanEnvelope>(json_str)
        .map(|p| p.steps)
        .or_else(|_| serde_json::from_str::<Vec<String>>(json_str))
        .unwrap_or_else(|_| parse_list(trimmed));

    steps
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .take(MAX_STEPS)
        .collect()
}

fn parse_list(text: &str) -> Vec<String> {
    let marked: Vec<String> = text
        .lines()
        .filter_map(|line| strip_marker(line.trim()))
        .map(str::to_string)
        .collect();
    if marked.is_empty() {
        text.lines().map(str::to_string).collect()
    } else {
        marked
    }
}

/// Strips `1.`, `1)`, `-`, `*` or `•` list markers.
fn strip_marker(line: &str) -> Option<&str> {
    if let Some(rest) = line
        .strip_prefix("- ")
        .or_else(|| line.strip_prefix("* "))
        .or_else(|| line.strip_prefix("• "))
    {
        return Some(rest);
    }
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    line[digits..]
        .strip_prefix('.')
        .or_else(|| line[digits..].strip_prefix(')'))
        .map(str::trim_start)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(r#"{"steps": ["a", "b"]}"# ; "envelope")]
    #[test_case(r#"["a", "b"]"# ; "bare array")]
    #[test_case("```json\n{\"steps\": [\"a\", \"b\"]}\n```" ; "fenced")]
    #[test_case("1. a\n2) b" ; "numbered")]
    #[test_case("Here is the plan:\n- a\n* b" ; "bulleted with preamble")]
    fn test_parse_steps(content: &str) {
        assert_eq!(parse_steps(content), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_parse_steps_drops_blank_entries() {
        assert_eq!(parse_steps(r#"{"steps": [" ", "only"]}"#), vec!["only".to_string()]);
        assert!(parse_steps("   ").is_empty());
        assert!(parse_steps(r#"{"steps": []}"#).is_empty());
    }

    #[test]
    fn test_parse_steps_caps_count() {
        let many: Vec<String> = (0..30).map(|i| format!("step {i}")).collect();
        let json = serde_json::to_string(&many).unwrap_or_else(|e| panic!("json: {e}"));
        assert_eq!(parse_steps(&json).len(), MAX_STEPS);
    }

    #[test]
    fn test_agent_properties() {
        let config = AgentConfig::builder().lightweight_model("lite").build();
        let agent = PlanningAgent::new(&config, "plan".to_string());
        assert_eq!(agent.name(), "planning");
        assert_eq!(agent.model(), "lite");
        assert!(agent.json_mode());
        assert!(agent.tools().is_empty());
    }
}
