//! Agent instructions and user-message builders.
//!
//! Instructions fix each agent's role. They can be overridden per file from
//! a prompt directory; anything missing falls back to the compiled-in text.

use std::fmt::Write;
use std::path::{Path, PathBuf};

use super::research::Fact;

/// Instructions for the planning agent.
pub const PLANNING_INSTRUCTIONS: &str = r#"Break down the user query into clear, factual steps.

Each step must be a self-contained research question that can be answered with a web search. Use between 2 and 6 steps, ordered from background to specifics.

Return ONLY a JSON object of the form:
{"steps": ["first step", "second step"]}"#;

/// Instructions for the research agent.
pub const RESEARCH_INSTRUCTIONS: &str = r#"Research steps using search + context tools. Return facts.

Call `search` to find sources for the step. Call `extract_context` with the most promising URLs when the snippets are not enough. Only report what the sources say.

Return ONLY a JSON object of the form:
{"facts": [{"fact": "a concrete fact", "source": "https://source.example"}]}"#;

/// Instructions for the summarizer agent.
pub const SUMMARIZER_INSTRUCTIONS: &str = "Summarize clearly using bullet points, avoid tables, stats.

Answer the user's question from the research facts in the conversation. Use short bullet points. Do not use tables. Do not invent facts that are not in the research.";

/// Instructions for the controller agent.
pub const CONTROLLER_INSTRUCTIONS: &str = "Use planning → parallel → summarize → return clean output.

1. Call `planning_tool` with the user's question.
2. Call `parallel_research_tool` to research the planned steps.
3. Call `transfer_to_summarizer` to hand the findings to the summarizer. Your turn ends there.";

/// Default prompt directory relative to home.
const DEFAULT_PROMPT_DIR: &str = ".config/quest-rs/prompts";

const PLANNING_FILENAME: &str = "planning.md";
const RESEARCH_FILENAME: &str = "research.md";
const SUMMARIZER_FILENAME: &str = "summarizer.md";
const CONTROLLER_FILENAME: &str = "controller.md";

/// The instruction strings for all four agents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSet {
    /// Planning agent instructions.
    pub planning: String,
    /// Research agent instructions.
    pub research: String,
    /// Summarizer agent instructions.
    pub summarizer: String,
    /// Controller agent instructions.
    pub controller: String,
}

impl PromptSet {
    /// Loads instructions from `prompt_dir`, or from the default directory
    /// under the user's home when `None`.
    ///
    /// Each file is loaded independently; a missing or blank file uses its
    /// default.
    #[must_use]
    pub fn load(prompt_dir: Option<&Path>) -> Self {
        let resolved_dir = prompt_dir.map(PathBuf::from).or_else(Self::default_dir);

        let load_file = |filename: &str, default: &str| -> String {
            resolved_dir
                .as_ref()
                .map(|dir| dir.join(filename))
                .and_then(|path| std::fs::read_to_string(&path).ok())
                .filter(|text| !text.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            planning: load_file(PLANNING_FILENAME, PLANNING_INSTRUCTIONS),
            research: load_file(RESEARCH_FILENAME, RESEARCH_INSTRUCTIONS),
            summarizer: load_file(SUMMARIZER_FILENAME, SUMMARIZER_INSTRUCTIONS),
            controller: load_file(CONTROLLER_FILENAME, CONTROLLER_INSTRUCTIONS),
        }
    }

    /// Returns compiled-in defaults without checking the filesystem.
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            planning: PLANNING_INSTRUCTIONS.to_string(),
            research: RESEARCH_INSTRUCTIONS.to_string(),
            summarizer: SUMMARIZER_INSTRUCTIONS.to_string(),
            controller: CONTROLLER_INSTRUCTIONS.to_string(),
        }
    }

    /// Writes the compiled-in defaults to `dir`.
    ///
    /// Creates the directory if it does not exist. Existing files are
    /// **not** overwritten.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if directory creation or file writing fails.
    pub fn write_defaults(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;

        let templates = [
            (PLANNING_FILENAME, PLANNING_INSTRUCTIONS),
            (RESEARCH_FILENAME, RESEARCH_INSTRUCTIONS),
            (SUMMARIZER_FILENAME, SUMMARIZER_INSTRUCTIONS),
            (CONTROLLER_FILENAME, CONTROLLER_INSTRUCTIONS),
        ];

        let mut written = Vec::new();
        for (filename, content) in &templates {
            let path = dir.join(filename);
            if !path.exists() {
                std::fs::write(&path, content)?;
                written.push(path);
            }
        }

        Ok(written)
    }

    /// Returns the default prompt directory under the user's home.
    #[must_use]
    pub fn default_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(DEFAULT_PROMPT_DIR))
    }
}

impl Default for PromptSet {
    fn default() -> Self {
        Self::defaults()
    }
}

/// Builds the user message for one research step.
#[must_use]
pub fn build_research_prompt(query: &str, step: &str) -> String {
    format!("<question>{query}</question>\n\n<step>{step}</step>\n\nResearch this step.")
}

/// Builds the hand-over message the summarizer receives.
#[must_use]
pub fn build_summarizer_prompt(query: &str, facts: &[Fact]) -> String {
    let mut prompt = format!("<question>{query}</question>\n\n<facts>\n");
    for fact in facts {
        let _ = match &fact.source {
            Some(source) => writeln!(prompt, "- [{}] {} ({source})", fact.step, fact.fact),
            None => writeln!(prompt, "- [{}] {}", fact.step, fact.fact),
        };
    }
    prompt.push_str("</facts>\n\nWrite the final answer.");
    prompt
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_instructions_lead_with_role() {
        assert!(PLANNING_INSTRUCTIONS.starts_with("Break down the user query"));
        assert!(RESEARCH_INSTRUCTIONS.starts_with("Research steps using search + context tools."));
        assert!(SUMMARIZER_INSTRUCTIONS.contains("avoid tables"));
        assert!(CONTROLLER_INSTRUCTIONS.contains("transfer_to_summarizer"));
    }

    #[test]
    fn test_load_falls_back_per_file() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        std::fs::write(dir.path().join(SUMMARIZER_FILENAME), "Answer in haiku.")
            .unwrap_or_else(|e| panic!("write: {e}"));
        std::fs::write(dir.path().join(PLANNING_FILENAME), "   \n")
            .unwrap_or_else(|e| panic!("write: {e}"));

        let prompts = PromptSet::load(Some(dir.path()));
        assert_eq!(prompts.summarizer, "Answer in haiku.");
        assert_eq!(prompts.planning, PLANNING_INSTRUCTIONS);
        assert_eq!(prompts.controller, CONTROLLER_INSTRUCTIONS);
    }

    #[test]
    fn test_write_defaults_keeps_existing_files() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        std::fs::write(dir.path().join(RESEARCH_FILENAME), "custom")
            .unwrap_or_else(|e| panic!("write: {e}"));

        let written =
            PromptSet::write_defaults(dir.path()).unwrap_or_else(|e| panic!("write_defaults: {e}"));
        assert_eq!(written.len(), 3);
        let research = std::fs::read_to_string(dir.path().join(RESEARCH_FILENAME))
            .unwrap_or_else(|e| panic!("read: {e}"));
        assert_eq!(research, "custom");
    }

    #[test]
    fn test_build_summarizer_prompt_lists_facts() {
        let facts = vec![
            Fact {
                step: "history".to_string(),
                fact: "Invented in 1991".to_string(),
                source: Some("https://a.example".to_string()),
            },
            Fact {
                step: "usage".to_string(),
                fact: "Used widely".to_string(),
                source: None,
            },
        ];
        let prompt = build_summarizer_prompt("what is it?", &facts);
        assert!(prompt.contains("<question>what is it?</question>"));
        assert!(prompt.contains("- [history] Invented in 1991 (https://a.example)"));
        assert!(prompt.contains("- [usage] Used widely\n"));
    }

    #[test]
    fn test_build_research_prompt() {
        let prompt = build_research_prompt("q", "find origins");
        assert!(prompt.contains("<step>find origins</step>"));
    }
}
