//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// quest-rs: multi-agent web research from the terminal.
///
/// Plans a question into steps, researches them in parallel with web
/// search, and summarizes the findings.
#[derive(Parser, Debug)]
#[command(name = "quest-rs")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Research a question and print a summarized answer.
    ///
    /// API keys are read from `GEMINI_API_KEY_1..10` and
    /// `TAVILY_API_KEY_1..10` (or a `.env` file). A failed run rotates to
    /// the next key of each kind for the following run.
    #[command(after_help = r#"Examples:
  quest-rs ask "How do solid-state batteries work?"
  quest-rs ask "Compare Rust and Go for CLIs" --no-pacing
  quest-rs ask "What is CRISPR?" --standard-model gemini-2.5-pro
  quest-rs --format json ask "History of the transistor" | jq -r '.outcome.text'
"#)]
    Ask {
        /// The research question.
        query: String,

        /// Model for planning and summarizing.
        #[arg(long, env = "QUEST_LIGHT_MODEL")]
        light_model: Option<String>,

        /// Model for research and orchestration.
        #[arg(long, env = "QUEST_STANDARD_MODEL")]
        standard_model: Option<String>,

        /// Sampling temperature.
        #[arg(short, long)]
        temperature: Option<f32>,

        /// Maximum tokens per completion.
        #[arg(long)]
        max_tokens: Option<u32>,

        /// Maximum research steps evaluated at once.
        #[arg(short, long)]
        concurrency: Option<usize>,

        /// Directory with instruction overrides.
        #[arg(long, env = "QUEST_PROMPT_DIR")]
        prompt_dir: Option<PathBuf>,

        /// Rotate keys only after failures a different key might fix.
        #[arg(long)]
        rotate_on_credential_errors: bool,

        /// Report progress without pausing between messages.
        #[arg(long)]
        no_pacing: bool,
    },

    /// Show how many API keys each slot holds.
    ///
    /// Never prints the keys themselves.
    Keys,

    /// Write the default agent instructions as editable files.
    #[command(after_help = r#"Examples:
  quest-rs init-prompts              # ~/.config/quest-rs/prompts
  quest-rs init-prompts ./prompts    # custom directory
"#)]
    InitPrompts {
        /// Target directory.
        dir: Option<PathBuf>,
    },
}
