//! Output formatting for CLI commands.

use std::fmt::Write;

use serde::Serialize;

use crate::runner::{RunId, RunOutcome};

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// JSON.
    Json,
}

impl OutputFormat {
    /// Parses a format name. Unknown names fall back to text.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

/// A finished run as reported by `ask`.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Run identifier.
    pub run_id: RunId,
    /// Progress lines in the order they arrived.
    pub progress: Vec<String>,
    /// Terminal outcome.
    pub outcome: RunOutcome,
}

impl RunReport {
    /// Renders the report. Text mode prints only the answer or error trace.
    ///
    /// # Errors
    ///
    /// Returns an error message if JSON serialization fails.
    pub fn render(&self, format: OutputFormat) -> Result<String, String> {
        match format {
            OutputFormat::Text => Ok(format!("{}\n", self.outcome)),
            OutputFormat::Json => serde_json::to_string_pretty(self).map_err(|e| e.to_string()),
        }
    }
}

/// Key counts for the `keys` command.
#[derive(Debug, Clone, Serialize)]
pub struct SlotSummary {
    /// Slot name.
    pub slot: String,
    /// Environment variable prefix keys are read from.
    pub prefix: String,
    /// Number of usable keys.
    pub keys: usize,
}

/// Formats slot summaries.
#[must_use]
pub fn format_slots(slots: &[SlotSummary], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut output = String::new();
            for s in slots {
                let _ = writeln!(
                    output,
                    "{:<8} {} key(s) from {}_1..{}_{}",
                    s.slot,
                    s.keys,
                    s.prefix,
                    s.prefix,
                    crate::credentials::MAX_NUMBERED_KEYS
                );
            }
            output
        }
        OutputFormat::Json => {
            serde_json::to_string_pretty(slots).unwrap_or_else(|_| "[]".to_string())
        }
    }
}
