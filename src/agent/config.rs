//! Agent configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.
//! API keys are not part of this configuration; they live in the credential
//! rotators and reach the pipeline through the capability factory.

use std::path::PathBuf;
use std::time::Duration;

/// Default OpenAI-compatible endpoint for Gemini models.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai/";
/// Default lightweight model (planning, summarization).
const DEFAULT_LIGHTWEIGHT_MODEL: &str = "gemini-2.5-flash-lite";
/// Default standard model (research, controller).
const DEFAULT_STANDARD_MODEL: &str = "gemini-2.5-flash";
/// Default sampling temperature.
const DEFAULT_TEMPERATURE: f32 = 0.7;
/// Default max tokens per completion.
const DEFAULT_MAX_TOKENS: u32 = 4999;
/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 120;
/// Default attempts per model call.
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Default maximum tool-calling loop iterations.
const DEFAULT_MAX_TOOL_ITERATIONS: usize = 10;
/// Results requested per search call. Kept small to bound cost and latency.
const DEFAULT_SEARCH_MAX_RESULTS: usize = 2;
/// Default concurrent research steps.
const DEFAULT_MAX_CONCURRENCY: usize = 4;
/// Default pause between cosmetic progress messages.
const DEFAULT_PROGRESS_DELAY_MS: u64 = 1000;

/// Which model an agent runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTier {
    /// Cheap, fast model.
    Lightweight,
    /// Default-capability model.
    Standard,
}

/// Configuration for the agent pipeline.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// OpenAI-compatible base URL for the model provider.
    pub base_url: Option<String>,
    /// Base URL override for the search provider.
    pub search_base_url: Option<String>,
    /// Model used by lightweight agents.
    pub lightweight_model: String,
    /// Model used by standard agents.
    pub standard_model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum tokens per completion.
    pub max_tokens: u32,
    /// Per-attempt request timeout for model calls.
    pub timeout: Duration,
    /// Attempts per model call before giving up.
    pub max_attempts: u32,
    /// Maximum tool-calling loop iterations before aborting.
    pub max_tool_iterations: usize,
    /// Results requested from each search call.
    pub search_max_results: usize,
    /// Maximum research steps evaluated at once.
    pub max_concurrency: usize,
    /// Pause between progress messages. Zero disables pacing.
    pub progress_delay: Duration,
    /// Directory containing instruction overrides.
    pub prompt_dir: Option<PathBuf>,
}

impl AgentConfig {
    /// Creates a new builder for `AgentConfig`.
    #[must_use]
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::builder().from_env().build()
    }

    /// Resolves a tier to its model identifier.
    #[must_use]
    pub fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Lightweight => &self.lightweight_model,
            ModelTier::Standard => &self.standard_model,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`AgentConfig`].
#[derive(Debug, Clone, Default)]
pub struct AgentConfigBuilder {
    base_url: Option<String>,
    search_base_url: Option<String>,
    lightweight_model: Option<String>,
    standard_model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    timeout: Option<Duration>,
    max_attempts: Option<u32>,
    max_tool_iterations: Option<usize>,
    search_max_results: Option<usize>,
    max_concurrency: Option<usize>,
    progress_delay: Option<Duration>,
    prompt_dir: Option<PathBuf>,
}

impl AgentConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.base_url.is_none() {
            self.base_url = std::env::var("QUEST_BASE_URL").ok();
        }
        if self.search_base_url.is_none() {
            self.search_base_url = std::env::var("QUEST_SEARCH_BASE_URL").ok();
        }
        if self.lightweight_model.is_none() {
            self.lightweight_model = std::env::var("QUEST_LIGHT_MODEL").ok();
        }
        if self.standard_model.is_none() {
            self.standard_model = std::env::var("QUEST_STANDARD_MODEL").ok();
        }
        if self.temperature.is_none() {
            self.temperature = std::env::var("QUEST_TEMPERATURE")
                .ok()
                .and_then(|v| v.parse().ok());
        }
        if self.max_attempts.is_none() {
            self.max_attempts = std::env::var("QUEST_MAX_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok());
        }
        if self.progress_delay.is_none() {
            self.progress_delay = std::env::var("QUEST_PROGRESS_DELAY_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis);
        }
        if self.prompt_dir.is_none() {
            self.prompt_dir = std::env::var("QUEST_PROMPT_DIR").ok().map(PathBuf::from);
        }
        self
    }

    /// Sets the model base URL.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the search base URL.
    #[must_use]
    pub fn search_base_url(mut self, url: impl Into<String>) -> Self {
        self.search_base_url = Some(url.into());
        self
    }

    /// Sets the lightweight model.
    #[must_use]
    pub fn lightweight_model(mut self, model: impl Into<String>) -> Self {
        self.lightweight_model = Some(model.into());
        self
    }

    /// Sets the standard model.
    #[must_use]
    pub fn standard_model(mut self, model: impl Into<String>) -> Self {
        self.standard_model = Some(model.into());
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub const fn temperature(mut self, t: f32) -> Self {
        self.temperature = Some(t);
        self
    }

    /// Sets the max tokens per completion.
    #[must_use]
    pub const fn max_tokens(mut self, n: u32) -> Self {
        self.max_tokens = Some(n);
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Sets the attempts per model call.
    #[must_use]
    pub const fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = Some(n);
        self
    }

    /// Sets the maximum tool-calling loop iterations.
    #[must_use]
    pub const fn max_tool_iterations(mut self, n: usize) -> Self {
        self.max_tool_iterations = Some(n);
        self
    }

    /// Sets the results requested per search.
    #[must_use]
    pub const fn search_max_results(mut self, n: usize) -> Self {
        self.search_max_results = Some(n);
        self
    }

    /// Sets the research fan-out concurrency.
    #[must_use]
    pub const fn max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = Some(n);
        self
    }

    /// Sets the pause between progress messages.
    #[must_use]
    pub const fn progress_delay(mut self, delay: Duration) -> Self {
        self.progress_delay = Some(delay);
        self
    }

    /// Sets the instruction override directory.
    #[must_use]
    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    /// Builds the [`AgentConfig`].
    #[must_use]
    pub fn build(self) -> AgentConfig {
        AgentConfig {
            base_url: Some(
                self.base_url
                    .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            ),
            search_base_url: self.search_base_url,
            lightweight_model: self
                .lightweight_model
                .unwrap_or_else(|| DEFAULT_LIGHTWEIGHT_MODEL.to_string()),
            standard_model: self
                .standard_model
                .unwrap_or_else(|| DEFAULT_STANDARD_MODEL.to_string()),
            temperature: self.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens: self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            timeout: self
                .timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            max_attempts: self.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS).max(1),
            max_tool_iterations: self
                .max_tool_iterations
                .unwrap_or(DEFAULT_MAX_TOOL_ITERATIONS),
            search_max_results: self
                .search_max_results
                .unwrap_or(DEFAULT_SEARCH_MAX_RESULTS),
            max_concurrency: self.max_concurrency.unwrap_or(DEFAULT_MAX_CONCURRENCY).max(1),
            progress_delay: self
                .progress_delay
                .unwrap_or(Duration::from_millis(DEFAULT_PROGRESS_DELAY_MS)),
            prompt_dir: self.prompt_dir,
        }
    }
}
