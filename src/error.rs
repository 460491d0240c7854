//! Error types for quest-rs.
//!
//! Each layer has its own `thiserror` enum; [`Error`] ties them together
//! for callers that only need a single error type.

use std::fmt::Write as _;

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed underlying cause kept in an error's `source()` chain.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Credential handling failed.
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// Agent pipeline or external capability failure.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// Command execution failed.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the credential layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    /// The slot holds no usable credential.
    #[error("no API keys available for slot '{slot}'")]
    NoCredentialsAvailable {
        /// Slot name (e.g. `"model"`, `"search"`).
        slot: String,
    },
}

/// Errors raised by the agent pipeline and the capability handles it uses.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The query was rejected before a run started.
    #[error("invalid query: {message}")]
    Validation {
        /// What was wrong with the query.
        message: String,
    },

    /// A capability handle could not be built from its credential.
    #[error("failed to build {slot} client: {message}")]
    ClientConstruction {
        /// Credential slot the handle belongs to.
        slot: String,
        /// Reason the credential was rejected.
        message: String,
        /// Underlying cause.
        #[source]
        source: Option<BoxError>,
    },

    /// A single completion attempt failed.
    #[error("API request failed: {message}")]
    ApiRequest {
        /// Error message from the provider.
        message: String,
        /// HTTP status code, if known.
        status: Option<u16>,
        /// Underlying SDK or transport error.
        #[source]
        source: Option<BoxError>,
    },

    /// The model-call layer exhausted its attempt budget.
    #[error("model call failed after {attempts} attempt(s): {message}")]
    ModelCall {
        /// Attempts made before giving up.
        attempts: u32,
        /// Last error observed.
        message: String,
        /// The last failed attempt, if it produced an error.
        #[source]
        source: Option<BoxError>,
    },

    /// A web search call failed.
    #[error("search failed: {message}")]
    Search {
        /// Transport or API error message.
        message: String,
        /// Underlying transport or decode error.
        #[source]
        source: Option<BoxError>,
    },

    /// A context extraction call failed.
    #[error("context extraction failed: {message}")]
    Extraction {
        /// Transport or API error message.
        message: String,
        /// Underlying transport or decode error.
        #[source]
        source: Option<BoxError>,
    },

    /// The model's response could not be parsed.
    #[error("failed to parse response: {message}")]
    ResponseParse {
        /// Parse error description.
        message: String,
        /// The raw content that failed to parse.
        content: String,
    },

    /// A tool call could not be dispatched.
    #[error("tool '{name}' failed: {message}")]
    ToolExecution {
        /// Tool name.
        name: String,
        /// Error description.
        message: String,
    },

    /// The model kept calling tools past the iteration limit.
    #[error("tool loop exceeded {max_iterations} iterations")]
    ToolLoopExceeded {
        /// Iteration limit that was hit.
        max_iterations: usize,
    },

    /// Pipeline wiring or stage failure.
    #[error("orchestration error: {message}")]
    Orchestration {
        /// Error description.
        message: String,
    },

    /// Credential lookup failed.
    #[error(transparent)]
    Credential(#[from] CredentialError),
}

impl AgentError {
    /// Returns `true` for failures that a different credential might fix.
    ///
    /// Used by the narrowed rotation policy; the default policy rotates on
    /// every failure regardless.
    #[must_use]
    pub const fn is_credential_related(&self) -> bool {
        matches!(
            self,
            Self::ClientConstruction { .. }
                | Self::ApiRequest { .. }
                | Self::ModelCall { .. }
                | Self::Search { .. }
                | Self::Extraction { .. }
                | Self::Credential(_)
        )
    }

    /// Renders the error, its full `source()` chain and its debug form.
    #[must_use]
    pub fn diagnostic_trace(&self) -> String {
        let mut trace = format!("Error: {self}");
        let mut source = std::error::Error::source(self);
        let mut depth = 0usize;
        while let Some(cause) = source {
            depth += 1;
            let _ = write!(trace, "\n  {depth}: caused by: {cause}");
            source = cause.source();
        }
        let _ = write!(trace, "\n\nDetails: {self:?}");
        trace
    }
}

/// Errors raised by CLI commands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Command failed during execution.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// Output could not be rendered.
    #[error("output format error: {0}")]
    OutputFormat(String),

    /// A pipeline run ended in failure. Holds the rendered outcome.
    #[error("{0}")]
    RunFailed(String),
}
