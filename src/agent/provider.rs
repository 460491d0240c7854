//! Pluggable LLM provider trait and the bounded model-call layer.
//!
//! Implementations translate [`ChatRequest`]/[`ChatResponse`] into
//! provider-specific SDK calls. [`BoundedProvider`] adds the per-attempt
//! timeout and attempt cap; the pipeline stages never retry on their own.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use super::message::{ChatRequest, ChatResponse};
use crate::error::{AgentError, BoxError};

/// Trait for LLM provider backends.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g., `"openai"`).
    fn name(&self) -> &'static str;

    /// Executes a chat completion request.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on API failures, timeouts, or parse errors.
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError>;
}

/// Wraps a provider with a per-attempt timeout and a bounded attempt count.
///
/// Attempts run back to back with no delay. Once the budget is spent the
/// last failure is reported as [`AgentError::ModelCall`].
pub struct BoundedProvider {
    inner: Arc<dyn LlmProvider>,
    timeout: Duration,
    max_attempts: u32,
}

impl BoundedProvider {
    /// Wraps `inner`. `max_attempts` is clamped to at least one.
    #[must_use]
    pub fn new(inner: Arc<dyn LlmProvider>, timeout: Duration, max_attempts: u32) -> Self {
        Self {
            inner,
            timeout,
            max_attempts: max_attempts.max(1),
        }
    }
}

impl std::fmt::Debug for BoundedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedProvider")
            .field("inner", &self.inner.name())
            .field("timeout", &self.timeout)
            .field("max_attempts", &self.max_attempts)
            .finish()
    }
}

#[async_trait]
impl LlmProvider for BoundedProvider {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        let mut message = String::new();
        let mut last_error: Option<BoxError> = None;
        for attempt in 1..=self.max_attempts {
            match tokio::time::timeout(self.timeout, self.inner.chat(request)).await {
                Ok(Ok(response)) => return Ok(response),
                Ok(Err(e)) => {
                    warn!(attempt, model = %request.model, error = %e, "model call failed");
                    message = e.to_string();
                    last_error = Some(Box::new(e));
                }
                Err(elapsed) => {
                    warn!(attempt, model = %request.model, timeout = ?self.timeout, "model call timed out");
                    message = format!("request timed out after {:?}", self.timeout);
                    last_error = Some(Box::new(elapsed));
                }
            }
        }
        Err(AgentError::ModelCall {
            attempts: self.max_attempts,
            message,
            source: last_error,
        })
    }
}
