//! Capability client factory.
//!
//! Builds the model-completion and search handles the pipeline uses, each
//! bound to the current credential of its slot. Building never rotates:
//! two builds with no rotation in between bind the same keys.

use std::sync::Arc;

use tracing::debug;

use crate::agent::config::AgentConfig;
use crate::agent::provider::{BoundedProvider, LlmProvider};
use crate::agent::providers::OpenAiProvider;
use crate::credentials::{Credential, CredentialRotator};
use crate::error::AgentError;
use crate::search::{SearchProvider, TavilyClient};

/// Constructs concrete handles from a credential.
pub trait HandleBuilder: Send + Sync {
    /// Builds the raw model-completion handle.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ClientConstruction`] if the credential is unusable.
    fn model(
        &self,
        credential: &Credential,
        config: &AgentConfig,
    ) -> Result<Arc<dyn LlmProvider>, AgentError>;

    /// Builds the search handle.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ClientConstruction`] if the credential is unusable.
    fn search(
        &self,
        credential: &Credential,
        config: &AgentConfig,
    ) -> Result<Arc<dyn SearchProvider>, AgentError>;
}

/// Builds `async-openai` and Tavily handles.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiveHandleBuilder;

impl HandleBuilder for LiveHandleBuilder {
    fn model(
        &self,
        credential: &Credential,
        config: &AgentConfig,
    ) -> Result<Arc<dyn LlmProvider>, AgentError> {
        Ok(Arc::new(OpenAiProvider::new(
            credential,
            config.base_url.as_deref(),
        )?))
    }

    fn search(
        &self,
        credential: &Credential,
        config: &AgentConfig,
    ) -> Result<Arc<dyn SearchProvider>, AgentError> {
        Ok(Arc::new(TavilyClient::with_timeout(
            credential,
            config.search_base_url.as_deref(),
            config.timeout,
        )?))
    }
}

/// The handles one pipeline run uses.
#[derive(Clone)]
pub struct CapabilityClients {
    /// Model handle with the bounded attempt/timeout layer applied.
    pub model: Arc<dyn LlmProvider>,
    /// Search and extraction handle.
    pub search: Arc<dyn SearchProvider>,
    model_credential: Credential,
    search_credential: Credential,
}

impl CapabilityClients {
    /// Credential the model handle is bound to.
    #[must_use]
    pub const fn model_credential(&self) -> &Credential {
        &self.model_credential
    }

    /// Credential the search handle is bound to.
    #[must_use]
    pub const fn search_credential(&self) -> &Credential {
        &self.search_credential
    }
}

impl std::fmt::Debug for CapabilityClients {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityClients")
            .field("model", &self.model.name())
            .field("search", &self.search.name())
            .field("model_credential", &self.model_credential)
            .field("search_credential", &self.search_credential)
            .finish()
    }
}

/// Builds [`CapabilityClients`] from the two credential rotators.
#[derive(Clone)]
pub struct CapabilityClientFactory {
    model_rotator: Arc<CredentialRotator>,
    search_rotator: Arc<CredentialRotator>,
    config: AgentConfig,
    builder: Arc<dyn HandleBuilder>,
}

impl CapabilityClientFactory {
    /// Creates a factory that builds live handles.
    #[must_use]
    pub fn new(
        model_rotator: Arc<CredentialRotator>,
        search_rotator: Arc<CredentialRotator>,
        config: AgentConfig,
    ) -> Self {
        Self::with_builder(
            model_rotator,
            search_rotator,
            config,
            Arc::new(LiveHandleBuilder),
        )
    }

    /// Creates a factory with a custom handle builder.
    #[must_use]
    pub fn with_builder(
        model_rotator: Arc<CredentialRotator>,
        search_rotator: Arc<CredentialRotator>,
        config: AgentConfig,
        builder: Arc<dyn HandleBuilder>,
    ) -> Self {
        Self {
            model_rotator,
            search_rotator,
            config,
            builder,
        }
    }

    /// Model-slot rotator.
    #[must_use]
    pub const fn model_rotator(&self) -> &Arc<CredentialRotator> {
        &self.model_rotator
    }

    /// Search-slot rotator.
    #[must_use]
    pub const fn search_rotator(&self) -> &Arc<CredentialRotator> {
        &self.search_rotator
    }

    /// Configuration the handles are built with.
    #[must_use]
    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Builds handles bound to each slot's current credential.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Credential`] if a slot holds no keys and
    /// [`AgentError::ClientConstruction`] if a handle cannot be built.
    pub fn build(&self) -> Result<CapabilityClients, AgentError> {
        let model_credential = self.model_rotator.current()?;
        let search_credential = self.search_rotator.current()?;

        let raw_model = self.builder.model(&model_credential, &self.config)?;
        let model: Arc<dyn LlmProvider> = Arc::new(BoundedProvider::new(
            raw_model,
            self.config.timeout,
            self.config.max_attempts,
        ));
        let search = self.builder.search(&search_credential, &self.config)?;

        debug!(
            model_key = model_credential.position(),
            search_key = search_credential.position(),
            "capability clients built"
        );

        Ok(CapabilityClients {
            model,
            search,
            model_credential,
            search_credential,
        })
    }
}

impl std::fmt::Debug for CapabilityClientFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityClientFactory")
            .field("model_rotator", &self.model_rotator.slot())
            .field("search_rotator", &self.search_rotator.slot())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::credentials::{MODEL_SLOT, SEARCH_SLOT};
    use crate::error::CredentialError;

    fn rotator(slot: &str, keys: &[&str]) -> Arc<CredentialRotator> {
        Arc::new(CredentialRotator::new(slot, keys.iter().map(|k| Some(*k))))
    }

    fn factory(model: &[&str], search: &[&str]) -> CapabilityClientFactory {
        CapabilityClientFactory::new(
            rotator(MODEL_SLOT, model),
            rotator(SEARCH_SLOT, search),
            AgentConfig::default(),
        )
    }

    #[test]
    fn test_build_is_idempotent_without_rotation() {
        let factory = factory(&["G1", "G2"], &["T1", "T2"]);
        let first = factory.build().unwrap_or_else(|e| panic!("build: {e}"));
        let second = factory.build().unwrap_or_else(|e| panic!("build: {e}"));
        assert_eq!(first.model_credential(), second.model_credential());
        assert_eq!(first.search_credential(), second.search_credential());
        assert_eq!(factory.model_rotator().index(), 0);
    }

    #[test]
    fn test_build_follows_rotation() {
        let factory = factory(&["G1", "G2"], &["T1"]);
        let before = factory.build().unwrap_or_else(|e| panic!("build: {e}"));
        factory
            .model_rotator()
            .rotate()
            .unwrap_or_else(|e| panic!("rotate: {e}"));
        let after = factory.build().unwrap_or_else(|e| panic!("build: {e}"));
        assert_eq!(before.model_credential().secret(), "G1");
        assert_eq!(after.model_credential().secret(), "G2");
        assert_eq!(after.search_credential().secret(), "T1");
    }

    #[test]
    fn test_empty_slot_fails_build() {
        let err = factory(&["G1"], &[]).build().unwrap_err();
        assert!(matches!(
            err,
            AgentError::Credential(CredentialError::NoCredentialsAvailable { ref slot }) if slot == SEARCH_SLOT
        ));
    }

    #[test]
    fn test_malformed_key_is_construction_error() {
        let err = factory(&["bad key"], &["T1"]).build().unwrap_err();
        assert!(matches!(err, AgentError::ClientConstruction { ref slot, .. } if slot == MODEL_SLOT));
    }

    #[test]
    fn test_model_handle_is_bounded() {
        let clients = factory(&["G1"], &["T1"])
            .build()
            .unwrap_or_else(|e| panic!("build: {e}"));
        assert_eq!(clients.model.name(), "openai");
        assert_eq!(clients.search.name(), "tavily");
    }
}
