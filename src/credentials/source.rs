//! Loads credential slots from the process environment.
//!
//! Keys are read once at startup from `<PREFIX>` and `<PREFIX>_1` through
//! `<PREFIX>_10`, after an optional `.env` file has been merged into the
//! environment. Absent and blank entries are dropped.

use super::{CredentialRotator, MODEL_SLOT, RotationObserver, SEARCH_SLOT};

/// Highest numbered suffix probed for each prefix.
pub const MAX_NUMBERED_KEYS: usize = 10;

/// Default environment prefix for model-access keys.
const MODEL_KEY_PREFIX: &str = "GEMINI_API_KEY";
/// Default environment prefix for search-access keys.
const SEARCH_KEY_PREFIX: &str = "TAVILY_API_KEY";

/// Describes where one slot's keys live in the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialSource {
    /// Slot name.
    pub slot: String,
    /// Environment variable prefix.
    pub prefix: String,
}

impl CredentialSource {
    /// Creates a source for `slot` reading `<prefix>` and `<prefix>_N`.
    #[must_use]
    pub fn new(slot: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            slot: slot.into(),
            prefix: prefix.into(),
        }
    }

    /// Model-access slot (`GEMINI_API_KEY*`).
    #[must_use]
    pub fn model() -> Self {
        Self::new(MODEL_SLOT, MODEL_KEY_PREFIX)
    }

    /// Search-access slot (`TAVILY_API_KEY*`).
    #[must_use]
    pub fn search() -> Self {
        Self::new(SEARCH_SLOT, SEARCH_KEY_PREFIX)
    }

    /// Variable names probed, in rotation order.
    #[must_use]
    pub fn variable_names(&self) -> Vec<String> {
        (1..=MAX_NUMBERED_KEYS)
            .map(|n| format!("{}_{n}", self.prefix))
            .chain(std::iter::once(self.prefix.clone()))
            .collect()
    }

    /// Collects raw values through `lookup`, in rotation order.
    ///
    /// Duplicate values (the same key exported under two names) are kept
    /// once, at their first position.
    pub fn collect_with<F>(&self, lookup: F) -> Vec<Option<String>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut seen: Vec<String> = Vec::new();
        self.variable_names()
            .iter()
            .map(|name| {
                lookup(name).filter(|value| {
                    let value = value.trim().to_string();
                    if seen.contains(&value) {
                        false
                    } else {
                        seen.push(value);
                        true
                    }
                })
            })
            .collect()
    }

    /// Builds a rotator from values resolved through `lookup`.
    pub fn rotator_with<F>(&self, lookup: F, observer: Option<RotationObserver>) -> CredentialRotator
    where
        F: Fn(&str) -> Option<String>,
    {
        let rotator = CredentialRotator::new(self.slot.clone(), self.collect_with(lookup));
        match observer {
            Some(observer) => rotator.with_observer(observer),
            None => rotator,
        }
    }

    /// Builds a rotator from the process environment.
    pub fn rotator_from_env(&self, observer: Option<RotationObserver>) -> CredentialRotator {
        self.rotator_with(|name| std::env::var(name).ok(), observer)
    }
}

/// Merges a `.env` file from the working directory into the environment.
///
/// A missing file is not an error; returns whether a file was loaded.
pub fn load_dotenv() -> bool {
    match dotenv::dotenv() {
        Ok(path) => {
            tracing::debug!(path = %path.display(), "loaded .env file");
            true
        }
        Err(e) if e.not_found() => false,
        Err(e) => {
            tracing::warn!(error = %e, "failed to parse .env file");
            false
        }
    }
}
