//! Credential slots and rotation.
//!
//! A slot (model access, search access) is backed by several equivalent
//! API keys. [`CredentialRotator`] hides them behind a single logical
//! credential and cycles to the next key when the caller asks it to.

pub mod rotator;
pub mod source;

pub use rotator::{CredentialRotator, RotationEvent, RotationEventKind, RotationObserver};
pub use source::{CredentialSource, MAX_NUMBERED_KEYS};

use std::fmt;

/// Slot name for language-model access.
pub const MODEL_SLOT: &str = "model";
/// Slot name for search/extraction access.
pub const SEARCH_SLOT: &str = "search";

/// Secrets shorter than this are masked completely.
const MIN_PARTIAL_MASK_LEN: usize = 12;

/// An API key bound to the slot it belongs to.
///
/// The secret never appears in `Debug` or `Display` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    slot: String,
    secret: String,
    position: usize,
}

impl Credential {
    /// Creates a credential, returning `None` for absent or blank secrets.
    #[must_use]
    pub fn new(slot: impl Into<String>, secret: &str) -> Option<Self> {
        let secret = secret.trim();
        if secret.is_empty() {
            return None;
        }
        Some(Self {
            slot: slot.into(),
            secret: secret.to_string(),
            position: 1,
        })
    }

    /// Sets the 1-based position of this key within its slot.
    #[must_use]
    pub const fn with_position(mut self, position: usize) -> Self {
        self.position = position;
        self
    }

    /// Slot this credential belongs to.
    #[must_use]
    pub fn slot(&self) -> &str {
        &self.slot
    }

    /// 1-based position of this key within its slot.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// The raw secret. Only handle constructors should call this.
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Masked form safe for logs: the last four characters only, or nothing
    /// at all for short secrets.
    #[must_use]
    pub fn masked(&self) -> String {
        if self.secret.chars().count() < MIN_PARTIAL_MASK_LEN {
            return "****".to_string();
        }
        let tail: String = self
            .secret
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("****{tail}")
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("slot", &self.slot)
            .field("secret", &self.masked())
            .field("position", &self.position)
            .finish()
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.slot, self.masked())
    }
}
