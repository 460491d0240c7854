//! Cyclic credential rotation for one slot.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, info};

use super::Credential;
use crate::error::CredentialError;

/// What happened to a rotator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationEventKind {
    /// The current credential was read.
    Used,
    /// The rotator advanced to the next credential.
    Rotated,
}

/// Observability event emitted on every `current()`/`rotate()` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationEvent {
    /// Slot name.
    pub slot: String,
    /// 1-based position of the credential now in use.
    pub position: usize,
    /// Number of credentials in the slot.
    pub total: usize,
    /// Event kind.
    pub kind: RotationEventKind,
}

impl fmt::Display for RotationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            RotationEventKind::Used => {
                write!(f, "Using {} API key No. {}", self.slot, self.position)
            }
            RotationEventKind::Rotated => {
                write!(f, "Switching to {} API key No. {}", self.slot, self.position)
            }
        }
    }
}

/// Callback receiving [`RotationEvent`]s.
pub type RotationObserver = Arc<dyn Fn(&RotationEvent) + Send + Sync>;

/// Holds an ordered set of equivalent credentials for one slot.
///
/// The index only moves through [`CredentialRotator::rotate`] and wraps
/// around after the last credential. The rotator does not count failures;
/// callers that want to stop after a full cycle must track that themselves.
///
/// Shared across runs behind an `Arc`; the index is an atomic so rotation
/// needs no lock.
pub struct CredentialRotator {
    slot: String,
    credentials: Vec<Credential>,
    index: AtomicUsize,
    observer: Option<RotationObserver>,
}

impl CredentialRotator {
    /// Builds a rotator from raw secrets, dropping absent and blank entries.
    ///
    /// An empty result is allowed here; [`Self::current`] and
    /// [`Self::rotate`] report it as [`CredentialError::NoCredentialsAvailable`].
    pub fn new<I, S>(slot: impl Into<String>, secrets: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: AsRef<str>,
    {
        let slot = slot.into();
        let credentials = secrets
            .into_iter()
            .flatten()
            .filter_map(|s| Credential::new(slot.clone(), s.as_ref()))
            .enumerate()
            .map(|(i, credential)| credential.with_position(i + 1))
            .collect();
        Self {
            slot,
            credentials,
            index: AtomicUsize::new(0),
            observer: None,
        }
    }

    /// Attaches an observer that receives every rotation event.
    #[must_use]
    pub fn with_observer(mut self, observer: RotationObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Slot name.
    #[must_use]
    pub fn slot(&self) -> &str {
        &self.slot
    }

    /// Number of usable credentials.
    #[must_use]
    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    /// Returns `true` if the slot holds no credential.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    /// Current 0-based index.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index.load(Ordering::Acquire)
    }

    /// Returns the credential at the current index.
    pub fn current(&self) -> Result<Credential, CredentialError> {
        let len = self.ensure_available()?;
        let idx = self.index() % len;
        self.emit(idx, RotationEventKind::Used);
        Ok(self.credentials[idx].clone())
    }

    /// Advances to the next credential (wrapping) and returns it.
    pub fn rotate(&self) -> Result<Credential, CredentialError> {
        let len = self.ensure_available()?;
        let previous = self
            .index
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |i| Some((i + 1) % len))
            .unwrap_or_else(|i| i);
        let idx = (previous + 1) % len;
        info!(slot = %self.slot, key = idx + 1, total = len, "rotated API key");
        self.emit(idx, RotationEventKind::Rotated);
        Ok(self.credentials[idx].clone())
    }

    fn ensure_available(&self) -> Result<usize, CredentialError> {
        if self.credentials.is_empty() {
            return Err(CredentialError::NoCredentialsAvailable {
                slot: self.slot.clone(),
            });
        }
        Ok(self.credentials.len())
    }

    fn emit(&self, idx: usize, kind: RotationEventKind) {
        let event = RotationEvent {
            slot: self.slot.clone(),
            position: idx + 1,
            total: self.credentials.len(),
            kind,
        };
        debug!(slot = %event.slot, key = event.position, kind = ?kind, "credential event");
        if let Some(observer) = &self.observer {
            observer(&event);
        }
    }
}

impl fmt::Debug for CredentialRotator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRotator")
            .field("slot", &self.slot)
            .field("credentials", &self.credentials.len())
            .field("index", &self.index())
            .field("observer", &self.observer.is_some())
            .finish()
    }
}
