//! Pipeline runner.
//!
//! Each run executes on its own worker thread with a single-threaded tokio
//! runtime, so the caller's thread never blocks. Progress and the terminal
//! outcome travel back over a channel as [`RunEvent`]s tagged with the run's
//! [`RunId`]. Every run ends with exactly one `Finished` event.
//!
//! A failed run rotates both credential slots and rebuilds the clients before
//! reporting, so the *next* run uses fresh keys. The failed run itself is not
//! retried.

pub mod event;

pub use event::{LatestRunFilter, RunEvent, RunEventKind, RunId, RunOutcome};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::agent::pipeline::ResearchPipeline;
use crate::capability::{CapabilityClientFactory, CapabilityClients};
use crate::credentials::CredentialRotator;
use crate::error::AgentError;

/// Stage messages, always reported in this order.
pub const PROGRESS_MESSAGES: [&str; 4] = [
    "Planning the steps...",
    "Searching information...",
    "Extracting context...",
    "Summarizing findings...",
];

/// Reported when a failure triggers rotation.
pub const ROTATION_MESSAGE: &str = "Error occurred, rotating API keys...";

/// When a failed run rotates credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RotationPolicy {
    /// Rotate after every failure.
    #[default]
    Always,
    /// Rotate only when a different key might help.
    CredentialRelated,
}

impl RotationPolicy {
    fn applies_to(self, error: &AgentError) -> bool {
        match self {
            Self::Always => true,
            Self::CredentialRelated => error.is_credential_related(),
        }
    }
}

/// Handle to a started run.
#[derive(Debug)]
pub struct RunHandle {
    id: RunId,
    worker: Option<JoinHandle<()>>,
}

impl RunHandle {
    /// Identifier carried by every event of this run.
    #[must_use]
    pub const fn id(&self) -> RunId {
        self.id
    }

    /// Waits for the worker thread to exit.
    ///
    /// # Errors
    ///
    /// Returns the panic payload if the worker panicked.
    pub fn join(mut self) -> std::thread::Result<()> {
        self.worker.take().map_or(Ok(()), JoinHandle::join)
    }
}

struct Shared {
    factory: CapabilityClientFactory,
    pipeline: Arc<dyn ResearchPipeline>,
    clients: Mutex<Option<CapabilityClients>>,
}

/// Per-runner knobs copied into each worker.
#[derive(Debug, Clone, Copy)]
struct RunSettings {
    progress_delay: Duration,
    policy: RotationPolicy,
}

/// Starts pipeline runs off the caller's thread.
#[derive(Clone)]
pub struct PipelineRunner {
    shared: Arc<Shared>,
    settings: RunSettings,
}

impl PipelineRunner {
    /// Creates a runner. Progress pacing comes from the factory's config.
    #[must_use]
    pub fn new(factory: CapabilityClientFactory, pipeline: Arc<dyn ResearchPipeline>) -> Self {
        let settings = RunSettings {
            progress_delay: factory.config().progress_delay,
            policy: RotationPolicy::default(),
        };
        Self {
            shared: Arc::new(Shared {
                factory,
                pipeline,
                clients: Mutex::new(None),
            }),
            settings,
        }
    }

    /// Sets the rotation policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: RotationPolicy) -> Self {
        self.settings.policy = policy;
        self
    }

    /// Overrides the pause between progress messages.
    #[must_use]
    pub const fn with_progress_delay(mut self, delay: Duration) -> Self {
        self.settings.progress_delay = delay;
        self
    }

    /// Model-slot rotator.
    #[must_use]
    pub fn model_rotator(&self) -> &Arc<CredentialRotator> {
        self.shared.factory.model_rotator()
    }

    /// Search-slot rotator.
    #[must_use]
    pub fn search_rotator(&self) -> &Arc<CredentialRotator> {
        self.shared.factory.search_rotator()
    }

    /// Starts a run for `query`, reporting to `events`.
    ///
    /// A blank query finishes immediately with a validation failure and no
    /// worker is started. Runs may overlap; consumers that only care about
    /// the newest one can use [`LatestRunFilter`].
    #[must_use]
    pub fn start(&self, query: &str, events: UnboundedSender<RunEvent>) -> RunHandle {
        let id = RunId::next();

        if query.trim().is_empty() {
            let error = AgentError::Validation {
                message: "query must not be empty".to_string(),
            };
            debug!(run = %id, "rejected blank query");
            emit(&events, RunEvent::finished(id, RunOutcome::from_error(&error)));
            return RunHandle { id, worker: None };
        }

        let shared = Arc::clone(&self.shared);
        let settings = self.settings;
        let query = query.trim().to_string();
        let sink = events.clone();
        let spawned = std::thread::Builder::new()
            .name(format!("quest-run-{}", id.get()))
            .spawn(move || {
                let outcome = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime.block_on(shared.execute(settings, id, &query, &sink)),
                    Err(e) => shared.fail(
                        settings.policy,
                        id,
                        &sink,
                        &AgentError::Orchestration {
                            message: format!("failed to start runtime: {e}"),
                        },
                    ),
                };
                info!(run = %id, success = outcome.is_success(), "run finished");
                emit(&sink, RunEvent::finished(id, outcome));
            });

        match spawned {
            Ok(worker) => RunHandle {
                id,
                worker: Some(worker),
            },
            Err(e) => {
                let error = AgentError::Orchestration {
                    message: format!("failed to start worker thread: {e}"),
                };
                let outcome = self.shared.fail(self.settings.policy, id, &events, &error);
                emit(&events, RunEvent::finished(id, outcome));
                RunHandle { id, worker: None }
            }
        }
    }
}

impl std::fmt::Debug for PipelineRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineRunner")
            .field("factory", &self.shared.factory)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Shared {
    async fn execute(
        &self,
        settings: RunSettings,
        id: RunId,
        query: &str,
        sink: &UnboundedSender<RunEvent>,
    ) -> RunOutcome {
        let clients = match self.clients() {
            Ok(clients) => clients,
            Err(e) => return self.fail(settings.policy, id, sink, &e),
        };

        for credential in [clients.model_credential(), clients.search_credential()] {
            emit(
                sink,
                RunEvent::progress(
                    id,
                    format!("Using {} API key No. {}", credential.slot(), credential.position()),
                ),
            );
        }

        for message in PROGRESS_MESSAGES {
            emit(sink, RunEvent::progress(id, message));
            if !settings.progress_delay.is_zero() {
                tokio::time::sleep(settings.progress_delay).await;
            }
        }

        match self.pipeline.run(&clients, query).await {
            Ok(text) => RunOutcome::Success { text },
            Err(e) => self.fail(settings.policy, id, sink, &e),
        }
    }

    /// Cached clients, built on first use or after a failed rebuild.
    fn clients(&self) -> Result<CapabilityClients, AgentError> {
        let mut cached = lock(&self.clients);
        if let Some(clients) = cached.as_ref() {
            return Ok(clients.clone());
        }
        let clients = self.factory.build()?;
        *cached = Some(clients.clone());
        Ok(clients)
    }

    /// Prepares the next run after a failure and returns the failure outcome.
    fn fail(
        &self,
        policy: RotationPolicy,
        id: RunId,
        sink: &UnboundedSender<RunEvent>,
        error: &AgentError,
    ) -> RunOutcome {
        warn!(run = %id, error = %error, "run failed");

        if policy.applies_to(error) {
            emit(sink, RunEvent::progress(id, ROTATION_MESSAGE));
            for rotator in [self.factory.model_rotator(), self.factory.search_rotator()] {
                if let Err(e) = rotator.rotate() {
                    warn!(slot = rotator.slot(), error = %e, "rotation skipped");
                }
            }
            let rebuilt = match self.factory.build() {
                Ok(clients) => Some(clients),
                Err(e) => {
                    warn!(error = %e, "client rebuild failed, retrying on next run");
                    None
                }
            };
            *lock(&self.clients) = rebuilt;
        }

        RunOutcome::from_error(error)
    }
}

fn lock(clients: &Mutex<Option<CapabilityClients>>) -> MutexGuard<'_, Option<CapabilityClients>> {
    clients.lock().unwrap_or_else(PoisonError::into_inner)
}

fn emit(sink: &UnboundedSender<RunEvent>, event: RunEvent) {
    if sink.send(event).is_err() {
        debug!("run event dropped, receiver closed");
    }
}
