//! Run identity and the events a run reports.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::error::AgentError;

static NEXT_RUN_ID: AtomicU64 = AtomicU64::new(1);

/// Identifier of one run. Increases monotonically within the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RunId(u64);

impl RunId {
    /// Allocates the next identifier.
    pub(crate) fn next() -> Self {
        Self(NEXT_RUN_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Terminal result of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RunOutcome {
    /// The pipeline produced an answer.
    Success {
        /// Final answer text.
        text: String,
    },
    /// The run failed.
    Failure {
        /// The error message.
        message: String,
        /// Full diagnostic trace.
        trace: String,
    },
}

impl RunOutcome {
    /// Failure outcome for `error`.
    #[must_use]
    pub fn from_error(error: &AgentError) -> Self {
        Self::Failure {
            message: error.to_string(),
            trace: error.diagnostic_trace(),
        }
    }

    /// Returns `true` for [`RunOutcome::Success`].
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success { text } => f.write_str(text),
            Self::Failure { trace, .. } => f.write_str(trace),
        }
    }
}

/// What a run reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum RunEventKind {
    /// A progress line.
    Progress {
        /// Human-readable message.
        message: String,
    },
    /// The terminal outcome. Nothing follows it.
    Finished {
        /// The outcome.
        outcome: RunOutcome,
    },
}

/// An event tagged with the run that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunEvent {
    /// Producing run.
    pub run_id: RunId,
    /// Payload.
    #[serde(flatten)]
    pub kind: RunEventKind,
}

impl RunEvent {
    pub(crate) fn progress(run_id: RunId, message: impl Into<String>) -> Self {
        Self {
            run_id,
            kind: RunEventKind::Progress {
                message: message.into(),
            },
        }
    }

    pub(crate) const fn finished(run_id: RunId, outcome: RunOutcome) -> Self {
        Self {
            run_id,
            kind: RunEventKind::Finished { outcome },
        }
    }

    /// Returns `true` for the terminal event.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self.kind, RunEventKind::Finished { .. })
    }
}

/// Drops events from runs that a newer run has superseded.
#[derive(Debug, Clone, Copy, Default)]
pub struct LatestRunFilter {
    latest: Option<RunId>,
}

impl LatestRunFilter {
    /// Creates a filter that has seen no run.
    #[must_use]
    pub const fn new() -> Self {
        Self { latest: None }
    }

    /// Records a newly started run. Older ids never replace newer ones.
    pub fn started(&mut self, run_id: RunId) {
        if self.latest.is_none_or(|latest| run_id > latest) {
            self.latest = Some(run_id);
        }
    }

    /// Newest started run.
    #[must_use]
    pub const fn latest(&self) -> Option<RunId> {
        self.latest
    }

    /// Returns `true` if `event` belongs to the newest run.
    #[must_use]
    pub fn accepts(&self, event: &RunEvent) -> bool {
        self.latest == Some(event.run_id)
    }
}
