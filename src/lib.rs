//! # quest-rs
//!
//! Research assistant core: a query is planned into steps, the steps are
//! researched in parallel with web search and page extraction, and the
//! facts are summarized into a bullet-point answer.
//!
//! ## Overview
//!
//! - [`credentials`]: numbered API keys per slot with cyclic rotation
//! - [`capability`]: builds model and search handles from the current keys
//! - [`search`]: web search and context extraction clients
//! - [`agent`]: planning, research, summarizer and controller agents
//! - [`runner`]: runs the pipeline off-thread and reports progress
//! - [`cli`]: the `quest-rs` command line
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use quest_rs::agent::{AgentConfig, AgentPipeline};
//! use quest_rs::capability::CapabilityClientFactory;
//! use quest_rs::credentials::CredentialSource;
//! use quest_rs::runner::{PipelineRunner, RunEventKind};
//!
//! let config = AgentConfig::from_env();
//! let factory = CapabilityClientFactory::new(
//!     Arc::new(CredentialSource::model().rotator_from_env(None)),
//!     Arc::new(CredentialSource::search().rotator_from_env(None)),
//!     config.clone(),
//! );
//! let runner = PipelineRunner::new(factory, Arc::new(AgentPipeline::new(&config)));
//!
//! let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
//! let handle = runner.start("How do heat pumps work?", tx);
//! while let Some(event) = rx.blocking_recv() {
//!     if let RunEventKind::Finished { outcome } = event.kind {
//!         println!("{outcome}");
//!         break;
//!     }
//! }
//! let _ = handle.join();
//! ```

pub mod agent;
pub mod capability;
pub mod cli;
pub mod credentials;
pub mod error;
pub mod runner;
pub mod search;

// Re-export commonly used types
pub use capability::{CapabilityClientFactory, CapabilityClients};
pub use credentials::{Credential, CredentialRotator, CredentialSource};
pub use error::{AgentError, CommandError, CredentialError, Error, Result};
pub use runner::{PipelineRunner, RunEvent, RunId, RunOutcome};
