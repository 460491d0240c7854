//! CLI command implementations.
//!
//! Contains the business logic for each CLI command.

use std::io::{self, Write as IoWrite};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::agent::config::AgentConfig;
use crate::agent::pipeline::AgentPipeline;
use crate::agent::prompt::PromptSet;
use crate::capability::CapabilityClientFactory;
use crate::cli::output::{OutputFormat, RunReport, SlotSummary, format_slots};
use crate::cli::parser::{Cli, Commands};
use crate::credentials::{
    CredentialSource, RotationEvent, RotationEventKind, RotationObserver, source,
};
use crate::error::{CommandError, Result};
use crate::runner::{LatestRunFilter, PipelineRunner, RotationPolicy, RunEventKind};

// ==================== Parameter Structs ====================

/// Parameters for the ask command.
#[derive(Debug, Clone)]
pub struct AskParams<'a> {
    /// The research question.
    pub query: &'a str,
    /// Lightweight model override.
    pub light_model: Option<&'a str>,
    /// Standard model override.
    pub standard_model: Option<&'a str>,
    /// Temperature override.
    pub temperature: Option<f32>,
    /// Max tokens override.
    pub max_tokens: Option<u32>,
    /// Research concurrency override.
    pub concurrency: Option<usize>,
    /// Instruction override directory.
    pub prompt_dir: Option<&'a Path>,
    /// Use the narrowed rotation policy.
    pub rotate_on_credential_errors: bool,
    /// Disable progress pacing.
    pub no_pacing: bool,
}

/// Executes the parsed command.
///
/// # Errors
///
/// Returns an error if the command fails. A failed `ask` run returns
/// [`CommandError::RunFailed`] holding the rendered outcome.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);

    match &cli.command {
        Commands::Ask {
            query,
            light_model,
            standard_model,
            temperature,
            max_tokens,
            concurrency,
            prompt_dir,
            rotate_on_credential_errors,
            no_pacing,
        } => {
            let params = AskParams {
                query,
                light_model: light_model.as_deref(),
                standard_model: standard_model.as_deref(),
                temperature: *temperature,
                max_tokens: *max_tokens,
                concurrency: *concurrency,
                prompt_dir: prompt_dir.as_deref(),
                rotate_on_credential_errors: *rotate_on_credential_errors,
                no_pacing: *no_pacing,
            };
            cmd_ask(&params, format)
        }
        Commands::Keys => cmd_keys(format),
        Commands::InitPrompts { dir } => cmd_init_prompts(dir.as_deref(), format),
    }
}

/// Resolves configuration: CLI overrides, then environment, then defaults.
fn build_config(params: &AskParams<'_>) -> AgentConfig {
    let mut builder = AgentConfig::builder();
    if let Some(model) = params.light_model {
        builder = builder.lightweight_model(model);
    }
    if let Some(model) = params.standard_model {
        builder = builder.standard_model(model);
    }
    if let Some(t) = params.temperature {
        builder = builder.temperature(t);
    }
    if let Some(n) = params.max_tokens {
        builder = builder.max_tokens(n);
    }
    if let Some(n) = params.concurrency {
        builder = builder.max_concurrency(n);
    }
    if let Some(dir) = params.prompt_dir {
        builder = builder.prompt_dir(dir);
    }
    if params.no_pacing {
        builder = builder.progress_delay(Duration::ZERO);
    }
    builder.from_env().build()
}

/// Reports key switches on stderr as they happen.
fn rotation_notice() -> RotationObserver {
    Arc::new(|event: &RotationEvent| {
        if event.kind == RotationEventKind::Rotated {
            let _ = writeln!(io::stderr(), "{event}");
        }
    })
}

fn cmd_ask(params: &AskParams<'_>, format: OutputFormat) -> Result<String> {
    source::load_dotenv();
    let config = build_config(params);

    let model_rotator =
        Arc::new(CredentialSource::model().rotator_from_env(Some(rotation_notice())));
    let search_rotator =
        Arc::new(CredentialSource::search().rotator_from_env(Some(rotation_notice())));

    let factory = CapabilityClientFactory::new(model_rotator, search_rotator, config.clone());
    let pipeline = Arc::new(AgentPipeline::new(&config));
    let policy = if params.rotate_on_credential_errors {
        RotationPolicy::CredentialRelated
    } else {
        RotationPolicy::Always
    };
    let runner = PipelineRunner::new(factory, pipeline).with_policy(policy);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle = runner.start(params.query, tx);
    let mut filter = LatestRunFilter::new();
    filter.started(handle.id());

    let mut progress = Vec::new();
    let mut outcome = None;
    while let Some(event) = rx.blocking_recv() {
        if !filter.accepts(&event) {
            continue;
        }
        match event.kind {
            RunEventKind::Progress { message } => {
                if format == OutputFormat::Text {
                    let _ = writeln!(io::stderr(), "{message}");
                }
                progress.push(message);
            }
            RunEventKind::Finished { outcome: finished } => {
                outcome = Some(finished);
                break;
            }
        }
    }

    let run_id = handle.id();
    handle
        .join()
        .map_err(|_| CommandError::ExecutionFailed(format!("run {run_id} worker panicked")))?;
    let outcome = outcome.ok_or_else(|| {
        CommandError::ExecutionFailed(format!("run {run_id} ended without an outcome"))
    })?;

    let report = RunReport {
        run_id,
        progress,
        outcome,
    };
    let rendered = report.render(format).map_err(CommandError::OutputFormat)?;
    if report.outcome.is_success() {
        Ok(rendered)
    } else {
        Err(CommandError::RunFailed(rendered).into())
    }
}

fn cmd_keys(format: OutputFormat) -> Result<String> {
    source::load_dotenv();
    let slots: Vec<SlotSummary> = [CredentialSource::model(), CredentialSource::search()]
        .into_iter()
        .map(|src| {
            let keys = src.rotator_from_env(None).len();
            SlotSummary {
                slot: src.slot,
                prefix: src.prefix,
                keys,
            }
        })
        .collect();
    Ok(format_slots(&slots, format))
}

fn cmd_init_prompts(dir: Option<&Path>, format: OutputFormat) -> Result<String> {
    let target_dir = dir
        .map(PathBuf::from)
        .or_else(PromptSet::default_dir)
        .ok_or_else(|| {
            CommandError::ExecutionFailed(
                "Could not determine home directory for default prompt path".to_string(),
            )
        })?;

    let written = PromptSet::write_defaults(&target_dir).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to write prompt templates: {e}"))
    })?;

    match format {
        OutputFormat::Text => {
            if written.is_empty() {
                return Ok(format!(
                    "All prompt templates already exist in: {}\n",
                    target_dir.display()
                ));
            }
            let mut output = format!(
                "Wrote {} prompt template(s) to: {}\n",
                written.len(),
                target_dir.display()
            );
            for path in &written {
                output.push_str("  ");
                output.push_str(
                    path.file_name()
                        .and_then(|n| n.to_str())
                        .unwrap_or("unknown"),
                );
                output.push('\n');
            }
            output.push_str("\nEdit these files to customize agent instructions.\n");
            Ok(output)
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "directory": target_dir.to_string_lossy(),
                "written": written.iter().map(|p| p.to_string_lossy().into_owned()).collect::<Vec<_>>(),
                "count": written.len()
            });
            serde_json::to_string_pretty(&json)
                .map_err(|e| CommandError::OutputFormat(e.to_string()).into())
        }
    }
}
