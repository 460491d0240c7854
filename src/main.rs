//! quest-rs CLI entry point.

use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use quest_rs::cli::{Cli, execute};
use quest_rs::{CommandError, Error};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let default = if verbose { "quest_rs=info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match execute(&cli) {
        Ok(output) => {
            let _ = write!(io::stdout(), "{output}");
            ExitCode::SUCCESS
        }
        Err(Error::Command(CommandError::RunFailed(rendered))) => {
            let _ = write!(io::stdout(), "{rendered}");
            ExitCode::FAILURE
        }
        Err(e) => {
            let err = anyhow::Error::new(e);
            let _ = writeln!(io::stderr(), "Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
