//! Command-line runtime for the vigil module supervisor.
//!
//! Wires the pieces together: argument parsing, settings loading, module
//! discovery, supervisor construction, autostart, and then either the
//! headless signal-wait loop or the interactive session. All modules are
//! stopped on the way out regardless of which mode ran.

use std::ffi::OsString;
use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind;
use thiserror::Error;
use tracing::{info, warn};

use vigil_config::{ConfigError, Settings};
use vigil_supervisor::{ModuleRegistry, Supervisor, SupervisorError, SupervisorOptions};

mod cli;
mod headless;
mod session;
mod telemetry;

use cli::Cli;

const CLI_TARGET: &str = "vigil_cli";

/// Errors surfaced to the operator by the CLI runtime.
#[derive(Debug, Error)]
pub enum CliError {
    /// Settings file could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A supervisor operation failed.
    #[error(transparent)]
    Supervisor(#[from] SupervisorError),
    /// Writing to an output stream failed.
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
    /// Signal handlers could not be installed.
    #[error("failed to install signal handler: {0}")]
    Signals(io::Error),
}

/// Parses arguments and runs the supervisor shell.
pub fn run(
    arguments: impl IntoIterator<Item = OsString>,
    stdout: &mut impl Write,
    stderr: &mut impl Write,
) -> ExitCode {
    let parsed = match Cli::try_parse_from(arguments) {
        Ok(parsed) => parsed,
        Err(error) => return render_parse_error(&error, stdout, stderr),
    };
    telemetry::init(parsed.verbose);
    match execute(&parsed, stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let _ = writeln!(stderr, "vigil: {error}");
            ExitCode::FAILURE
        }
    }
}

fn render_parse_error(
    error: &clap::Error,
    stdout: &mut impl Write,
    stderr: &mut impl Write,
) -> ExitCode {
    let rendered = error.render();
    match error.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = write!(stdout, "{rendered}");
            ExitCode::SUCCESS
        }
        _ => {
            let _ = write!(stderr, "{rendered}");
            ExitCode::FAILURE
        }
    }
}

fn execute(parsed: &Cli, stdout: &mut impl Write) -> Result<(), CliError> {
    let settings = Settings::load(parsed.testing)?;
    let catalog = ModuleRegistry::from_environment().discover();
    if catalog.is_empty() {
        warn!(
            target: CLI_TARGET,
            "no modules found next to the executable or on PATH"
        );
    }
    info!(
        target: CLI_TARGET,
        modules = catalog.len(),
        testing = parsed.testing,
        "starting supervisor"
    );

    let options = SupervisorOptions::new(vigil_config::log_root())
        .testing(parsed.testing)
        .grace(settings.stop_grace());
    let supervisor = Supervisor::new(catalog, options);

    let autostart = parsed
        .autostart_modules
        .clone()
        .unwrap_or_else(|| settings.autostart_modules().to_vec());
    supervisor.autostart(&autostart);

    let outcome = if parsed.interactive {
        session::run(&supervisor, io::stdin().lock(), stdout)
    } else {
        headless::run(&supervisor)
    };

    info!(target: CLI_TARGET, "shutting down; stopping all modules");
    supervisor.stop_all();
    outcome
}
