//! Binary entrypoint for the vigil supervisor shell.
//!
//! The binary delegates to [`vigil_cli::run`], which parses arguments, loads
//! settings, discovers modules, and drives the supervisor in either headless
//! or interactive mode.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    vigil_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
