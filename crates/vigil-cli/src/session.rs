//! Interactive command session.
//!
//! Mirrors the headless loop's duties (reconcile, surface unexpected stops)
//! while letting the operator issue lifecycle commands line by line. The
//! session reads from any `BufRead` so tests can script it.

use std::io::{BufRead, Write};

use tracing::debug;
use vigil_supervisor::Supervisor;

use crate::CliError;

const SESSION_TARGET: &str = "vigil_cli::session";

const USAGE: &str = "\
commands:
  status [name]   show module states
  start <name>    start a module
  stop <name>     stop a module
  toggle <name>   start or stop depending on liveness
  log <name>      print the module's captured output
  help            show this help
  q               quit and stop all modules
";

/// Runs the interactive session until quit or end of input.
///
/// # Errors
///
/// Returns [`CliError`] when writing to the output stream fails. Command
/// failures (unknown module, spawn errors) are reported inline and do not
/// end the session.
pub(crate) fn run(
    supervisor: &Supervisor,
    input: impl BufRead,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    writeln!(out, "vigil interactive session; type 'help' for commands")?;
    let mut lines = input.lines();
    loop {
        supervisor.reconcile();
        announce_stops(supervisor, out)?;
        write!(out, "> ")?;
        out.flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            continue;
        };
        let argument = words.next();

        match (command, argument) {
            ("q" | "quit" | "exit", _) => break,
            ("help", _) => out.write_all(USAGE.as_bytes())?,
            ("status", name) => report(supervisor.print_status(out, name), out)?,
            ("start", Some(name)) => report(supervisor.start(name), out)?,
            ("stop", Some(name)) => report(supervisor.stop(name), out)?,
            ("toggle", Some(name)) => report(supervisor.toggle(name), out)?,
            ("log", Some(name)) => match supervisor.read_log(name) {
                Ok(content) => out.write_all(content.as_bytes())?,
                Err(error) => writeln!(out, "error: {error}")?,
            },
            _ => {
                debug!(target: SESSION_TARGET, %line, "unrecognised command");
                writeln!(out, "unrecognised command: {line}")?;
                out.write_all(USAGE.as_bytes())?;
            }
        }
    }
    Ok(())
}

fn report(
    result: Result<(), vigil_supervisor::SupervisorError>,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    if let Err(error) = result {
        writeln!(out, "error: {error}")?;
    }
    Ok(())
}

fn announce_stops(supervisor: &Supervisor, out: &mut dyn Write) -> Result<(), CliError> {
    for module in supervisor.unexpected_stops() {
        let status = module.status();
        match status.last_exit_code {
            Some(code) => writeln!(
                out,
                "module {} stopped unexpectedly (exit code {code})",
                module.name()
            )?,
            None => writeln!(out, "module {} stopped unexpectedly", module.name())?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::time::Duration;

    use tempfile::TempDir;
    use vigil_supervisor::{ModuleCatalog, SupervisorOptions};

    fn empty_supervisor(logs: &TempDir) -> Supervisor {
        let catalog = ModuleCatalog::from_candidates(Vec::new(), Vec::new());
        let options = SupervisorOptions::new(logs.path()).grace(Duration::from_millis(50));
        Supervisor::new(catalog, options)
    }

    fn run_script(script: &str) -> String {
        let logs = TempDir::new().expect("log dir");
        let supervisor = empty_supervisor(&logs);
        let mut out = Vec::new();
        run(&supervisor, Cursor::new(script.to_owned()), &mut out).expect("session runs");
        String::from_utf8(out).expect("utf8 output")
    }

    #[test]
    fn quit_ends_the_session() {
        let rendered = run_script("q\n");
        assert!(rendered.contains("interactive session"));
    }

    #[test]
    fn end_of_input_ends_the_session() {
        let rendered = run_script("");
        assert!(rendered.ends_with("> "));
    }

    #[test]
    fn status_renders_the_table_header() {
        let rendered = run_script("status\nq\n");
        assert!(rendered.contains("MODULE"));
    }

    #[test]
    fn unknown_module_is_reported_inline() {
        let rendered = run_script("start vigil-bogus\nq\n");
        assert!(rendered.contains("error:"));
        assert!(rendered.contains("vigil-bogus"));
    }

    #[test]
    fn unrecognised_command_prints_usage() {
        let rendered = run_script("frobnicate\nq\n");
        assert!(rendered.contains("unrecognised command"));
        assert!(rendered.contains("commands:"));
    }

    #[test]
    fn blank_lines_are_ignored() {
        let rendered = run_script("\n\nq\n");
        assert!(!rendered.contains("unrecognised"));
    }
}
