//! Platform process plumbing behind the supervisor's process-handle seam.
//!
//! All OS-specific spawn and signal handling lives here. The rest of the
//! crate works against [`ProcessHandle`] and [`ProcessLauncher`], which keeps
//! the lifecycle state machine deterministic under test: a fake launcher can
//! stand in for the operating system without touching any other module.

use std::fmt;
use std::fs::File;
use std::io;
use std::process::{Child, Command, ExitStatus, Stdio};

use tracing::debug;

use crate::module::ModuleSpec;

/// Tracing target for process operations.
const PROCESS_TARGET: &str = "vigil_supervisor::process";

/// Outcome captured when a module process is reaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitOutcome {
    /// Conventional exit code, when the process exited on its own.
    pub code: Option<i32>,
    /// Terminating signal number, when the process was signalled (Unix).
    pub signal: Option<i32>,
}

impl ExitOutcome {
    /// Outcome for a process that exited with the given code.
    #[must_use]
    pub fn from_code(code: i32) -> Self {
        Self {
            code: Some(code),
            signal: None,
        }
    }

    /// Outcome for a process terminated by the given signal.
    #[must_use]
    pub fn from_signal(signal: i32) -> Self {
        Self {
            code: None,
            signal: Some(signal),
        }
    }
}

impl fmt::Display for ExitOutcome {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, self.signal) {
            (Some(code), _) => write!(formatter, "exit code {code}"),
            (None, Some(signal)) => write!(formatter, "signal {signal}"),
            (None, None) => formatter.write_str("unknown exit"),
        }
    }
}

impl From<ExitStatus> for ExitOutcome {
    fn from(status: ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = {
            use std::os::unix::process::ExitStatusExt;
            status.signal()
        };
        #[cfg(not(unix))]
        let signal = None;
        Self {
            code: status.code(),
            signal,
        }
    }
}

/// Capability handle over one live OS process.
///
/// Exactly one handle exists per live module process, owned by the module's
/// runtime cell. `terminate` requests a graceful shutdown; `kill` is the hard
/// escalation used once a grace period is exhausted.
pub trait ProcessHandle: Send {
    /// OS process id.
    fn id(&self) -> u32;

    /// Requests graceful termination (SIGTERM on Unix).
    ///
    /// # Errors
    ///
    /// Returns the OS error when the signal could not be delivered. A process
    /// that is already gone is not an error.
    fn terminate(&mut self) -> io::Result<()>;

    /// Forcibly terminates the process.
    ///
    /// # Errors
    ///
    /// Returns the OS error when the kill could not be delivered.
    fn kill(&mut self) -> io::Result<()>;

    /// Reaps the process if it has exited, without blocking.
    ///
    /// # Errors
    ///
    /// Returns the OS error when the process state could not be queried.
    fn try_wait(&mut self) -> io::Result<Option<ExitOutcome>>;

    /// Blocks until the process exits and reaps it.
    ///
    /// Callers only invoke this after `kill`, so the wait is bounded.
    ///
    /// # Errors
    ///
    /// Returns the OS error when waiting failed.
    fn wait(&mut self) -> io::Result<ExitOutcome>;
}

/// Spawner for module processes.
///
/// The supervisor owns a single launcher and uses it for every module; tests
/// inject a fake to drive the state machine deterministically.
pub trait ProcessLauncher: Send + Sync {
    /// Spawns the module with stdout/stderr attached to the given log files.
    ///
    /// Returns once the OS confirms process creation; the spawned service may
    /// still be initialising.
    ///
    /// # Errors
    ///
    /// Returns the OS error when the executable is missing or exec failed.
    fn launch(
        &self,
        spec: &ModuleSpec,
        arguments: &[String],
        stdout: File,
        stderr: File,
    ) -> io::Result<Box<dyn ProcessHandle>>;
}

/// Launcher backed by [`std::process::Command`].
#[derive(Debug, Default)]
pub struct SystemLauncher;

impl SystemLauncher {
    /// Builds the system launcher.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ProcessLauncher for SystemLauncher {
    fn launch(
        &self,
        spec: &ModuleSpec,
        arguments: &[String],
        stdout: File,
        stderr: File,
    ) -> io::Result<Box<dyn ProcessHandle>> {
        debug!(
            target: PROCESS_TARGET,
            module = spec.name(),
            program = %spec.program().display(),
            ?arguments,
            "spawning module process"
        );
        let child = Command::new(spec.program())
            .args(arguments)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .spawn()?;
        debug!(
            target: PROCESS_TARGET,
            module = spec.name(),
            pid = child.id(),
            "module process spawned"
        );
        Ok(Box::new(SystemProcess { child }))
    }
}

/// Process handle wrapping a [`Child`].
struct SystemProcess {
    child: Child,
}

impl ProcessHandle for SystemProcess {
    fn id(&self) -> u32 {
        self.child.id()
    }

    #[cfg(unix)]
    fn terminate(&mut self) -> io::Result<()> {
        use nix::errno::Errno;
        use nix::sys::signal::{Signal, kill};
        use nix::unistd::Pid;

        match kill(Pid::from_raw(self.child.id() as i32), Signal::SIGTERM) {
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(errno) => Err(io::Error::from_raw_os_error(errno as i32)),
        }
    }

    #[cfg(not(unix))]
    fn terminate(&mut self) -> io::Result<()> {
        // No graceful signal on this platform; escalate straight to kill.
        self.child.kill()
    }

    fn kill(&mut self) -> io::Result<()> {
        match self.child.kill() {
            Ok(()) => Ok(()),
            // InvalidInput is what std reports for an already-reaped child.
            Err(error) if error.kind() == io::ErrorKind::InvalidInput => Ok(()),
            Err(error) => Err(error),
        }
    }

    fn try_wait(&mut self) -> io::Result<Option<ExitOutcome>> {
        Ok(self.child.try_wait()?.map(ExitOutcome::from))
    }

    fn wait(&mut self) -> io::Result<ExitOutcome> {
        Ok(self.child.wait().map(ExitOutcome::from)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_outcome_renders_code_and_signal() {
        assert_eq!(ExitOutcome::from_code(0).to_string(), "exit code 0");
        assert_eq!(ExitOutcome::from_signal(15).to_string(), "signal 15");
        let unknown = ExitOutcome {
            code: None,
            signal: None,
        };
        assert_eq!(unknown.to_string(), "unknown exit");
    }

    #[cfg(unix)]
    #[test]
    fn system_launcher_reaps_short_lived_process() {
        use crate::module::{ModuleKind, ModuleSpec};
        use std::time::{Duration, Instant};

        let dir = tempfile::tempdir().expect("temp dir");
        let stdout = File::create(dir.path().join("out.log")).expect("stdout file");
        let stderr = File::create(dir.path().join("err.log")).expect("stderr file");
        let spec = ModuleSpec::new("vigil-true", ModuleKind::System, "/bin/true");
        let mut handle = SystemLauncher::new()
            .launch(&spec, &[], stdout, stderr)
            .expect("spawn /bin/true");

        let deadline = Instant::now() + Duration::from_secs(5);
        let outcome = loop {
            if let Some(outcome) = handle.try_wait().expect("try_wait") {
                break outcome;
            }
            assert!(Instant::now() < deadline, "process did not exit in time");
            std::thread::sleep(Duration::from_millis(10));
        };
        assert_eq!(outcome.code, Some(0));
    }

    #[cfg(unix)]
    #[test]
    fn terminate_stops_a_sleeping_process() {
        use crate::module::{ModuleKind, ModuleSpec};

        let dir = tempfile::tempdir().expect("temp dir");
        let stdout = File::create(dir.path().join("out.log")).expect("stdout file");
        let stderr = File::create(dir.path().join("err.log")).expect("stderr file");
        let spec = ModuleSpec::new("vigil-sleep", ModuleKind::System, "/bin/sleep");
        let mut handle = SystemLauncher::new()
            .launch(&spec, &[String::from("30")], stdout, stderr)
            .expect("spawn /bin/sleep");

        handle.terminate().expect("send SIGTERM");
        let outcome = handle.wait().expect("wait for exit");
        assert_eq!(outcome.signal, Some(15));
    }
}
