//! Headless supervision loop.
//!
//! The default mode: autostarted modules run until the process receives
//! SIGTERM or SIGINT, with a periodic reconcile pass detecting modules that
//! died behind the supervisor's back.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use signal_hook::consts::{SIGINT, SIGTERM};
use tracing::{info, warn};
use vigil_supervisor::Supervisor;

use crate::CliError;

const HEADLESS_TARGET: &str = "vigil_cli::headless";

/// Cadence of the reconcile pass.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Number of trailing log lines surfaced when a module crashes.
const CRASH_LOG_LINES: usize = 20;

/// Supervises until a termination signal arrives.
///
/// # Errors
///
/// Returns [`CliError::Signals`] when the signal handlers cannot be
/// installed.
pub(crate) fn run(supervisor: &Supervisor) -> Result<(), CliError> {
    let shutdown = Arc::new(AtomicBool::new(false));
    for signal in [SIGTERM, SIGINT] {
        signal_hook::flag::register(signal, Arc::clone(&shutdown))
            .map_err(CliError::Signals)?;
    }
    info!(
        target: HEADLESS_TARGET,
        "supervising modules; send SIGTERM or SIGINT to stop"
    );

    while !shutdown.load(Ordering::Relaxed) {
        supervisor.reconcile();
        report_crashes(supervisor);
        thread::sleep(POLL_INTERVAL);
    }

    info!(target: HEADLESS_TARGET, "termination signal received");
    Ok(())
}

/// Drains unexpected stops and emits one warning per crashed module, with a
/// tail of its captured output in the same event so the default log filter
/// shows the operator something actionable.
fn report_crashes(supervisor: &Supervisor) {
    for module in supervisor.unexpected_stops() {
        let status = module.status();
        let tail = supervisor
            .read_log(module.name())
            .map(|content| log_tail(&content))
            .unwrap_or_default();
        warn!(
            target: HEADLESS_TARGET,
            module = module.name(),
            exit_code = ?status.last_exit_code,
            log = %tail,
            "module stopped unexpectedly"
        );
    }
}

fn log_tail(content: &str) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let start = lines.len().saturating_sub(CRASH_LOG_LINES);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::{self, Write};
    use std::sync::Mutex;
    use std::time::Instant;

    use tempfile::TempDir;
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::fmt::MakeWriter;
    use vigil_supervisor::{ModuleCatalog, ModuleKind, ModuleSpec, Supervisor, SupervisorOptions};

    use super::*;

    #[derive(Clone, Default)]
    struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

    impl CaptureWriter {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().expect("capture buffer")).into_owned()
        }
    }

    impl Write for CaptureWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().expect("capture buffer").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CaptureWriter {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn tail_keeps_only_the_last_lines() {
        let content: String = (0..30).map(|n| format!("line {n}\n")).collect();
        let tail = log_tail(&content);
        assert!(tail.starts_with("line 10"));
        assert!(tail.ends_with("line 29"));
    }

    #[test]
    fn tail_of_short_output_is_unchanged() {
        assert_eq!(log_tail("only line\n"), "only line");
    }

    #[cfg(unix)]
    #[test]
    fn crash_warning_carries_the_log_tail_at_warn_level() {
        let logs = TempDir::new().expect("log dir");
        let catalog = ModuleCatalog::from_candidates(
            vec![ModuleSpec::new("vigil-true", ModuleKind::Bundled, "/bin/true")],
            Vec::new(),
        );
        let supervisor = Supervisor::new(catalog, SupervisorOptions::new(logs.path()));
        supervisor.start("vigil-true").expect("start");

        // The process exits immediately; wait for the probe to notice.
        let deadline = Instant::now() + Duration::from_secs(5);
        while supervisor.is_alive("vigil-true").expect("is_alive") {
            assert!(Instant::now() < deadline, "process did not exit in time");
            thread::sleep(Duration::from_millis(10));
        }
        fs::write(logs.path().join("vigil-true.out.log"), "fatal: boom\n")
            .expect("seed log output");

        let writer = CaptureWriter::default();
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(EnvFilter::new("warn"))
            .with_writer(writer.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, || report_crashes(&supervisor));

        let captured = writer.contents();
        assert!(captured.contains("module stopped unexpectedly"));
        assert!(captured.contains("vigil-true"));
        assert!(captured.contains("fatal: boom"));
    }
}
