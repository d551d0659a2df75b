//! Start/stop state machine for a single module.
//!
//! Both operations run with the module's runtime lock held for their full
//! duration, which is what serialises concurrent start/stop/reconcile calls
//! on the same module. A stop owns the `Stopping` window end to end, so a
//! concurrent reconciliation can never observe the exit it causes.

use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::SupervisorError;
use crate::logs::LogLayout;
use crate::module::{Module, ModuleState};
use crate::process::{ExitOutcome, ProcessHandle, ProcessLauncher};

/// Tracing target for lifecycle transitions.
const CONTROLLER_TARGET: &str = "vigil_supervisor::controller";

/// Interval between exit probes while waiting out a grace period.
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Starts a module.
///
/// Requires the module to be `Stopped` or `Failed`; a start against a live
/// module is a logged no-op, not an error. On success the module enters
/// `Starting` and is promoted to `Running` by the next liveness observation.
pub(crate) fn start(
    module: &Module,
    launcher: &dyn ProcessLauncher,
    logs: &LogLayout,
    testing: bool,
) -> Result<(), SupervisorError> {
    let mut runtime = module.lock_runtime();
    match runtime.state {
        ModuleState::Starting | ModuleState::Running => {
            debug!(
                target: CONTROLLER_TARGET,
                module = module.name(),
                state = %runtime.state,
                "start requested for live module; ignoring"
            );
            return Ok(());
        }
        ModuleState::Stopping => {
            warn!(
                target: CONTROLLER_TARGET,
                module = module.name(),
                "start requested while a stop is settling; ignoring"
            );
            return Ok(());
        }
        ModuleState::Stopped | ModuleState::Failed => {}
    }

    let (stdout, stderr) = logs.open_pair(module.name(), testing)?;
    let arguments = module.spec().arguments(testing);
    match launcher.launch(module.spec(), &arguments, stdout, stderr) {
        Ok(process) => {
            info!(
                target: CONTROLLER_TARGET,
                module = module.name(),
                pid = process.id(),
                testing,
                "module starting"
            );
            runtime.state = ModuleState::Starting;
            runtime.process = Some(process);
            runtime.started_at = Some(Instant::now());
            Ok(())
        }
        Err(source) => {
            warn!(
                target: CONTROLLER_TARGET,
                module = module.name(),
                program = %module.spec().program().display(),
                error = %source,
                "module failed to spawn"
            );
            runtime.state = ModuleState::Failed;
            runtime.last_exit_code = None;
            runtime.last_exit_expected = false;
            Err(SupervisorError::Spawn {
                name: module.name().to_owned(),
                program: module.spec().program().to_path_buf(),
                source,
            })
        }
    }
}

/// Stops a module, escalating to a forced kill once the grace period runs
/// out.
///
/// Requires the module to be `Starting` or `Running`; anything else is a
/// logged no-op. The exit is recorded as expected unconditionally, even when
/// the process had already died on its own during the wait: the caller's
/// intent to stop is authoritative.
pub(crate) fn stop(module: &Module, grace: Duration) {
    let mut runtime = module.lock_runtime();
    if !matches!(runtime.state, ModuleState::Starting | ModuleState::Running) {
        debug!(
            target: CONTROLLER_TARGET,
            module = module.name(),
            state = %runtime.state,
            "stop requested for module that is not live; ignoring"
        );
        return;
    }
    runtime.state = ModuleState::Stopping;
    let Some(mut process) = runtime.process.take() else {
        // A live state always owns a handle; normalise if that ever breaks.
        runtime.state = ModuleState::Stopped;
        runtime.last_exit_expected = true;
        return;
    };

    info!(
        target: CONTROLLER_TARGET,
        module = module.name(),
        pid = process.id(),
        grace_ms = grace.as_millis() as u64,
        "stopping module"
    );
    if let Err(error) = process.terminate() {
        warn!(
            target: CONTROLLER_TARGET,
            module = module.name(),
            %error,
            "graceful termination request failed"
        );
    }

    let outcome = match wait_within(process.as_mut(), grace) {
        Some(outcome) => Some(outcome),
        None => {
            warn!(
                target: CONTROLLER_TARGET,
                module = module.name(),
                grace_ms = grace.as_millis() as u64,
                "grace period exhausted; force-killing module"
            );
            force_kill(module.name(), process.as_mut())
        }
    };

    runtime.last_exit_code = outcome.and_then(|outcome| outcome.code);
    runtime.last_exit_expected = true;
    runtime.state = ModuleState::Stopped;
    runtime.started_at = None;
    info!(
        target: CONTROLLER_TARGET,
        module = module.name(),
        ?outcome,
        "module stopped"
    );
}

/// Polls for exit until the deadline passes; `None` means still alive.
fn wait_within(process: &mut dyn ProcessHandle, grace: Duration) -> Option<ExitOutcome> {
    let deadline = Instant::now() + grace;
    loop {
        match process.try_wait() {
            Ok(Some(outcome)) => return Some(outcome),
            Ok(None) => {}
            Err(error) => {
                warn!(
                    target: CONTROLLER_TARGET,
                    %error,
                    "exit probe failed while waiting for module"
                );
                return None;
            }
        }
        if Instant::now() >= deadline {
            return None;
        }
        thread::sleep(EXIT_POLL_INTERVAL);
    }
}

fn force_kill(name: &str, process: &mut dyn ProcessHandle) -> Option<ExitOutcome> {
    if let Err(error) = process.kill() {
        warn!(
            target: CONTROLLER_TARGET,
            module = name,
            %error,
            "force kill failed"
        );
    }
    match process.wait() {
        Ok(outcome) => Some(outcome),
        Err(error) => {
            warn!(
                target: CONTROLLER_TARGET,
                module = name,
                %error,
                "failed to reap force-killed module"
            );
            None
        }
    }
}
