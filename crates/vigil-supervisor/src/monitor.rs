//! Liveness reconciliation and unexpected-exit reporting.
//!
//! The cached module state can go stale between polls (a process can die at
//! any time), so liveness checks always go to the real process handle. An
//! exit observed here, with no explicit stop holding the module, is an
//! unexpected stop: the module moves to `Failed` and its name is queued for
//! the next [`StopReports::drain`].

use std::collections::BTreeSet;
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::catalog::ModuleCatalog;
use crate::module::{Module, ModuleRuntime, ModuleState};

/// Tracing target for reconciliation.
const MONITOR_TARGET: &str = "vigil_supervisor::monitor";

/// Pending unexpected-stop set with at-most-once drain semantics.
pub(crate) struct StopReports {
    pending: Mutex<BTreeSet<String>>,
}

impl StopReports {
    pub(crate) fn new() -> Self {
        Self {
            pending: Mutex::new(BTreeSet::new()),
        }
    }

    fn record(&self, name: &str) {
        let mut pending = self
            .pending
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());
        pending.insert(name.to_owned());
    }

    /// Returns and clears the pending set; a second drain with no new crash
    /// in between comes back empty.
    pub(crate) fn drain(&self) -> Vec<String> {
        let mut pending = self
            .pending
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());
        std::mem::take(&mut *pending).into_iter().collect()
    }
}

/// Re-checks liveness for every addressable module.
///
/// A module whose lock is held by an in-flight operation is skipped: the
/// explicit operation wins over crash detection for the same exit event, and
/// the next reconcile pass observes whatever state that operation left
/// behind.
pub(crate) fn reconcile(catalog: &ModuleCatalog, reports: &StopReports) {
    for module in catalog.iter() {
        let Some(mut runtime) = module.try_lock_runtime() else {
            debug!(
                target: MONITOR_TARGET,
                module = module.name(),
                "module busy; deferring reconciliation"
            );
            continue;
        };
        refresh(module, &mut runtime, reports);
    }
}

/// Reconciles one locked module against real process state and returns
/// whether it is alive.
///
/// A `Starting` module observed alive is promoted to `Running`; one observed
/// dead is classified as an unexpected stop just like a `Running` module.
pub(crate) fn refresh(
    module: &Module,
    runtime: &mut ModuleRuntime,
    reports: &StopReports,
) -> bool {
    match runtime.state {
        ModuleState::Stopped | ModuleState::Failed => false,
        ModuleState::Stopping => runtime.process.is_some(),
        ModuleState::Starting | ModuleState::Running => {
            let was_starting = runtime.state == ModuleState::Starting;
            let Some(process) = runtime.process.as_mut() else {
                warn!(
                    target: MONITOR_TARGET,
                    module = module.name(),
                    state = %runtime.state,
                    "live state without a process handle; marking failed"
                );
                runtime.state = ModuleState::Failed;
                runtime.last_exit_expected = false;
                reports.record(module.name());
                return false;
            };
            match process.try_wait() {
                Ok(None) => {
                    if was_starting {
                        debug!(
                            target: MONITOR_TARGET,
                            module = module.name(),
                            "module confirmed running"
                        );
                        runtime.state = ModuleState::Running;
                    }
                    true
                }
                Ok(Some(outcome)) => {
                    warn!(
                        target: MONITOR_TARGET,
                        module = module.name(),
                        %outcome,
                        "module exited unexpectedly"
                    );
                    runtime.state = ModuleState::Failed;
                    runtime.last_exit_code = outcome.code;
                    runtime.last_exit_expected = false;
                    runtime.process = None;
                    runtime.started_at = None;
                    reports.record(module.name());
                    false
                }
                Err(error) => {
                    warn!(
                        target: MONITOR_TARGET,
                        module = module.name(),
                        %error,
                        "liveness probe failed; assuming alive"
                    );
                    true
                }
            }
        }
    }
}
