//! Module identity and lifecycle state.
//!
//! A [`Module`] is one named, independently manageable background service of
//! the suite. The immutable identity lives in [`ModuleSpec`]; everything that
//! changes at runtime (state, the owned process handle, exit bookkeeping)
//! lives behind a per-module mutex so that operations on the same module are
//! serialised while different modules proceed independently.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, TryLockError};
use std::time::Instant;

use strum::Display;

use crate::process::ProcessHandle;

/// Argument appended to every module command when running in testing mode.
///
/// Modules interpret it themselves: it selects their testing network port and
/// keeps testing data out of the production stores.
pub const TESTING_ARG: &str = "--testing";

/// Where a module executable was resolved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ModuleKind {
    /// Shipped alongside the supervisor's own install.
    Bundled,
    /// Resolved from the host environment's search path.
    System,
}

/// Lifecycle state of a module.
///
/// `Starting` is a distinct, momentary state: it exists so that a liveness
/// probe issued immediately after spawn cannot misread "not yet observed
/// running" as a crash. Promotion to `Running` happens on the first
/// successful liveness observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ModuleState {
    /// No live process; the module has not failed.
    Stopped,
    /// A process was spawned but not yet observed alive.
    Starting,
    /// The process has been observed alive.
    Running,
    /// An explicit stop is in flight.
    Stopping,
    /// The process died without an explicit stop, or spawning failed.
    Failed,
}

impl ModuleState {
    /// Whether a live OS process may exist in this state.
    #[must_use]
    pub fn is_live(self) -> bool {
        matches!(self, Self::Starting | Self::Running | Self::Stopping)
    }
}

/// Immutable identity of a module: its unique name, provenance, and resolved
/// executable path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSpec {
    name: String,
    kind: ModuleKind,
    program: PathBuf,
}

impl ModuleSpec {
    /// Builds a spec from a resolved executable.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ModuleKind, program: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            kind,
            program: program.into(),
        }
    }

    /// Stable unique name; the key used by every supervisor operation.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Provenance of the executable.
    #[must_use]
    pub fn kind(&self) -> ModuleKind {
        self.kind
    }

    /// Resolved executable path.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Argument vector for spawning in the given mode.
    #[must_use]
    pub fn arguments(&self, testing: bool) -> Vec<String> {
        if testing {
            vec![TESTING_ARG.to_owned()]
        } else {
            Vec::new()
        }
    }
}

/// Mutable lifecycle data owned by a module's mutex.
pub(crate) struct ModuleRuntime {
    pub(crate) state: ModuleState,
    pub(crate) process: Option<Box<dyn ProcessHandle>>,
    pub(crate) started_at: Option<Instant>,
    pub(crate) last_exit_code: Option<i32>,
    pub(crate) last_exit_expected: bool,
}

impl ModuleRuntime {
    fn new() -> Self {
        Self {
            state: ModuleState::Stopped,
            process: None,
            started_at: None,
            last_exit_code: None,
            last_exit_expected: false,
        }
    }
}

/// A named, manageable background service process.
///
/// Catalog entries are created once at discovery and only mutated in place
/// afterwards; a module's name never changes or gets reused.
pub struct Module {
    spec: ModuleSpec,
    runtime: Mutex<ModuleRuntime>,
}

impl Module {
    /// Wraps a spec into a catalog entry in the `Stopped` state.
    #[must_use]
    pub fn new(spec: ModuleSpec) -> Self {
        Self {
            spec,
            runtime: Mutex::new(ModuleRuntime::new()),
        }
    }

    /// Module name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.spec.name()
    }

    /// Executable provenance.
    #[must_use]
    pub fn kind(&self) -> ModuleKind {
        self.spec.kind()
    }

    /// Immutable spec.
    #[must_use]
    pub fn spec(&self) -> &ModuleSpec {
        &self.spec
    }

    /// Locks the runtime, recovering from poisoning so a panicked operation
    /// elsewhere cannot wedge the whole module forever.
    pub(crate) fn lock_runtime(&self) -> MutexGuard<'_, ModuleRuntime> {
        self.runtime
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }

    /// Non-blocking lock used by reconciliation: when another operation holds
    /// the module (for example a stop waiting out its grace period), the
    /// caller skips this module rather than stalling or second-guessing the
    /// in-flight transition.
    pub(crate) fn try_lock_runtime(&self) -> Option<MutexGuard<'_, ModuleRuntime>> {
        match self.runtime.try_lock() {
            Ok(guard) => Some(guard),
            Err(TryLockError::Poisoned(poison)) => Some(poison.into_inner()),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    /// Copies out a point-in-time status snapshot.
    #[must_use]
    pub fn status(&self) -> ModuleStatus {
        let runtime = self.lock_runtime();
        ModuleStatus {
            name: self.spec.name().to_owned(),
            kind: self.spec.kind(),
            state: runtime.state,
            pid: runtime.process.as_ref().map(|process| process.id()),
            started_at: runtime.started_at,
            last_exit_code: runtime.last_exit_code,
            last_exit_expected: runtime.last_exit_expected,
        }
    }

    /// Whether the module is currently in the `Failed` state.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.lock_runtime().state == ModuleState::Failed
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.runtime.try_lock() {
            Ok(runtime) => runtime.state.to_string(),
            Err(TryLockError::Poisoned(poison)) => poison.into_inner().state.to_string(),
            Err(TryLockError::WouldBlock) => String::from("busy"),
        };
        formatter
            .debug_struct("Module")
            .field("name", &self.spec.name())
            .field("kind", &self.spec.kind())
            .field("state", &state)
            .finish()
    }
}

/// Point-in-time rendering of a module's lifecycle data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleStatus {
    /// Module name.
    pub name: String,
    /// Executable provenance.
    pub kind: ModuleKind,
    /// Lifecycle state at snapshot time.
    pub state: ModuleState,
    /// OS process id, when a process handle is held.
    pub pid: Option<u32>,
    /// Spawn instant of the current process, when one is live.
    pub started_at: Option<Instant>,
    /// Exit code captured at the most recent reap, if any.
    pub last_exit_code: Option<i32>,
    /// Whether the most recent exit was caused by an explicit stop.
    pub last_exit_expected: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_arguments_follow_testing_mode() {
        let spec = ModuleSpec::new("vigil-server", ModuleKind::Bundled, "/opt/vigil/vigil-server");
        assert!(spec.arguments(false).is_empty());
        assert_eq!(spec.arguments(true), vec![TESTING_ARG.to_owned()]);
    }

    #[test]
    fn new_module_starts_stopped() {
        let module = Module::new(ModuleSpec::new(
            "vigil-server",
            ModuleKind::Bundled,
            "/opt/vigil/vigil-server",
        ));
        let status = module.status();
        assert_eq!(status.state, ModuleState::Stopped);
        assert_eq!(status.pid, None);
        assert!(!status.last_exit_expected);
    }

    #[test]
    fn state_liveness_partition() {
        assert!(ModuleState::Starting.is_live());
        assert!(ModuleState::Running.is_live());
        assert!(ModuleState::Stopping.is_live());
        assert!(!ModuleState::Stopped.is_live());
        assert!(!ModuleState::Failed.is_live());
    }

    #[test]
    fn states_render_lowercase() {
        assert_eq!(ModuleState::Running.to_string(), "running");
        assert_eq!(ModuleKind::Bundled.to_string(), "bundled");
    }
}
