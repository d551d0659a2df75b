//! The supervisor facade.
//!
//! [`Supervisor`] is the composition root handed to the hosting shell. It
//! owns the module catalog outright (there is no process-wide singleton) and
//! wires the registry's output to the controller and monitor. The hosting
//! shell drives it: operations are issued by name, and a periodic
//! caller-driven [`Supervisor::reconcile`] plus
//! [`Supervisor::unexpected_stops`] drain keeps cached state honest.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::autostart;
use crate::catalog::ModuleCatalog;
use crate::controller;
use crate::error::SupervisorError;
use crate::logs::LogLayout;
use crate::module::{Module, ModuleStatus};
use crate::monitor::{self, StopReports};
use crate::process::{ProcessLauncher, SystemLauncher};

/// Tracing target for facade operations.
const SUPERVISOR_TARGET: &str = "vigil_supervisor::supervisor";

/// Default grace period between a stop request and a forced kill.
pub const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(3);

/// Construction inputs consumed from the configuration collaborator.
#[derive(Debug, Clone)]
pub struct SupervisorOptions {
    /// Run modules in testing mode (testing ports, `-testing` log suffix).
    pub testing: bool,
    /// Grace period granted to each module on stop.
    pub grace: Duration,
    /// Directory the per-module log pairs live under.
    pub log_root: PathBuf,
}

impl SupervisorOptions {
    /// Builds options with the default grace period, in production mode.
    #[must_use]
    pub fn new(log_root: impl Into<PathBuf>) -> Self {
        Self {
            testing: false,
            grace: DEFAULT_STOP_GRACE,
            log_root: log_root.into(),
        }
    }

    /// Selects testing mode.
    #[must_use]
    pub fn testing(mut self, testing: bool) -> Self {
        self.testing = testing;
        self
    }

    /// Overrides the stop grace period.
    #[must_use]
    pub fn grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }
}

/// Owner of the module catalog and entry point for every lifecycle
/// operation.
pub struct Supervisor {
    catalog: ModuleCatalog,
    launcher: Box<dyn ProcessLauncher>,
    logs: LogLayout,
    testing: bool,
    grace: Duration,
    reports: StopReports,
}

impl Supervisor {
    /// Builds a supervisor spawning real OS processes.
    #[must_use]
    pub fn new(catalog: ModuleCatalog, options: SupervisorOptions) -> Self {
        Self::with_launcher(catalog, options, Box::new(SystemLauncher::new()))
    }

    /// Builds a supervisor with an injected launcher.
    ///
    /// This is the seam used by tests to drive the lifecycle state machine
    /// without touching the operating system.
    #[must_use]
    pub fn with_launcher(
        catalog: ModuleCatalog,
        options: SupervisorOptions,
        launcher: Box<dyn ProcessLauncher>,
    ) -> Self {
        Self {
            catalog,
            launcher,
            logs: LogLayout::new(options.log_root),
            testing: options.testing,
            grace: options.grace,
            reports: StopReports::new(),
        }
    }

    fn resolve(&self, name: &str) -> Result<&Arc<Module>, SupervisorError> {
        self.catalog
            .get(name)
            .ok_or_else(|| SupervisorError::UnknownModule {
                name: name.to_owned(),
            })
    }

    /// Starts the named module.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::UnknownModule`] for a name absent from the
    /// catalog, [`SupervisorError::LogSetup`] when its log pair could not be
    /// prepared, and [`SupervisorError::Spawn`] when exec failed. A start
    /// against a live module is a no-op, not an error.
    pub fn start(&self, name: &str) -> Result<(), SupervisorError> {
        let module = self.resolve(name)?;
        controller::start(module, self.launcher.as_ref(), &self.logs, self.testing)
    }

    /// Stops the named module, force-killing after the grace period.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::UnknownModule`] for a name absent from the
    /// catalog. A stop against a module that is not live is a no-op.
    pub fn stop(&self, name: &str) -> Result<(), SupervisorError> {
        let module = self.resolve(name)?;
        controller::stop(module, self.grace);
        Ok(())
    }

    /// Stops the named module when it is alive, starts it otherwise.
    ///
    /// # Errors
    ///
    /// Propagates the errors of [`Supervisor::start`] and
    /// [`Supervisor::stop`].
    pub fn toggle(&self, name: &str) -> Result<(), SupervisorError> {
        let module = self.resolve(name)?;
        if self.probe(module) {
            controller::stop(module, self.grace);
            Ok(())
        } else {
            controller::start(module, self.launcher.as_ref(), &self.logs, self.testing)
        }
    }

    /// Authoritative liveness check against the real OS process.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::UnknownModule`] for a name absent from the
    /// catalog.
    pub fn is_alive(&self, name: &str) -> Result<bool, SupervisorError> {
        let module = self.resolve(name)?;
        Ok(self.probe(module))
    }

    fn probe(&self, module: &Module) -> bool {
        let mut runtime = module.lock_runtime();
        monitor::refresh(module, &mut runtime, &self.reports)
    }

    /// Launches the configured autostart list in order.
    ///
    /// A `none` entry anywhere disables the run; an unknown name or a spawn
    /// failure for one entry is logged and does not halt the sequence.
    pub fn autostart(&self, names: &[String]) {
        let planned = autostart::plan(names);
        if planned.is_empty() {
            info!(target: SUPERVISOR_TARGET, "autostart disabled or empty");
            return;
        }
        info!(
            target: SUPERVISOR_TARGET,
            modules = ?planned,
            "autostarting modules"
        );
        for name in &planned {
            if let Err(error) = self.start(name) {
                warn!(
                    target: SUPERVISOR_TARGET,
                    module = %name,
                    %error,
                    "autostart entry failed; continuing with the rest"
                );
            }
        }
    }

    /// Reconciles every module's cached state against real process liveness.
    pub fn reconcile(&self) {
        monitor::reconcile(&self.catalog, &self.reports);
    }

    /// Returns and clears the modules that stopped unexpectedly since the
    /// previous drain.
    #[must_use]
    pub fn unexpected_stops(&self) -> Vec<Arc<Module>> {
        self.reports
            .drain()
            .iter()
            .filter_map(|name| self.catalog.get(name).cloned())
            .collect()
    }

    /// Stops every live module, best effort.
    ///
    /// Completion is bounded by the per-module grace period times the number
    /// of live modules; individual failures are logged, never raised.
    pub fn stop_all(&self) {
        info!(target: SUPERVISOR_TARGET, "stopping all modules");
        for module in self.catalog.iter() {
            controller::stop(module, self.grace);
        }
    }

    /// Renders the current status of one module, or of the whole catalog.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::UnknownModule`] for an unknown name and
    /// [`SupervisorError::StatusWrite`] when the output sink fails.
    pub fn print_status(
        &self,
        out: &mut dyn Write,
        name: Option<&str>,
    ) -> Result<(), SupervisorError> {
        match name {
            Some(name) => {
                let module = self.resolve(name)?;
                write_header(out)?;
                write_status_line(out, &module.status())
            }
            None => {
                write_header(out)?;
                for module in self.catalog.iter() {
                    write_status_line(out, &module.status())?;
                }
                Ok(())
            }
        }
    }

    /// Reads back the named module's log pair for the current mode.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::UnknownModule`] for an unknown name and
    /// [`SupervisorError::ReadLog`] when an existing log file could not be
    /// read.
    pub fn read_log(&self, name: &str) -> Result<String, SupervisorError> {
        let module = self.resolve(name)?;
        self.logs.read(module.name(), self.testing)
    }

    /// Read-only view of the bundled partition.
    #[must_use]
    pub fn modules_bundled(&self) -> &[Arc<Module>] {
        self.catalog.bundled()
    }

    /// Read-only view of the system partition.
    #[must_use]
    pub fn modules_system(&self) -> &[Arc<Module>] {
        self.catalog.system()
    }

    /// Iterates the addressable modules in name order.
    pub fn modules(&self) -> impl Iterator<Item = &Arc<Module>> {
        self.catalog.iter()
    }

    /// Whether the supervisor runs its modules in testing mode.
    #[must_use]
    pub fn testing(&self) -> bool {
        self.testing
    }
}

fn write_header(out: &mut dyn Write) -> Result<(), SupervisorError> {
    write_line(
        out,
        format_args!(
            "{:<28} {:<8} {:<9} {:>7} {:>8}  {}",
            "MODULE", "KIND", "STATE", "PID", "UPTIME", "LAST EXIT"
        ),
    )
}

fn write_status_line(out: &mut dyn Write, status: &ModuleStatus) -> Result<(), SupervisorError> {
    let pid = status
        .pid
        .map_or_else(|| String::from("-"), |pid| pid.to_string());
    let uptime = status.started_at.map_or_else(
        || String::from("-"),
        |started| format!("{}s", started.elapsed().as_secs()),
    );
    let last_exit = match status.last_exit_code {
        Some(code) if status.last_exit_expected => format!("code {code} (expected)"),
        Some(code) => format!("code {code} (unexpected)"),
        None => String::from("-"),
    };
    write_line(
        out,
        format_args!(
            "{:<28} {:<8} {:<9} {:>7} {:>8}  {}",
            status.name, status.kind, status.state, pid, uptime, last_exit
        ),
    )
}

fn write_line(out: &mut dyn Write, line: std::fmt::Arguments<'_>) -> Result<(), SupervisorError> {
    writeln!(out, "{line}").map_err(|source| SupervisorError::StatusWrite { source })
}
