//! Process supervision core for the vigil data-collection suite.
//!
//! The supervisor discovers the suite's service executables ("modules"),
//! spawns and terminates them on request, polls their liveness, and surfaces
//! unexpected exits to whichever shell is hosting it (a tray icon or an
//! interactive command session). It deliberately knows nothing about what a
//! module does; it only manages process identity, lifecycle, and log files.
//!
//! The composition root is [`Supervisor`]. A hosting shell constructs it from
//! a discovered [`ModuleCatalog`], optionally runs [`Supervisor::autostart`],
//! and then drives [`Supervisor::reconcile`] from its own event loop while
//! issuing start/stop/toggle commands against individual modules. There is no
//! background scheduler in this crate: poll cadence belongs to the caller,
//! and correctness does not depend on it.

pub mod autostart;
pub mod catalog;
mod controller;
pub mod error;
pub mod logs;
mod monitor;
pub mod module;
pub mod process;
pub mod registry;
mod supervisor;

pub use catalog::ModuleCatalog;
pub use error::SupervisorError;
pub use logs::LogLayout;
pub use module::{Module, ModuleKind, ModuleSpec, ModuleState, ModuleStatus};
pub use process::{ExitOutcome, ProcessHandle, ProcessLauncher, SystemLauncher};
pub use registry::ModuleRegistry;
pub use supervisor::{DEFAULT_STOP_GRACE, Supervisor, SupervisorOptions};
