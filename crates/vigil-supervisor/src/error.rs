//! Error taxonomy for supervisor operations.
//!
//! Only genuinely actionable failures are surfaced as errors. A start issued
//! against a live module is a logged no-op, a grace-period escalation to a
//! forced kill is logged but never raised, and an unexpected module exit is
//! not an error at all: it is a polled condition delivered through
//! [`crate::Supervisor::unexpected_stops`].

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by supervisor operations.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The requested name is absent from the module catalog.
    #[error("no module named '{name}' in the catalog")]
    UnknownModule {
        /// Name that failed to resolve.
        name: String,
    },
    /// Spawning the module executable failed.
    #[error("failed to spawn module '{name}' from '{program}': {source}")]
    Spawn {
        /// Module that failed to start.
        name: String,
        /// Executable the spawn was attempted with.
        program: PathBuf,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// Preparing the module's log file pair failed.
    #[error("failed to open log file '{path}' for module '{name}': {source}")]
    LogSetup {
        /// Module whose logs could not be prepared.
        name: String,
        /// Log file that could not be opened.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Reading a module's log pair back failed.
    #[error("failed to read log file '{path}' for module '{name}': {source}")]
    ReadLog {
        /// Module whose logs could not be read.
        name: String,
        /// Log file that could not be read.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Writing a status rendering to the caller's output failed.
    #[error("failed to write status output: {source}")]
    StatusWrite {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}
