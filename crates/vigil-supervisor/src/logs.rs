//! Per-module log file layout.
//!
//! Every `(module name, testing-mode)` pair owns one stdout/stderr log file
//! pair under the supervisor's log root. Files are opened in append mode and
//! their paths never change across supervisor restarts, so testing and
//! production runs of the same module never interleave in one log and
//! history is never auto-truncated.

use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::SupervisorError;

/// File name suffix separating testing logs from production logs.
const TESTING_SUFFIX: &str = "-testing";

/// Layout of module log files under a fixed root directory.
#[derive(Debug, Clone)]
pub struct LogLayout {
    root: PathBuf,
}

impl LogLayout {
    /// Builds a layout rooted at the given directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory all module logs live under.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the module's stdout log.
    #[must_use]
    pub fn stdout_path(&self, name: &str, testing: bool) -> PathBuf {
        self.root.join(format!("{}{}.out.log", name, suffix(testing)))
    }

    /// Path of the module's stderr log.
    #[must_use]
    pub fn stderr_path(&self, name: &str, testing: bool) -> PathBuf {
        self.root.join(format!("{}{}.err.log", name, suffix(testing)))
    }

    /// Opens the module's log pair for appending, creating the root directory
    /// and the files as needed.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::LogSetup`] when the directory or either
    /// file could not be prepared.
    pub fn open_pair(&self, name: &str, testing: bool) -> Result<(File, File), SupervisorError> {
        fs::create_dir_all(&self.root).map_err(|source| SupervisorError::LogSetup {
            name: name.to_owned(),
            path: self.root.clone(),
            source,
        })?;
        let stdout = open_append(&self.stdout_path(name, testing), name)?;
        let stderr = open_append(&self.stderr_path(name, testing), name)?;
        Ok((stdout, stderr))
    }

    /// Reads back the module's log pair for diagnostic display.
    ///
    /// Missing files read as empty: a module that never started simply has
    /// no log yet.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::ReadLog`] when an existing file could not
    /// be read.
    pub fn read(&self, name: &str, testing: bool) -> Result<String, SupervisorError> {
        let stdout = read_optional(&self.stdout_path(name, testing), name)?;
        let stderr = read_optional(&self.stderr_path(name, testing), name)?;
        Ok(format!("--- stdout ---\n{stdout}--- stderr ---\n{stderr}"))
    }
}

fn suffix(testing: bool) -> &'static str {
    if testing { TESTING_SUFFIX } else { "" }
}

fn open_append(path: &Path, name: &str) -> Result<File, SupervisorError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| SupervisorError::LogSetup {
            name: name.to_owned(),
            path: path.to_path_buf(),
            source,
        })
}

fn read_optional(path: &Path, name: &str) -> Result<String, SupervisorError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(error) if error.kind() == ErrorKind::NotFound => Ok(String::new()),
        Err(source) => Err(SupervisorError::ReadLog {
            name: name.to_owned(),
            path: path.to_path_buf(),
            source,
        }),
    }
}
