//! Directory conventions shared by the CLI and supervisor.
//!
//! Everything lives under a `vigil` subdirectory of the platform's standard
//! locations, with a temp-dir fallback for stripped-down environments that
//! expose neither a config nor a state directory.

use std::env;
use std::path::PathBuf;

/// Directory holding the settings file.
fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(env::temp_dir)
        .join("vigil")
}

/// Path of the supervisor settings file.
#[must_use]
pub fn config_path() -> PathBuf {
    config_dir().join("supervisor.toml")
}

/// Root directory for module log files.
///
/// Testing-mode logs share the directory; the per-module file names carry a
/// mode suffix instead.
#[must_use]
pub fn log_root() -> PathBuf {
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .unwrap_or_else(env::temp_dir)
        .join("vigil")
        .join("logs")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_ends_with_settings_file() {
        let path = config_path();
        assert!(path.ends_with("vigil/supervisor.toml"));
    }

    #[test]
    fn log_root_ends_with_logs_directory() {
        assert!(log_root().ends_with("vigil/logs"));
    }
}
