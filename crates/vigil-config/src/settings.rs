//! On-disk supervisor settings.
//!
//! The settings file is TOML with one section per mode: `[supervisor]` for
//! production and `[supervisor-testing]` for testing. A missing file is
//! bootstrapped with defaults on first load so users have something concrete
//! to edit.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::paths;

/// Tracing target for settings loading.
const SETTINGS_TARGET: &str = "vigil_config::settings";

/// Default graceful-stop window before a module is hard-killed.
const DEFAULT_STOP_GRACE_MS: u64 = 3000;

/// Errors raised while loading the settings file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading the settings file failed.
    #[error("failed to read settings file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The settings file is not valid TOML of the expected shape.
    #[error("failed to parse settings file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Settings for one run mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeSettings {
    /// Module names started automatically, in order.
    pub autostart_modules: Vec<String>,
    /// Graceful-stop window in milliseconds.
    pub stop_grace_ms: u64,
}

impl Default for ModeSettings {
    fn default() -> Self {
        Self {
            autostart_modules: vec![
                "vigil-server".to_owned(),
                "vigil-watcher-afk".to_owned(),
                "vigil-watcher-window".to_owned(),
            ],
            stop_grace_ms: DEFAULT_STOP_GRACE_MS,
        }
    }
}

/// Full settings file with both mode sections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsFile {
    /// Production-mode settings.
    pub supervisor: ModeSettings,
    /// Testing-mode settings.
    #[serde(rename = "supervisor-testing")]
    pub testing: ModeSettings,
}

/// Settings resolved for the mode the supervisor is running in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    autostart_modules: Vec<String>,
    stop_grace: Duration,
}

impl Settings {
    /// Loads the settings for the given mode from the default location.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file exists but cannot be read or
    /// parsed.
    pub fn load(testing: bool) -> Result<Self, ConfigError> {
        Self::load_from(&paths::config_path(), testing)
    }

    /// Loads the settings for the given mode from an explicit path.
    ///
    /// A missing file yields defaults and is written back so users can edit
    /// it; a write failure during that bootstrap only logs a warning.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file exists but cannot be read or
    /// parsed.
    pub fn load_from(path: &Path, testing: bool) -> Result<Self, ConfigError> {
        let file = if path.exists() {
            let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            toml::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            let defaults = SettingsFile::default();
            write_bootstrap(path, &defaults);
            defaults
        };
        let mode = if testing { file.testing } else { file.supervisor };
        Ok(Self {
            autostart_modules: mode.autostart_modules,
            stop_grace: Duration::from_millis(mode.stop_grace_ms),
        })
    }

    /// Module names to start automatically, in order.
    #[must_use]
    pub fn autostart_modules(&self) -> &[String] {
        &self.autostart_modules
    }

    /// Graceful-stop window before escalation.
    #[must_use]
    pub fn stop_grace(&self) -> Duration {
        self.stop_grace
    }
}

fn write_bootstrap(path: &Path, defaults: &SettingsFile) {
    let Ok(rendered) = toml::to_string_pretty(defaults) else {
        return;
    };
    let result = match path.parent() {
        Some(parent) => fs::create_dir_all(parent).and_then(|()| fs::write(path, rendered)),
        None => fs::write(path, rendered),
    };
    if let Err(error) = result {
        warn!(
            target: SETTINGS_TARGET,
            path = %path.display(),
            %error,
            "could not write default settings file"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    fn settings_path(dir: &TempDir) -> PathBuf {
        dir.path().join("supervisor.toml")
    }

    #[test]
    fn missing_file_yields_defaults_and_bootstraps() {
        let dir = TempDir::new().expect("temp dir");
        let path = settings_path(&dir);
        let settings = Settings::load_from(&path, false).expect("load");
        assert_eq!(
            settings.autostart_modules(),
            ["vigil-server", "vigil-watcher-afk", "vigil-watcher-window"]
        );
        assert_eq!(settings.stop_grace(), Duration::from_millis(3000));
        assert!(path.exists(), "defaults written back");
    }

    #[test]
    fn bootstrapped_file_round_trips() {
        let dir = TempDir::new().expect("temp dir");
        let path = settings_path(&dir);
        let first = Settings::load_from(&path, false).expect("bootstrap");
        let second = Settings::load_from(&path, false).expect("reload");
        assert_eq!(first, second);
    }

    #[rstest]
    #[case::production(false, &["vigil-server"])]
    #[case::testing(true, &["vigil-server", "vigil-watcher-window"])]
    fn modes_read_their_own_section(#[case] testing: bool, #[case] expected: &[&str]) {
        let dir = TempDir::new().expect("temp dir");
        let path = settings_path(&dir);
        fs::write(
            &path,
            r#"
[supervisor]
autostart_modules = ["vigil-server"]

[supervisor-testing]
autostart_modules = ["vigil-server", "vigil-watcher-window"]
stop_grace_ms = 500
"#,
        )
        .expect("seed file");

        let settings = Settings::load_from(&path, testing).expect("load");
        assert_eq!(settings.autostart_modules(), expected);
    }

    #[test]
    fn stop_grace_converts_from_milliseconds() {
        let dir = TempDir::new().expect("temp dir");
        let path = settings_path(&dir);
        fs::write(
            &path,
            "[supervisor]\nstop_grace_ms = 1500\n",
        )
        .expect("seed file");
        let settings = Settings::load_from(&path, false).expect("load");
        assert_eq!(settings.stop_grace(), Duration::from_millis(1500));
    }

    #[test]
    fn omitted_section_falls_back_to_defaults() {
        let dir = TempDir::new().expect("temp dir");
        let path = settings_path(&dir);
        fs::write(&path, "[supervisor]\nautostart_modules = []\n").expect("seed file");
        let settings = Settings::load_from(&path, true).expect("load");
        let defaults = ModeSettings::default();
        assert_eq!(settings.autostart_modules(), defaults.autostart_modules);
        assert_eq!(
            settings.stop_grace(),
            Duration::from_millis(defaults.stop_grace_ms)
        );
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = TempDir::new().expect("temp dir");
        let path = settings_path(&dir);
        fs::write(&path, "[supervisor\nnot toml").expect("seed file");
        let error = Settings::load_from(&path, false).expect_err("parse failure");
        assert!(matches!(error, ConfigError::Parse { .. }));
    }
}
