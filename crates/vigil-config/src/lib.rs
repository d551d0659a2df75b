//! Configuration for the vigil supervisor shell.
//!
//! Holds the on-disk settings file (autostart list and stop grace per mode)
//! and the directory conventions shared by the CLI and the supervisor: where
//! the settings file lives and where module logs are written. Production and
//! testing modes read separate sections of the same file so a testing run
//! never disturbs the production autostart list.

pub mod paths;
pub mod settings;

pub use paths::{config_path, log_root};
pub use settings::{ConfigError, ModeSettings, Settings, SettingsFile};
