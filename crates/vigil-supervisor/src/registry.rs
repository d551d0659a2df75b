//! Discovery of installed module executables.
//!
//! The registry scans the bundled locations (the supervisor's own executable
//! directory and its `modules/` subdirectory) plus the system search path for
//! executables carrying the suite's module prefix, and builds the
//! [`ModuleCatalog`] from what it finds. A location that cannot be read
//! contributes nothing; a single unreadable entry is skipped. Discovery never
//! fails outright.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::catalog::ModuleCatalog;
use crate::module::{ModuleKind, ModuleSpec};

/// Tracing target for discovery.
const REGISTRY_TARGET: &str = "vigil_supervisor::registry";

/// File name prefix that marks an executable as a suite module.
pub const MODULE_PREFIX: &str = "vigil-";

/// Suite executables that are never modules: the supervisor itself and its
/// command-line shell.
const EXCLUDED_NAMES: &[&str] = &["vigil-supervisor", "vigil-cli"];

/// Scans well-known locations for module executables.
#[derive(Debug, Clone)]
pub struct ModuleRegistry {
    bundled_dirs: Vec<PathBuf>,
    search_path: Option<OsString>,
}

impl ModuleRegistry {
    /// Builds a registry over explicit locations.
    #[must_use]
    pub fn new(bundled_dirs: Vec<PathBuf>, search_path: Option<OsString>) -> Self {
        Self {
            bundled_dirs,
            search_path,
        }
    }

    /// Builds a registry over the process's own install location and `PATH`.
    #[must_use]
    pub fn from_environment() -> Self {
        let mut bundled_dirs = Vec::new();
        match env::current_exe() {
            Ok(exe) => {
                if let Some(dir) = exe.parent() {
                    bundled_dirs.push(dir.to_path_buf());
                    bundled_dirs.push(dir.join("modules"));
                }
            }
            Err(error) => {
                warn!(
                    target: REGISTRY_TARGET,
                    %error,
                    "could not locate own executable; skipping bundled discovery"
                );
            }
        }
        Self::new(bundled_dirs, env::var_os("PATH"))
    }

    /// Discovers installed modules and builds the catalog.
    #[must_use]
    pub fn discover(&self) -> ModuleCatalog {
        let mut bundled = Vec::new();
        for dir in &self.bundled_dirs {
            scan_directory(dir, ModuleKind::Bundled, &mut bundled);
        }

        let mut system = Vec::new();
        if let Some(path) = &self.search_path {
            for dir in env::split_paths(path) {
                scan_directory(&dir, ModuleKind::System, &mut system);
            }
        }

        info!(
            target: REGISTRY_TARGET,
            bundled = bundled.len(),
            system = system.len(),
            "module discovery finished"
        );
        ModuleCatalog::from_candidates(bundled, system)
    }
}

fn scan_directory(dir: &Path, kind: ModuleKind, found: &mut Vec<ModuleSpec>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(error) => {
            debug!(
                target: REGISTRY_TARGET,
                directory = %dir.display(),
                %error,
                "skipping unreadable discovery location"
            );
            return;
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                debug!(
                    target: REGISTRY_TARGET,
                    directory = %dir.display(),
                    %error,
                    "skipping unreadable directory entry"
                );
                continue;
            }
        };
        let path = entry.path();
        let Some(name) = module_name(&path) else {
            continue;
        };
        if !is_executable_file(&path) {
            continue;
        }
        debug!(
            target: REGISTRY_TARGET,
            module = %name,
            %kind,
            path = %path.display(),
            "found module candidate"
        );
        found.push(ModuleSpec::new(name, kind, path));
    }
}

/// Extracts the module name from a candidate path, or `None` when the file is
/// not a suite module.
fn module_name(path: &Path) -> Option<String> {
    let file_name = path.file_name()?.to_str()?;
    let name = file_name.strip_suffix(".exe").unwrap_or(file_name);
    if !name.starts_with(MODULE_PREFIX) {
        return None;
    }
    if EXCLUDED_NAMES.contains(&name) {
        return None;
    }
    Some(name.to_owned())
}

#[cfg(unix)]
fn is_executable_file(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    fs::metadata(path)
        .map(|metadata| metadata.is_file() && metadata.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable_file(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| extension.eq_ignore_ascii_case("exe"))
        && fs::metadata(path).map(|metadata| metadata.is_file()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use std::fs::File;

    use rstest::rstest;
    use tempfile::TempDir;

    use super::*;

    #[cfg(unix)]
    fn place_executable(dir: &Path, name: &str) {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        File::create(&path).expect("create file");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");
    }

    #[cfg(unix)]
    fn place_plain_file(dir: &Path, name: &str) {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        File::create(&path).expect("create file");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).expect("chmod");
    }

    #[cfg(unix)]
    #[test]
    fn discovers_bundled_and_system_modules() {
        let bundled = TempDir::new().expect("bundled dir");
        let system = TempDir::new().expect("system dir");
        place_executable(bundled.path(), "vigil-server");
        place_executable(bundled.path(), "vigil-watcher-window");
        place_executable(system.path(), "vigil-server");
        place_executable(system.path(), "vigil-watcher-afk");

        let registry = ModuleRegistry::new(
            vec![bundled.path().to_path_buf()],
            Some(system.path().as_os_str().to_owned()),
        );
        let catalog = registry.discover();

        assert_eq!(catalog.bundled().len(), 2);
        assert_eq!(catalog.system().len(), 2);
        // 3 distinct names; vigil-server resolves to the bundled copy.
        assert_eq!(catalog.len(), 3);
        let server = catalog.get("vigil-server").expect("server entry");
        assert_eq!(server.kind(), ModuleKind::Bundled);
    }

    #[cfg(unix)]
    #[test]
    fn skips_non_modules_and_non_executables() {
        let bundled = TempDir::new().expect("bundled dir");
        place_executable(bundled.path(), "vigil-server");
        place_executable(bundled.path(), "some-other-tool");
        place_executable(bundled.path(), "vigil-cli");
        place_plain_file(bundled.path(), "vigil-watcher-window");

        let registry = ModuleRegistry::new(vec![bundled.path().to_path_buf()], None);
        let catalog = registry.discover();

        assert_eq!(catalog.len(), 1);
        assert!(catalog.get("vigil-server").is_some());
        assert!(catalog.get("some-other-tool").is_none());
        assert!(catalog.get("vigil-cli").is_none());
        assert!(catalog.get("vigil-watcher-window").is_none());
    }

    #[test]
    fn missing_location_contributes_nothing() {
        let registry = ModuleRegistry::new(
            vec![PathBuf::from("/nonexistent/vigil-modules")],
            Some(OsString::from("/also/nonexistent")),
        );
        let catalog = registry.discover();
        assert!(catalog.is_empty());
    }

    #[rstest]
    #[case::plain("vigil-server", Some("vigil-server"))]
    #[case::windows_exe("vigil-server.exe", Some("vigil-server"))]
    #[case::wrong_prefix("other-server", None)]
    #[case::own_shell("vigil-cli", None)]
    fn module_name_matching(#[case] file_name: &str, #[case] expected: Option<&str>) {
        let path = PathBuf::from("/opt/vigil").join(file_name);
        assert_eq!(module_name(&path).as_deref(), expected);
    }
}
