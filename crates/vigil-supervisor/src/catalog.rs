//! The catalog of manageable modules.
//!
//! Built once at discovery time and owned by the supervisor facade; entries
//! are never removed at runtime, only mutated in place. The catalog keeps a
//! primary name map used by every operation plus read-only bundled/system
//! partitions for presentation collaborators.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::module::{Module, ModuleKind, ModuleSpec};

/// Tracing target for catalog construction.
const CATALOG_TARGET: &str = "vigil_supervisor::catalog";

/// Mapping from module name to module, partitioned by provenance.
///
/// When both a bundled and a system executable exist for the same name, the
/// bundled one is the addressable entry for that name; the system candidate
/// is retained in the system partition only and never shadows the bundled
/// entry under the same key.
#[derive(Debug, Default)]
pub struct ModuleCatalog {
    primary: BTreeMap<String, Arc<Module>>,
    bundled: Vec<Arc<Module>>,
    system: Vec<Arc<Module>>,
}

impl ModuleCatalog {
    /// Builds the catalog from discovered candidates.
    ///
    /// Duplicates inside one partition keep the first occurrence; later
    /// candidates for the same name are dropped with a diagnostic.
    #[must_use]
    pub fn from_candidates(bundled: Vec<ModuleSpec>, system: Vec<ModuleSpec>) -> Self {
        let mut catalog = Self::default();
        for spec in bundled {
            catalog.insert(spec, ModuleKind::Bundled);
        }
        for spec in system {
            catalog.insert(spec, ModuleKind::System);
        }
        catalog
    }

    fn insert(&mut self, spec: ModuleSpec, partition: ModuleKind) {
        let duplicate_in_partition = match partition {
            ModuleKind::Bundled => self.bundled.iter().any(|m| m.name() == spec.name()),
            ModuleKind::System => self.system.iter().any(|m| m.name() == spec.name()),
        };
        if duplicate_in_partition {
            debug!(
                target: CATALOG_TARGET,
                module = spec.name(),
                %partition,
                "dropping duplicate candidate in partition"
            );
            return;
        }

        let module = Arc::new(Module::new(spec));
        match partition {
            ModuleKind::Bundled => self.bundled.push(Arc::clone(&module)),
            ModuleKind::System => self.system.push(Arc::clone(&module)),
        }

        if let Some(existing) = self.primary.get(module.name()) {
            // Bundled candidates are inserted first, so a conflict here means
            // a system candidate arrived for a name the bundled partition
            // already claims. The system copy stays visible in its partition
            // but is not addressable by name.
            debug!(
                target: CATALOG_TARGET,
                module = module.name(),
                primary = %existing.kind(),
                shadowed = %module.kind(),
                "bundled entry shadows system candidate"
            );
            return;
        }
        self.primary.insert(module.name().to_owned(), module);
    }

    /// Resolves a module by name against the primary map.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<Module>> {
        self.primary.get(name)
    }

    /// Read-only view of the bundled partition.
    #[must_use]
    pub fn bundled(&self) -> &[Arc<Module>] {
        &self.bundled
    }

    /// Read-only view of the system partition, shadowed candidates included.
    #[must_use]
    pub fn system(&self) -> &[Arc<Module>] {
        &self.system
    }

    /// Iterates the addressable modules in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Module>> {
        self.primary.values()
    }

    /// Number of addressable modules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.primary.len()
    }

    /// Whether the catalog holds no addressable modules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.primary.is_empty()
    }
}
