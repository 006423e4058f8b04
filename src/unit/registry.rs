// src/unit/registry.rs

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak};

use tracing::debug;

use crate::errors::{Result, UnitdagError};
use crate::pipeline::Pipeline;
use crate::unit::descriptors::TaskDescriptorSet;
use crate::watch::patterns::normalize;

/// Everything needed to register a unit.
#[derive(Debug, Clone)]
pub struct UnitDecl {
    pub name: String,
    pub root: PathBuf,
    /// Output root; absolute, or relative to `root`.
    pub output: PathBuf,
    /// Cache input globs relative to `root` (empty = everything).
    pub inputs: Vec<String>,
    /// Extra watch globs relative to `root`.
    pub watch_includes: Vec<String>,
    pub deps: Vec<Arc<Unit>>,
    pub descriptors: TaskDescriptorSet,
}

impl UnitDecl {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            output: PathBuf::from("dist"),
            inputs: Vec::new(),
            watch_includes: Vec::new(),
            deps: Vec::new(),
            descriptors: TaskDescriptorSet::default(),
        }
    }

    pub fn with_dep(mut self, dep: &Arc<Unit>) -> Self {
        self.deps.push(Arc::clone(dep));
        self
    }

    pub fn with_descriptors(mut self, descriptors: TaskDescriptorSet) -> Self {
        self.descriptors = descriptors;
        self
    }
}

/// A named, independently buildable folder.
///
/// Units only hold weak references to their dependencies; the registry owns
/// every unit for the lifetime of the run.
pub struct Unit {
    name: String,
    root: PathBuf,
    output: PathBuf,
    inputs: Vec<String>,
    watch_includes: Vec<String>,
    deps: Vec<Weak<Unit>>,
    descriptors: TaskDescriptorSet,
    pipeline: OnceLock<Arc<Pipeline>>,
    watcher_active: AtomicBool,
}

impl fmt::Debug for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unit")
            .field("name", &self.name)
            .field("root", &self.root)
            .field("deps", &self.dependency_names())
            .finish_non_exhaustive()
    }
}

impl Unit {
    /// Root and output are stored lexically normalized so watch events,
    /// glob patterns and cache keys all agree on one spelling of a path.
    fn from_decl(decl: UnitDecl) -> Self {
        let root = normalize(&decl.root);
        let output = normalize(&root.join(decl.output));

        Self {
            name: decl.name,
            root,
            output,
            inputs: decl.inputs,
            watch_includes: decl.watch_includes,
            deps: decl.deps.iter().map(Arc::downgrade).collect(),
            descriptors: decl.descriptors,
            pipeline: OnceLock::new(),
            watcher_active: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory build artifacts are written to.
    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    pub fn watch_includes(&self) -> &[String] {
        &self.watch_includes
    }

    pub fn descriptors(&self) -> &TaskDescriptorSet {
        &self.descriptors
    }

    /// Direct dependencies that are still alive, in declaration order.
    pub fn dependencies(&self) -> Vec<Arc<Unit>> {
        self.deps.iter().filter_map(Weak::upgrade).collect()
    }

    pub fn dependency_names(&self) -> Vec<String> {
        self.dependencies()
            .iter()
            .map(|d| d.name.clone())
            .collect()
    }

    pub(crate) fn declared_dependencies(&self) -> &[Weak<Unit>] {
        &self.deps
    }

    /// Memo slot for the composed pipeline (written at most once).
    pub(crate) fn pipeline_slot(&self) -> &OnceLock<Arc<Pipeline>> {
        &self.pipeline
    }

    /// The composed pipeline, if it has been composed already.
    pub fn composed_pipeline(&self) -> Option<&Arc<Pipeline>> {
        self.pipeline.get()
    }

    pub fn watcher_active(&self) -> bool {
        self.watcher_active.load(Ordering::SeqCst)
    }

    /// Flip the watcher flag on. Returns `false` if it was already on.
    pub(crate) fn activate_watcher(&self) -> bool {
        !self.watcher_active.swap(true, Ordering::SeqCst)
    }
}

/// Single source of truth mapping `name -> Unit`.
#[derive(Debug, Default)]
pub struct UnitRegistry {
    units: Mutex<BTreeMap<String, Arc<Unit>>>,
}

impl UnitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, BTreeMap<String, Arc<Unit>>> {
        self.units.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a unit, or return the existing one with the same name.
    ///
    /// The first registration wins: parameters of later registrations under
    /// an existing name are ignored.
    pub fn register_or_get(&self, decl: UnitDecl) -> Result<Arc<Unit>> {
        if decl.name.trim().is_empty() {
            return Err(UnitdagError::ConfigError(
                "unit name must not be empty".to_string(),
            ));
        }
        if decl.root.as_os_str().is_empty() {
            return Err(UnitdagError::ConfigError(format!(
                "unit '{}' must have a root path",
                decl.name
            )));
        }

        let mut table = self.table();
        if let Some(existing) = table.get(&decl.name) {
            debug!(unit = %decl.name, "unit already registered; keeping first registration");
            return Ok(Arc::clone(existing));
        }

        let unit = Arc::new(Unit::from_decl(decl));
        table.insert(unit.name.clone(), Arc::clone(&unit));
        debug!(unit = %unit.name, deps = ?unit.dependency_names(), "registered unit");
        Ok(unit)
    }

    pub fn get(&self, name: &str) -> Option<Arc<Unit>> {
        self.table().get(name).cloned()
    }

    pub fn require(&self, name: &str) -> Result<Arc<Unit>> {
        self.get(name)
            .ok_or_else(|| UnitdagError::UnitNotFound(name.to_string()))
    }

    pub fn names(&self) -> Vec<String> {
        self.table().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.table().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table().is_empty()
    }

    /// Direct dependencies of `unit`, in declaration order.
    ///
    /// Transitive ordering is the caller's job: each dependency's own
    /// composite task already encodes its dependencies.
    pub fn resolve_build_closure(&self, unit: &Unit) -> Result<Vec<Arc<Unit>>> {
        unit.declared_dependencies()
            .iter()
            .map(|weak| {
                weak.upgrade().ok_or_else(|| {
                    UnitdagError::UnitNotFound(format!(
                        "a dependency of unit '{}' is no longer registered",
                        unit.name()
                    ))
                })
            })
            .collect()
    }

    /// Units that no registered unit depends on.
    pub fn targets(&self) -> Vec<Arc<Unit>> {
        let table = self.table();
        table
            .values()
            .filter(|candidate| {
                !table
                    .values()
                    .any(|u| u.dependencies().iter().any(|d| Arc::ptr_eq(d, candidate)))
            })
            .cloned()
            .collect()
    }
}
