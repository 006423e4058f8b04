// src/context.rs

//! Explicit orchestration context passed to every operation.
//!
//! The unit table, the task table, the idle notifier and live watch
//! subscriptions all live here, so independent contexts can coexist in one
//! process (e.g. parallel tests).

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::config::model::{ConfigFile, SettingsSection};
use crate::errors::Result;
use crate::exec::StepExecutor;
use crate::fs::FileSystem;
use crate::pipeline::TaskTable;
use crate::unit::{Unit, UnitDecl, UnitRegistry};
use crate::watch::{IdleNotifier, WatchSubscription};

pub struct OrchestratorContext {
    pub settings: SettingsSection,
    pub registry: UnitRegistry,
    pub tasks: TaskTable,
    pub idle: Arc<IdleNotifier>,
    executor: Arc<dyn StepExecutor>,
    fs: Arc<dyn FileSystem>,
    workspace_root: PathBuf,
    subscriptions: Mutex<Vec<WatchSubscription>>,
}

impl fmt::Debug for OrchestratorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrchestratorContext")
            .field("workspace_root", &self.workspace_root)
            .field("units", &self.registry.names())
            .finish_non_exhaustive()
    }
}

impl OrchestratorContext {
    /// Create a context with an empty unit registry.
    pub fn new(
        settings: SettingsSection,
        workspace_root: impl Into<PathBuf>,
        executor: Arc<dyn StepExecutor>,
        fs: Arc<dyn FileSystem>,
    ) -> Arc<Self> {
        let idle = Arc::new(IdleNotifier::new(Duration::from_millis(
            settings.idle_delay_ms,
        )));
        Arc::new(Self {
            settings,
            registry: UnitRegistry::new(),
            tasks: TaskTable::new(),
            idle,
            executor,
            fs,
            workspace_root: workspace_root.into(),
            subscriptions: Mutex::new(Vec::new()),
        })
    }

    /// Create a context and register every unit of a validated config.
    pub fn from_config(
        cfg: &ConfigFile,
        workspace_root: impl Into<PathBuf>,
        executor: Arc<dyn StepExecutor>,
        fs: Arc<dyn FileSystem>,
    ) -> Result<Arc<Self>> {
        let ctx = Self::new(cfg.settings().clone(), workspace_root, executor, fs);
        ctx.register_units(cfg)?;
        Ok(ctx)
    }

    /// Register the units of `cfg` in dependency order.
    pub fn register_units(&self, cfg: &ConfigFile) -> Result<()> {
        for name in cfg.topological_order() {
            let Some(unit_cfg) = cfg.units().get(name) else {
                continue;
            };

            let deps = unit_cfg
                .deps
                .iter()
                .map(|dep| self.registry.require(dep))
                .collect::<Result<Vec<_>>>()?;

            let decl = UnitDecl {
                name: name.clone(),
                root: self.workspace_root.join(&unit_cfg.root),
                output: PathBuf::from(
                    unit_cfg
                        .output
                        .as_deref()
                        .unwrap_or(&cfg.settings().output_dir),
                ),
                inputs: unit_cfg.inputs.clone(),
                watch_includes: unit_cfg.watch.includes.clone(),
                deps,
                descriptors: unit_cfg.steps.clone(),
            };
            self.registry.register_or_get(decl)?;
        }
        Ok(())
    }

    pub fn executor(&self) -> &Arc<dyn StepExecutor> {
        &self.executor
    }

    pub fn fs(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Directory holding the per-unit cache files.
    pub fn cache_dir(&self) -> PathBuf {
        self.workspace_root.join(&self.settings.cache_dir)
    }

    pub fn cache_file_for(&self, unit: &Unit) -> PathBuf {
        self.cache_dir().join(format!("{}.json", unit.name()))
    }

    pub(crate) fn keep_subscription(&self, subscription: WatchSubscription) {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(subscription);
    }

    /// Number of live filesystem subscriptions.
    pub fn active_subscriptions(&self) -> usize {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
