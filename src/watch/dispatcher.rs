// src/watch/dispatcher.rs

//! Turn watch events into minimal task subsequences.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::cache::IncrementalCache;
use crate::context::OrchestratorContext;
use crate::exec::staging::copy_static_file;
use crate::pipeline::{run_pipeline, Pipeline, TaskRef};
use crate::unit::Unit;
use crate::watch::cache::FileCache;
use crate::watch::classify::{publish_subsequence, subsequence_for, Classifier, FileClass, WatchAction};
use crate::watch::patterns::UnitWatchProfile;
use crate::watch::watcher::{subscribe, ChangeKind, WatchEvent};

/// What handling one event amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Outside the unit's watch profile.
    Ignored,
    /// `Changed` event with identical content.
    Unchanged,
    /// Static file copied to this destination.
    Copied(PathBuf),
    /// Subsequence spawned with these tasks.
    Dispatched(Vec<TaskRef>),
    /// Recognized file type, but the unit declares none of its steps.
    NoTask(FileClass),
    Unrecognized,
}

/// Event handling state for one unit.
#[derive(Debug)]
pub struct WatchDispatcher {
    ctx: Arc<OrchestratorContext>,
    unit: Arc<Unit>,
    profile: UnitWatchProfile,
    classifier: Classifier,
    contents: FileCache,
}

impl WatchDispatcher {
    pub fn new(ctx: Arc<OrchestratorContext>, unit: Arc<Unit>) -> Result<Self> {
        let profile = UnitWatchProfile::for_unit(&unit, &ctx.cache_dir())?;
        let classifier = Classifier::for_unit(&unit, &ctx.settings.extensions)?;

        let mut contents = FileCache::new();
        let record = IncrementalCache::load(ctx.fs(), ctx.cache_file_for(&unit), ctx.workspace_root());
        for (path, digest) in record.recorded_inputs() {
            contents.seed(path, digest.clone());
        }
        debug!(unit = %unit.name(), seeded = contents.len(), "watch dispatcher ready");

        Ok(Self {
            ctx,
            unit,
            profile,
            classifier,
            contents,
        })
    }

    pub fn profile(&self) -> &UnitWatchProfile {
        &self.profile
    }

    pub fn handle_event(&mut self, event: &WatchEvent) -> DispatchOutcome {
        if !self.profile.matches(&event.path) {
            return DispatchOutcome::Ignored;
        }

        let fs = self.ctx.fs();
        match event.kind {
            ChangeKind::Changed => {
                if !self.contents.has_changed(fs, &event.path) {
                    debug!(path = ?event.path, "content unchanged; ignoring");
                    return DispatchOutcome::Unchanged;
                }
            }
            ChangeKind::Added => {
                self.contents.has_changed(fs, &event.path);
            }
            ChangeKind::Deleted => self.contents.forget(&event.path),
        }

        match self.classifier.classify(&event.path) {
            WatchAction::CopyStatic(directive) => {
                if event.kind == ChangeKind::Deleted {
                    debug!(path = ?event.path, "static source deleted; nothing to copy");
                    return DispatchOutcome::Ignored;
                }
                match copy_static_file(fs, &self.unit, &directive, &event.path) {
                    Ok(dest) => {
                        info!(unit = %self.unit.name(), from = ?event.path, to = ?dest, "copied static file");
                        DispatchOutcome::Copied(dest)
                    }
                    Err(err) => {
                        error!(unit = %self.unit.name(), path = ?event.path, error = %err, "failed to copy static file");
                        DispatchOutcome::Ignored
                    }
                }
            }
            WatchAction::Publish => {
                let pipeline = publish_subsequence(&self.ctx, &self.unit);
                self.dispatch(pipeline)
            }
            WatchAction::Run(class) => {
                let pipeline = subsequence_for(&self.ctx, &self.unit, class);
                if pipeline.is_empty() {
                    debug!(unit = %self.unit.name(), ?class, "no step handles this file type");
                    return DispatchOutcome::NoTask(class);
                }
                self.dispatch(pipeline)
            }
            WatchAction::Unrecognized => {
                warn!(
                    unit = %self.unit.name(),
                    path = ?event.path,
                    "unrecognized file type; no task dispatched"
                );
                DispatchOutcome::Unrecognized
            }
        }
    }

    fn dispatch(&self, pipeline: Pipeline) -> DispatchOutcome {
        let tasks: Vec<TaskRef> = pipeline.task_refs().into_iter().cloned().collect();
        info!(unit = %self.unit.name(), tasks = ?pipeline.task_names(), "dispatching");

        self.ctx.idle.begin();
        let ctx = Arc::clone(&self.ctx);
        let unit = Arc::clone(&self.unit);
        tokio::spawn(async move {
            let outcome = run_pipeline(&ctx, &unit, &pipeline).await;
            if outcome.is_success() {
                debug!(unit = %unit.name(), "subsequence finished");
            } else {
                error!(
                    unit = %unit.name(),
                    errors = outcome.errors.len(),
                    "subsequence failed; still watching"
                );
            }
            ctx.idle.finish();
        });

        DispatchOutcome::Dispatched(tasks)
    }

    /// Handle events in arrival order until the channel closes.
    pub async fn run(mut self, mut rx: mpsc::UnboundedReceiver<WatchEvent>) {
        while let Some(event) = rx.recv().await {
            let outcome = self.handle_event(&event);
            debug!(path = ?event.path, kind = ?event.kind, ?outcome, "handled watch event");
        }
        debug!(unit = %self.unit.name(), "watch loop finished");
    }
}

/// Start watching `unit`, after starting every dependency's watcher.
///
/// Returns `false` when the unit was already being watched.
pub fn start_watcher(ctx: &Arc<OrchestratorContext>, unit: &Arc<Unit>) -> Result<bool> {
    if !unit.activate_watcher() {
        debug!(unit = %unit.name(), "watcher already active");
        return Ok(false);
    }

    for dep in ctx.registry.resolve_build_closure(unit)? {
        start_watcher(ctx, &dep)?;
    }

    let dispatcher = WatchDispatcher::new(Arc::clone(ctx), Arc::clone(unit))?;
    let dep_outputs: Vec<PathBuf> = unit
        .dependencies()
        .iter()
        .map(|dep| dep.output().to_path_buf())
        .collect();

    let mut roots = Vec::new();
    for root in dispatcher.profile().roots() {
        if !ctx.fs().is_dir(root) {
            // A dependency whose build failed has no output yet; its next
            // rebuild must still reach this unit.
            if dep_outputs.contains(root) {
                ctx.fs().create_dir_all(root)?;
                debug!(unit = %unit.name(), root = ?root, "created missing dependency output");
            } else {
                warn!(unit = %unit.name(), root = ?root, "watch root does not exist; skipping");
                continue;
            }
        }
        roots.push(root.clone());
    }

    let (tx, rx) = mpsc::unbounded_channel();
    let subscription = subscribe(ctx.fs(), unit.name(), &roots, tx)?;
    ctx.keep_subscription(subscription);
    tokio::spawn(dispatcher.run(rx));

    Ok(true)
}
