// src/pipeline/runner.rs

//! Stage-by-stage pipeline execution and the cache-guarded unit build.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::cache::{collect_inputs, IncrementalCache};
use crate::context::OrchestratorContext;
use crate::errors::CompileError;
use crate::exec::{StepInvocation, StepResult};
use crate::fs::walk_files;
use crate::pipeline::{compose, Pipeline, Stage, TaskRef};
use crate::types::BuildMode;
use crate::unit::Unit;

/// Result of running one pipeline.
#[derive(Debug, Default)]
pub struct PipelineOutcome {
    /// Files the executed steps reported as written.
    pub outputs: Vec<PathBuf>,
    pub errors: Vec<CompileError>,
    /// Tasks that actually ran, in completion order per stage.
    pub executed: Vec<TaskRef>,
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Run `pipeline` for `unit`. A stage that reports errors ends the run.
pub async fn run_pipeline(
    ctx: &OrchestratorContext,
    unit: &Arc<Unit>,
    pipeline: &Pipeline,
) -> PipelineOutcome {
    let mut outcome = PipelineOutcome::default();

    for stage in pipeline.stages() {
        for (task, result) in run_stage(ctx, unit, stage).await {
            match result {
                Ok(report) => {
                    debug!(task = %task, outputs = report.outputs.len(), "task finished");
                    outcome.outputs.extend(report.outputs);
                }
                Err(errors) => {
                    for err in &errors {
                        error!("{err}");
                    }
                    outcome.errors.extend(errors);
                }
            }
            outcome.executed.push(task);
        }

        if !outcome.is_success() {
            warn!(unit = %unit.name(), "stage failed; skipping remaining steps");
            break;
        }
    }

    outcome
}

async fn run_stage(
    ctx: &OrchestratorContext,
    unit: &Arc<Unit>,
    stage: &Stage,
) -> Vec<(TaskRef, StepResult)> {
    match stage {
        Stage::Single(task) => {
            let invocation = StepInvocation {
                unit: Arc::clone(unit),
                task: task.clone(),
            };
            let result = ctx.executor().run(invocation).await;
            vec![(task.clone(), result)]
        }
        Stage::Parallel(tasks) => {
            let mut set = JoinSet::new();
            for (idx, task) in tasks.iter().enumerate() {
                let executor = Arc::clone(ctx.executor());
                let invocation = StepInvocation {
                    unit: Arc::clone(unit),
                    task: task.clone(),
                };
                set.spawn(async move { (idx, executor.run(invocation).await) });
            }

            let mut results: Vec<Option<StepResult>> = tasks.iter().map(|_| None).collect();
            while let Some(joined) = set.join_next().await {
                match joined {
                    Ok((idx, result)) => results[idx] = Some(result),
                    Err(err) => error!(unit = %unit.name(), error = %err, "parallel task aborted"),
                }
            }

            tasks
                .iter()
                .zip(results)
                .map(|(task, result)| {
                    let result = result.unwrap_or_else(|| {
                        Err(vec![CompileError::new(
                            task.name(),
                            "task panicked or was cancelled",
                        )])
                    });
                    (task.clone(), result)
                })
                .collect()
        }
    }
}

/// How a unit build ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitStatus {
    /// Cache said nothing changed.
    Skipped,
    Built,
    Failed(Vec<CompileError>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitReport {
    pub unit: String,
    pub status: UnitStatus,
}

impl UnitReport {
    pub fn is_failed(&self) -> bool {
        matches!(self.status, UnitStatus::Failed(_))
    }

    pub fn errors(&self) -> &[CompileError] {
        match &self.status {
            UnitStatus::Failed(errors) => errors,
            _ => &[],
        }
    }
}

/// Build one unit (not its dependencies) behind its incremental cache.
///
/// The cache record is only rewritten after a run with zero errors.
pub async fn build_unit(ctx: &OrchestratorContext, unit: &Arc<Unit>, mode: BuildMode) -> UnitReport {
    let fs = ctx.fs();
    let mut cache = IncrementalCache::load(fs, ctx.cache_file_for(unit), ctx.workspace_root());

    let inputs = match collect_inputs(fs, unit, &ctx.cache_dir()) {
        Ok(inputs) => inputs,
        Err(err) => {
            warn!(unit = %unit.name(), error = %err, "failed to collect inputs; rebuilding");
            Vec::new()
        }
    };
    let dirty = cache.should_rebuild(fs, &inputs);

    if mode == BuildMode::Incremental && !dirty {
        info!(unit = %unit.name(), "up to date");
        return UnitReport {
            unit: unit.name().to_string(),
            status: UnitStatus::Skipped,
        };
    }

    let pipeline = compose(ctx, unit);
    info!(unit = %unit.name(), tasks = ?pipeline.task_names(), ?mode, "building unit");
    let outcome = run_pipeline(ctx, unit, &pipeline).await;

    if !outcome.is_success() {
        error!(
            unit = %unit.name(),
            errors = outcome.errors.len(),
            "build failed; cache left untouched"
        );
        return UnitReport {
            unit: unit.name().to_string(),
            status: UnitStatus::Failed(outcome.errors),
        };
    }

    for path in outcome.outputs {
        cache.register_output(path);
    }
    match walk_files(fs, unit.output()) {
        Ok(files) => files.into_iter().for_each(|f| cache.register_output(f)),
        Err(err) => warn!(unit = %unit.name(), error = %err, "failed to scan output root"),
    }
    cache.save(fs);

    UnitReport {
        unit: unit.name().to_string(),
        status: UnitStatus::Built,
    }
}
