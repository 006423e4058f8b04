// src/pipeline/composer.rs

//! Turn a unit's descriptors into its ordered, memoized pipeline.
//!
//! Step order is fixed by kind:
//!
//! 1. static-file staging
//! 2. schema compile
//! 3. native build
//! 4. style compile
//! 5. template prefetch
//! 6. lint + language compile
//! 7. parser generation
//! 8. post-build (dependency artifact copy and/or hook)
//! 9. publish/drop
//!
//! Composing is pure data mapping and never fails.

use std::sync::Arc;

use tracing::debug;

use crate::context::OrchestratorContext;
use crate::pipeline::task::{StepKind, TaskRef, TaskTable};
use crate::pipeline::{Pipeline, Stage};
use crate::types::LintMode;
use crate::unit::Unit;

/// Return the unit's composed pipeline, composing it on first use.
///
/// Every later call returns the same `Arc`; tasks are registered only once.
pub fn compose(ctx: &OrchestratorContext, unit: &Unit) -> Arc<Pipeline> {
    let slot = unit.pipeline_slot();
    let pipeline = slot.get_or_init(|| {
        let pipeline = compose_stages(&ctx.tasks, ctx.settings.lint_on_build, unit);
        debug!(
            unit = %unit.name(),
            tasks = ?pipeline.task_names(),
            "composed pipeline"
        );
        Arc::new(pipeline)
    });
    Arc::clone(pipeline)
}

fn compose_stages(tasks: &TaskTable, lint_mode: LintMode, unit: &Unit) -> Pipeline {
    let name = unit.name();
    let d = unit.descriptors();
    let mut pipeline = Pipeline::default();

    let single = |present: bool, kind: StepKind, pipeline: &mut Pipeline| {
        if present {
            pipeline.push(Stage::Single(tasks.register(name, kind)));
        }
    };

    single(d.static_files.is_some(), StepKind::StaticFiles, &mut pipeline);
    single(d.schema.is_some(), StepKind::Schema, &mut pipeline);
    single(d.native.is_some(), StepKind::Native, &mut pipeline);
    single(d.style.is_some(), StepKind::Style, &mut pipeline);
    single(d.templates.is_some(), StepKind::Templates, &mut pipeline);

    if d.language.is_some() {
        // Lint is registered ahead of the compile it accompanies.
        let lint = tasks.register(name, StepKind::Lint);
        let compile = tasks.register(name, StepKind::Compile);
        for stage in language_stages(lint, compile, lint_mode) {
            pipeline.push(stage);
        }
    }

    single(d.parser.is_some(), StepKind::Parser, &mut pipeline);
    single(d.has_post_build(), StepKind::PostBuild, &mut pipeline);
    single(d.drop.is_some(), StepKind::Drop, &mut pipeline);

    pipeline
}

/// Lint/compile scheduling for the given mode.
pub(crate) fn language_stages(lint: TaskRef, compile: TaskRef, mode: LintMode) -> Vec<Stage> {
    match mode {
        LintMode::Parallel => vec![Stage::Parallel(vec![lint, compile])],
        LintMode::Before => vec![Stage::Single(lint), Stage::Single(compile)],
    }
}
