// src/pipeline/composite.rs

//! Composite tasks: a unit's pipeline preceded by those of its dependencies.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::context::OrchestratorContext;
use crate::errors::{CompileError, Result, UnitdagError};
use crate::pipeline::runner::{build_unit, UnitReport, UnitStatus};
use crate::pipeline::{compose, Pipeline};
use crate::types::BuildMode;
use crate::unit::Unit;

/// A unit plus the composite tasks of its direct dependencies.
#[derive(Debug, Clone)]
pub struct CompositeTask {
    unit: Arc<Unit>,
    dependencies: Vec<CompositeTask>,
    pipeline: Arc<Pipeline>,
}

/// Build the composite task rooted at `unit`.
///
/// Every unit in the closure has its pipeline composed (and its tasks
/// registered) by the time this returns.
pub fn build_with_dependencies(ctx: &OrchestratorContext, unit: &Arc<Unit>) -> Result<CompositeTask> {
    let mut visiting = Vec::new();
    build_composite(ctx, unit, &mut visiting)
}

fn build_composite(
    ctx: &OrchestratorContext,
    unit: &Arc<Unit>,
    visiting: &mut Vec<String>,
) -> Result<CompositeTask> {
    if visiting.iter().any(|name| name == unit.name()) {
        return Err(UnitdagError::DependencyCycle(format!(
            "{} -> {}",
            visiting.join(" -> "),
            unit.name()
        )));
    }

    visiting.push(unit.name().to_string());
    let dependencies = ctx
        .registry
        .resolve_build_closure(unit)?
        .iter()
        .map(|dep| build_composite(ctx, dep, visiting))
        .collect::<Result<Vec<_>>>()?;
    visiting.pop();

    Ok(CompositeTask {
        unit: Arc::clone(unit),
        dependencies,
        pipeline: compose(ctx, unit),
    })
}

impl CompositeTask {
    pub fn unit(&self) -> &Arc<Unit> {
        &self.unit
    }

    pub fn dependencies(&self) -> &[CompositeTask] {
        &self.dependencies
    }

    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    /// Units in build order: dependencies first, each unit once.
    pub fn schedule(&self) -> Vec<Arc<Unit>> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        self.collect_post_order(&mut seen, &mut order);
        order
    }

    fn collect_post_order(&self, seen: &mut HashSet<String>, order: &mut Vec<Arc<Unit>>) {
        for dep in &self.dependencies {
            dep.collect_post_order(seen, order);
        }
        if seen.insert(self.unit.name().to_string()) {
            order.push(Arc::clone(&self.unit));
        }
    }

    pub async fn run(&self, ctx: &OrchestratorContext, mode: BuildMode) -> BuildReport {
        let mut completed = HashSet::new();
        self.run_with(ctx, mode, &mut completed).await
    }

    /// Run the schedule, skipping units already present in `completed`.
    ///
    /// Sharing `completed` across several targets makes each unit run at
    /// most once per invocation. The first failing unit stops the run.
    pub async fn run_with(
        &self,
        ctx: &OrchestratorContext,
        mode: BuildMode,
        completed: &mut HashSet<String>,
    ) -> BuildReport {
        let mut report = BuildReport::default();

        for unit in self.schedule() {
            if !completed.insert(unit.name().to_string()) {
                debug!(unit = %unit.name(), "already handled in this invocation");
                continue;
            }

            let unit_report = build_unit(ctx, &unit, mode).await;
            let failed = unit_report.is_failed();
            report.units.push(unit_report);
            if failed {
                warn!(unit = %unit.name(), target = %self.unit.name(), "aborting remaining units");
                break;
            }
        }

        report
    }
}

/// Per-unit results of a composite run.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    pub units: Vec<UnitReport>,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        !self.units.iter().any(UnitReport::is_failed)
    }

    pub fn errors(&self) -> Vec<&CompileError> {
        self.units.iter().flat_map(|u| u.errors()).collect()
    }

    pub fn status_of(&self, unit: &str) -> Option<&UnitStatus> {
        self.units
            .iter()
            .find(|u| u.unit == unit)
            .map(|u| &u.status)
    }

    pub fn merge(&mut self, other: BuildReport) {
        self.units.extend(other.units);
    }
}
