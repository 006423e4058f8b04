// src/pipeline/mod.rs

//! Pipelines: the ordered build steps of a unit.
//!
//! - [`task`] defines `TaskRef` and the idempotent `TaskTable`.
//! - [`composer`] turns a unit's descriptors into its memoized pipeline and
//!   derives the minimal sub-pipelines used by the watcher.
//! - [`runner`] executes a pipeline stage by stage and runs the incremental
//!   cache around a unit build.
//! - [`composite`] builds a unit after its dependencies.

pub mod composer;
pub mod composite;
pub mod runner;
pub mod task;

pub use composer::compose;
pub use composite::{build_with_dependencies, BuildReport, CompositeTask};
pub use runner::{build_unit, run_pipeline, PipelineOutcome, UnitReport, UnitStatus};
pub use task::{StepKind, TaskRef, TaskTable};

/// One step of a pipeline: either a single task, or a group of tasks that
/// are scheduled independently and joined before the next stage starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    Single(TaskRef),
    Parallel(Vec<TaskRef>),
}

impl Stage {
    pub fn tasks(&self) -> &[TaskRef] {
        match self {
            Stage::Single(task) => std::slice::from_ref(task),
            Stage::Parallel(tasks) => tasks,
        }
    }
}

/// Ordered list of stages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Every task in execution order (parallel groups in declaration order).
    pub fn task_refs(&self) -> Vec<&TaskRef> {
        self.stages.iter().flat_map(|s| s.tasks()).collect()
    }

    pub fn task_names(&self) -> Vec<&str> {
        self.task_refs().into_iter().map(TaskRef::name).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub(crate) fn push(&mut self, stage: Stage) {
        self.stages.push(stage);
    }
}
