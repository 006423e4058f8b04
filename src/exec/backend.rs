// src/exec/backend.rs

//! Pluggable step executor abstraction.
//!
//! The pipeline runner talks to a `StepExecutor` instead of invoking tools
//! directly. Production code uses [`ToolchainExecutor`](super::ToolchainExecutor);
//! tests provide a fake that records invocations.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use crate::errors::CompileError;
use crate::pipeline::TaskRef;
use crate::unit::Unit;

/// One request to execute a task of a unit.
#[derive(Debug, Clone)]
pub struct StepInvocation {
    pub unit: Arc<Unit>,
    pub task: TaskRef,
}

/// What a successful step produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepReport {
    /// Files written by the step; registered as cache outputs.
    pub outputs: Vec<PathBuf>,
}

pub type StepResult = std::result::Result<StepReport, Vec<CompileError>>;

/// Trait abstracting how a single task is executed.
pub trait StepExecutor: Send + Sync {
    /// Run the task to completion and report success or the collected errors.
    fn run(
        &self,
        invocation: StepInvocation,
    ) -> Pin<Box<dyn Future<Output = StepResult> + Send + '_>>;
}
