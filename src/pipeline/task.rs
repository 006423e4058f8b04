// src/pipeline/task.rs

//! Task references and the idempotent task table.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::trace;

/// Kind of build step a task performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StepKind {
    StaticFiles,
    Schema,
    Native,
    Style,
    Templates,
    Lint,
    Compile,
    Parser,
    PostBuild,
    Drop,
}

impl StepKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::StaticFiles => "static",
            StepKind::Schema => "schema",
            StepKind::Native => "native",
            StepKind::Style => "style",
            StepKind::Templates => "templates",
            StepKind::Lint => "lint",
            StepKind::Compile => "compile",
            StepKind::Parser => "parser",
            StepKind::PostBuild => "post-build",
            StepKind::Drop => "drop",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle to one registered step of one unit.
///
/// Two `TaskRef`s are equal iff their names are equal.
#[derive(Debug, Clone)]
pub struct TaskRef {
    name: String,
    unit: String,
    kind: StepKind,
}

impl TaskRef {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn kind(&self) -> StepKind {
        self.kind
    }
}

impl PartialEq for TaskRef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for TaskRef {}

impl Hash for TaskRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for TaskRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Canonical task name: `<unit>:<step>`.
pub fn task_name(unit: &str, kind: StepKind) -> String {
    format!("{unit}:{}", kind.as_str())
}

/// Table of every registered task. Registering a name twice returns the
/// original handle instead of creating a second task.
#[derive(Debug, Default)]
pub struct TaskTable {
    tasks: Mutex<HashMap<String, TaskRef>>,
}

impl TaskTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, HashMap<String, TaskRef>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register(&self, unit: &str, kind: StepKind) -> TaskRef {
        let name = task_name(unit, kind);
        let mut table = self.table();
        if let Some(existing) = table.get(&name) {
            return existing.clone();
        }

        trace!(task = %name, "registering task");
        let task = TaskRef {
            name: name.clone(),
            unit: unit.to_string(),
            kind,
        };
        table.insert(name, task.clone());
        task
    }

    pub fn get(&self, name: &str) -> Option<TaskRef> {
        self.table().get(name).cloned()
    }

    /// Number of distinct registered tasks.
    pub fn len(&self) -> usize {
        self.table().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table().is_empty()
    }
}
