use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use unitdag::errors::CompileError;
use unitdag::exec::{StepExecutor, StepInvocation, StepReport, StepResult};
use unitdag::fs::FileSystem;

/// A fake step executor that:
/// - records the name of every task it is asked to run
/// - fails tasks registered with [`fail_task`](Self::fail_task)
/// - otherwise writes `<unit output>/<step>.out` and reports it as output
#[derive(Debug, Clone)]
pub struct RecordingExecutor {
    fs: Arc<dyn FileSystem>,
    invocations: Arc<Mutex<Vec<String>>>,
    failures: Arc<Mutex<HashMap<String, String>>>,
    delay: Option<Duration>,
    running: Arc<AtomicUsize>,
    max_running: Arc<AtomicUsize>,
}

impl RecordingExecutor {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            invocations: Arc::new(Mutex::new(Vec::new())),
            failures: Arc::new(Mutex::new(HashMap::new())),
            delay: None,
            running: Arc::new(AtomicUsize::new(0)),
            max_running: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Sleep this long inside every task.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Make `task` (e.g. `"core:compile"`) report one error.
    pub fn fail_task(&self, task: &str, message: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert(task.to_string(), message.to_string());
    }

    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
    }

    /// Task names in the order they were started.
    pub fn invocations(&self) -> Vec<String> {
        self.invocations.lock().unwrap().clone()
    }

    pub fn count(&self, task: &str) -> usize {
        self.invocations
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.as_str() == task)
            .count()
    }

    pub fn clear(&self) {
        self.invocations.lock().unwrap().clear();
    }

    /// Highest number of tasks observed running at the same time.
    pub fn max_concurrency(&self) -> usize {
        self.max_running.load(Ordering::SeqCst)
    }
}

impl StepExecutor for RecordingExecutor {
    fn run(
        &self,
        invocation: StepInvocation,
    ) -> Pin<Box<dyn Future<Output = StepResult> + Send + '_>> {
        Box::pin(async move {
            let name = invocation.task.name().to_string();
            self.invocations.lock().unwrap().push(name.clone());

            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_running.fetch_max(now, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.running.fetch_sub(1, Ordering::SeqCst);

            let failure = self.failures.lock().unwrap().get(&name).cloned();
            if let Some(message) = failure {
                return Err(vec![CompileError::new(name, message)]);
            }

            let artifact = invocation
                .unit
                .output()
                .join(format!("{}.out", invocation.task.kind()));
            self.fs
                .write(&artifact, name.as_bytes())
                .map_err(|err| vec![CompileError::new(name.clone(), err.to_string())])?;

            Ok(StepReport {
                outputs: vec![artifact],
            })
        })
    }
}
