#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use unitdag::config::ConfigFile;
use unitdag::context::OrchestratorContext;
use unitdag::fs::mock::MockFileSystem;
use unitdag::fs::{FileSystem, RealFileSystem};

pub use unitdag_test_utils::builders;
pub use unitdag_test_utils::{init_tracing, with_timeout, RecordingExecutor};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Root of every in-memory workspace.
pub const WS: &str = "/ws";

pub fn ws(rel: &str) -> PathBuf {
    Path::new(WS).join(rel)
}

/// Context over an in-memory filesystem rooted at [`WS`].
pub struct MockWorkspace {
    pub fs: MockFileSystem,
    pub executor: RecordingExecutor,
    pub ctx: Arc<OrchestratorContext>,
}

pub fn mock_workspace(cfg: &ConfigFile, files: &[(&str, &str)]) -> MockWorkspace {
    let fs = MockFileSystem::new();
    for (path, content) in files {
        fs.add_file(ws(path), content.as_bytes());
    }
    let shared: Arc<dyn FileSystem> = Arc::new(fs.clone());
    let executor = RecordingExecutor::new(Arc::clone(&shared));
    let ctx = OrchestratorContext::from_config(cfg, WS, Arc::new(executor.clone()), shared)
        .expect("registering units");
    MockWorkspace { fs, executor, ctx }
}

/// Context over a real directory (e.g. a `tempfile::TempDir`).
pub fn real_workspace(
    cfg: &ConfigFile,
    root: &Path,
) -> (Arc<OrchestratorContext>, RecordingExecutor) {
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let executor = RecordingExecutor::new(Arc::clone(&fs));
    let ctx = OrchestratorContext::from_config(cfg, root, Arc::new(executor.clone()), fs)
        .expect("registering units");
    (ctx, executor)
}

/// Write `content` to `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("creating parent dirs");
    }
    std::fs::write(path, content).expect("writing file");
}
