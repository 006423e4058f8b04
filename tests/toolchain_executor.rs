#![cfg(unix)]

mod common;
use crate::common::builders::{ConfigFileBuilder, UnitConfigBuilder};
use crate::common::{init_tracing, write_file, TestResult};

use std::sync::Arc;

use tempfile::tempdir;

use unitdag::context::OrchestratorContext;
use unitdag::exec::{StepExecutor, StepInvocation, ToolchainExecutor};
use unitdag::fs::{FileSystem, RealFileSystem};
use unitdag::pipeline::StepKind;

fn context(root: &std::path::Path, app: UnitConfigBuilder) -> Arc<OrchestratorContext> {
    let cfg = ConfigFileBuilder::new().with_unit("app", app.build()).build();
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let executor = Arc::new(ToolchainExecutor::new(Arc::clone(&fs)));
    OrchestratorContext::from_config(&cfg, root, executor, fs).expect("registering units")
}

async fn run(ctx: &OrchestratorContext, kind: StepKind) -> unitdag::exec::StepResult {
    let unit = ctx.registry.require("app").expect("unit");
    let task = ctx.tasks.register(unit.name(), kind);
    ctx.executor().run(StepInvocation { unit, task }).await
}

#[tokio::test]
async fn tool_runs_in_unit_root_with_environment() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    write_file(dir.path(), "app/src/main.ts", "let x = 1;");
    let ctx = context(
        dir.path(),
        UnitConfigBuilder::new("app")
            .language("mkdir -p dist && printf '%s' \"$UNITDAG_TASK\" > dist/task.txt"),
    );

    let report = run(&ctx, StepKind::Compile).await;

    assert!(report.is_ok(), "{report:?}");
    assert_eq!(std::fs::read_to_string(dir.path().join("app/dist/task.txt"))?, "app:compile");
    Ok(())
}

#[tokio::test]
async fn failing_tool_output_becomes_compile_errors() -> TestResult {
    let dir = tempdir()?;
    write_file(dir.path(), "app/src/main.ts", "let x = ;");
    let ctx = context(
        dir.path(),
        UnitConfigBuilder::new("app")
            .language("echo 'src/main.ts(1,9): error TS1109: Expression expected.' >&2; exit 2"),
    );

    let errors = run(&ctx, StepKind::Compile).await.unwrap_err();

    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].line, Some(1));
    assert_eq!(errors[0].file.as_deref(), Some(dir.path().join("app/src/main.ts").as_path()));
    Ok(())
}

#[tokio::test]
async fn lint_without_command_succeeds() -> TestResult {
    let dir = tempdir()?;
    write_file(dir.path(), "app/src/main.ts", "");
    let ctx = context(dir.path(), UnitConfigBuilder::new("app").language("true"));

    assert!(run(&ctx, StepKind::Lint).await.is_ok());
    Ok(())
}

#[tokio::test]
async fn lint_findings_in_warn_mode_do_not_fail() -> TestResult {
    let dir = tempdir()?;
    write_file(dir.path(), "app/src/main.ts", "");
    let cfg = r#"
[unit.app]
root = "app"
language = { cmd = "true", lint = { cmd = "echo 'src/main.ts:1:1: no-var' && exit 1", report = "warn" } }
"#;
    write_file(dir.path(), "Unitdag.toml", cfg);
    let cfg = unitdag::config::load_and_validate(dir.path().join("Unitdag.toml"))?;
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let ctx = OrchestratorContext::from_config(
        &cfg,
        dir.path(),
        Arc::new(ToolchainExecutor::new(Arc::clone(&fs))),
        fs,
    )?;

    assert!(run(&ctx, StepKind::Lint).await.is_ok());
    Ok(())
}

#[tokio::test]
async fn style_step_reports_files_written_to_its_destination() -> TestResult {
    let dir = tempdir()?;
    write_file(dir.path(), "app/src/site.scss", "a {}");
    let ctx = context(
        dir.path(),
        UnitConfigBuilder::new("app")
            .style("mkdir -p \"$UNITDAG_STYLE_DEST\" && echo 'a{}' > \"$UNITDAG_STYLE_DEST/site.css\""),
    );

    let report = run(&ctx, StepKind::Style).await.expect("style step");

    assert_eq!(report.outputs, vec![dir.path().join("app/dist/site.css")]);
    Ok(())
}
