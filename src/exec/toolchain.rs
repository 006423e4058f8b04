// src/exec/toolchain.rs

//! Production step executor.
//!
//! External steps (schema, native, style, templates, lint, compile, parser,
//! after-build hook) run their `cmd` through the platform shell inside the
//! unit root. Options travel as `UNITDAG_*` environment variables. Staging,
//! dependency artifact copy and publish run in-process.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::errors::CompileError;
use crate::exec::backend::{StepExecutor, StepInvocation, StepReport, StepResult};
use crate::exec::diagnostics::failure_diagnostics;
use crate::exec::staging;
use crate::fs::{walk_files, FileSystem};
use crate::pipeline::{StepKind, TaskRef};
use crate::types::LintReport;
use crate::unit::Unit;

type Env = Vec<(&'static str, String)>;

#[derive(Debug, Clone)]
pub struct ToolchainExecutor {
    fs: Arc<dyn FileSystem>,
}

impl ToolchainExecutor {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    async fn run_step(&self, invocation: StepInvocation) -> StepResult {
        let unit = invocation.unit.as_ref();
        let task = &invocation.task;
        let d = unit.descriptors();
        let fs = self.fs.as_ref();

        match task.kind() {
            StepKind::StaticFiles => builtin(task, staging::stage_static_files(fs, unit)),
            StepKind::Schema => {
                let step = require(task, d.schema.as_ref())?;
                let env = vec![("UNITDAG_SCHEMA_SOURCES", step.sources.join(" "))];
                run_tool(task, unit, &step.cmd, env).await
            }
            StepKind::Native => {
                let step = require(task, d.native.as_ref())?;
                let cmd = if step.args.is_empty() {
                    step.cmd.clone()
                } else {
                    format!("{} {}", step.cmd, step.args.join(" "))
                };
                run_tool(task, unit, &cmd, Vec::new()).await
            }
            StepKind::Style => {
                let step = require(task, d.style.as_ref())?;
                let dest = match &step.dest {
                    Some(dest) => unit.root().join(dest),
                    None => unit.output().to_path_buf(),
                };
                let mut env = vec![
                    ("UNITDAG_STYLE_SOURCES", step.sources.join(" ")),
                    ("UNITDAG_STYLE_DEST", dest.display().to_string()),
                ];
                if let Some(name) = &step.name {
                    env.push(("UNITDAG_STYLE_NAME", name.clone()));
                }
                let mut report = run_tool(task, unit, &step.cmd, env).await?;
                report.outputs = files_under(fs, &dest);
                Ok(report)
            }
            StepKind::Templates => {
                let step = require(task, d.templates.as_ref())?;
                let env = vec![("UNITDAG_TEMPLATE_ROOTS", step.roots.join(" "))];
                run_tool(task, unit, &step.cmd, env).await
            }
            StepKind::Lint => {
                let step = require(task, d.language.as_ref())?;
                let Some(cmd) = &step.lint.cmd else {
                    debug!(task = %task, "no lint command configured; nothing to do");
                    return Ok(StepReport::default());
                };
                match run_tool(task, unit, cmd, Vec::new()).await {
                    Err(findings) if step.lint.report == LintReport::Warn => {
                        for finding in &findings {
                            warn!(task = %task, "{finding}");
                        }
                        Ok(StepReport::default())
                    }
                    other => other,
                }
            }
            StepKind::Compile => {
                let step = require(task, d.language.as_ref())?;
                let mut env = vec![(
                    "UNITDAG_DECLARATION",
                    if step.declaration { "1" } else { "0" }.to_string(),
                )];
                if let Some(target) = &step.target {
                    env.push(("UNITDAG_TARGET", target.clone()));
                }
                if let Some(out_name) = &step.out_name {
                    env.push(("UNITDAG_OUT_NAME", out_name.clone()));
                }
                run_tool(task, unit, &step.cmd, env).await
            }
            StepKind::Parser => {
                let step = require(task, d.parser.as_ref())?;
                let dest = unit.root().join(&step.dest);
                let env = vec![
                    ("UNITDAG_GRAMMAR", unit.root().join(&step.grammar).display().to_string()),
                    ("UNITDAG_PARSER_DEST", dest.display().to_string()),
                ];
                let mut report = run_tool(task, unit, &step.cmd, env).await?;
                report.outputs = if fs.is_file(&dest) {
                    vec![dest]
                } else {
                    files_under(fs, &dest)
                };
                Ok(report)
            }
            StepKind::PostBuild => {
                let mut report = StepReport::default();
                if let Some(copy) = &d.copy_deps_artifacts {
                    report.outputs = builtin(
                        task,
                        staging::copy_dependency_artifacts(fs, unit, &copy.dest),
                    )?
                    .outputs;
                }
                if let Some(hook) = &d.after_build {
                    run_tool(task, unit, &hook.cmd, Vec::new()).await?;
                }
                Ok(report)
            }
            StepKind::Drop => {
                let step = require(task, d.drop.as_ref())?;
                builtin(task, staging::publish(fs, unit, step))
            }
        }
    }
}

impl StepExecutor for ToolchainExecutor {
    fn run(
        &self,
        invocation: StepInvocation,
    ) -> Pin<Box<dyn Future<Output = StepResult> + Send + '_>> {
        Box::pin(self.run_step(invocation))
    }
}

fn require<'a, T>(task: &TaskRef, step: Option<&'a T>) -> Result<&'a T, Vec<CompileError>> {
    step.ok_or_else(|| {
        vec![CompileError::new(
            task.name(),
            format!("unit '{}' has no {} descriptor", task.unit(), task.kind()),
        )]
    })
}

fn builtin(task: &TaskRef, result: anyhow::Result<Vec<std::path::PathBuf>>) -> StepResult {
    result
        .map(|outputs| StepReport { outputs })
        .map_err(|err| vec![CompileError::new(task.name(), format!("{err:#}"))])
}

fn files_under(fs: &dyn FileSystem, dir: &Path) -> Vec<std::path::PathBuf> {
    walk_files(fs, dir).unwrap_or_default()
}

fn shell(cmd: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    }
}

/// Run one external tool to completion.
async fn run_tool(task: &TaskRef, unit: &Unit, cmd: &str, env: Env) -> StepResult {
    info!(task = %task, cmd = %cmd, "starting tool");

    let mut command = shell(cmd);
    command
        .current_dir(unit.root())
        .env("UNITDAG_UNIT", unit.name())
        .env("UNITDAG_TASK", task.name())
        .env("UNITDAG_ROOT", unit.root())
        .env("UNITDAG_OUT", unit.output())
        .envs(env)
        .stdin(Stdio::null())
        .kill_on_drop(true);

    let output = match command.output().await {
        Ok(output) => output,
        Err(err) => {
            return Err(vec![CompileError::new(
                task.name(),
                format!("spawning `{cmd}`: {err}"),
            )]);
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    for line in stdout.lines().chain(stderr.lines()) {
        debug!(task = %task, "{}", line);
    }

    if output.status.success() {
        info!(task = %task, "tool finished");
        return Ok(StepReport::default());
    }

    let combined = format!("{stdout}\n{stderr}");
    Err(failure_diagnostics(
        task.name(),
        unit.root(),
        cmd,
        output.status.code(),
        &combined,
    ))
}
