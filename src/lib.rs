// src/lib.rs

pub mod cache;
pub mod cli;
pub mod config;
pub mod context;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod pipeline;
pub mod types;
pub mod unit;
pub mod watch;

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{debug, error, info};

use crate::cli::{CliArgs, Command};
use crate::config::{config_root_dir, load_and_validate};
use crate::context::OrchestratorContext;
use crate::exec::ToolchainExecutor;
use crate::fs::{FileSystem, RealFileSystem};
use crate::pipeline::{build_with_dependencies, BuildReport, Stage};
use crate::types::BuildMode;
use crate::unit::Unit;
use crate::watch::start_watcher;

/// High-level entry point used by `main.rs`.
///
/// Loads and validates the config, registers every unit, then runs the
/// requested command against the selected targets.
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;
    let root = std::path::absolute(config_root_dir(&config_path))
        .with_context(|| format!("resolving workspace root of {:?}", config_path))?;

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let executor = Arc::new(ToolchainExecutor::new(Arc::clone(&fs)));
    let ctx = OrchestratorContext::from_config(&cfg, root, executor, fs)?;
    let targets = resolve_targets(&ctx, args.command.unit())?;
    debug!(targets = ?targets.iter().map(|t| t.name()).collect::<Vec<_>>(), "resolved targets");

    match &args.command {
        Command::List => print_dry_run(&ctx, &targets),
        Command::Build { .. } => finish_build(build_targets(&ctx, &targets, BuildMode::Incremental).await?),
        Command::Rebuild { .. } => finish_build(build_targets(&ctx, &targets, BuildMode::Force).await?),
        Command::Watch { .. } => watch_targets(&ctx, &targets).await,
    }
}

/// The named unit, or every unit nothing else depends on.
pub fn resolve_targets(ctx: &OrchestratorContext, unit: Option<&str>) -> Result<Vec<Arc<Unit>>> {
    match unit {
        Some(name) => Ok(vec![ctx.registry.require(name)?]),
        None => Ok(ctx.registry.targets()),
    }
}

/// Build every target with its dependencies. Each unit runs at most once
/// and the first failing unit stops the whole invocation.
pub async fn build_targets(
    ctx: &OrchestratorContext,
    targets: &[Arc<Unit>],
    mode: BuildMode,
) -> Result<BuildReport> {
    let mut completed = HashSet::new();
    let mut report = BuildReport::default();

    for target in targets {
        let composite = build_with_dependencies(ctx, target)?;
        let target_report = composite.run_with(ctx, mode, &mut completed).await;
        let failed = !target_report.is_success();
        report.merge(target_report);
        if failed {
            break;
        }
    }

    Ok(report)
}

fn finish_build(report: BuildReport) -> Result<()> {
    let errors = report.errors();
    if !errors.is_empty() {
        bail!("build failed with {} error(s)", errors.len());
    }
    info!(units = report.units.len(), "build finished");
    Ok(())
}

async fn watch_targets(ctx: &Arc<OrchestratorContext>, targets: &[Arc<Unit>]) -> Result<()> {
    let report = build_targets(ctx, targets, BuildMode::Incremental).await?;
    for err in report.errors() {
        error!("{err}");
    }

    for target in targets {
        start_watcher(ctx, target)?;
    }
    info!(subscriptions = ctx.active_subscriptions(), "watching for changes; press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("listening for Ctrl-C")?;
    info!("shutting down");
    Ok(())
}

/// Print units, dependencies and composed pipelines without executing.
fn print_dry_run(ctx: &OrchestratorContext, targets: &[Arc<Unit>]) -> Result<()> {
    println!("unitdag dry-run");
    println!("  workspace = {}", ctx.workspace_root().display());
    println!("  lint_on_build = {:?}", ctx.settings.lint_on_build);
    println!("  lint_on_change = {:?}", ctx.settings.lint_on_change);
    println!();

    let mut seen = HashSet::new();
    for target in targets {
        let composite = build_with_dependencies(ctx, target)?;
        for unit in composite.schedule() {
            if !seen.insert(unit.name().to_string()) {
                continue;
            }
            println!("  - {}", unit.name());
            println!("      root: {}", unit.root().display());
            println!("      output: {}", unit.output().display());
            let deps = unit.dependency_names();
            if !deps.is_empty() {
                println!("      deps: {:?}", deps);
            }
            let pipeline = crate::pipeline::compose(ctx, &unit);
            for stage in pipeline.stages() {
                match stage {
                    Stage::Single(task) => println!("      step: {task}"),
                    Stage::Parallel(tasks) => {
                        let names: Vec<&str> = tasks.iter().map(|t| t.name()).collect();
                        println!("      step: [{}]", names.join(" | "));
                    }
                }
            }
        }
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}
