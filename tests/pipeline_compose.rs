mod common;
use crate::common::builders::{ConfigFileBuilder, UnitConfigBuilder};
use crate::common::{init_tracing, mock_workspace};

use std::sync::Arc;

use unitdag::pipeline::{compose, Stage, StepKind};
use unitdag::types::LintMode;

#[test]
fn compose_is_idempotent_and_registers_tasks_once() {
    init_tracing();

    let cfg = ConfigFileBuilder::new()
        .with_unit(
            "core",
            UnitConfigBuilder::new("libs/core")
                .schema("protoc")
                .language("tsc")
                .lint("eslint .")
                .build(),
        )
        .build();
    let w = mock_workspace(&cfg, &[("libs/core/src/a.ts", "a")]);
    let unit = w.ctx.registry.require("core").unwrap();

    assert!(unit.composed_pipeline().is_none());
    let first = compose(&w.ctx, &unit);
    let registered = w.ctx.tasks.len();
    let second = compose(&w.ctx, &unit);

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(w.ctx.tasks.len(), registered);
    assert_eq!(registered, 3);
    assert!(unit.composed_pipeline().is_some());
}

#[test]
fn steps_follow_fixed_order_regardless_of_declaration() {
    let cfg = ConfigFileBuilder::new()
        .with_unit(
            "app",
            UnitConfigBuilder::new("apps/web")
                .drop(&["../../public"], None, false)
                .after_build("echo done")
                .parser("peggy", "grammar.pegjs", "src/parser.js")
                .language("tsc")
                .templates("prefetch")
                .style("sass")
                .native("make")
                .schema("protoc")
                .static_file("assets/**", "dist/assets", false)
                .build(),
        )
        .build();
    let w = mock_workspace(&cfg, &[]);
    let unit = w.ctx.registry.require("app").unwrap();

    let pipeline = compose(&w.ctx, &unit);

    assert_eq!(
        pipeline.task_names(),
        vec![
            "app:static",
            "app:schema",
            "app:native",
            "app:style",
            "app:templates",
            "app:lint",
            "app:compile",
            "app:parser",
            "app:post-build",
            "app:drop",
        ]
    );
}

#[test]
fn lint_and_compile_share_a_stage_in_parallel_mode() {
    let cfg = ConfigFileBuilder::new()
        .with_unit("core", UnitConfigBuilder::new("libs/core").language("tsc").build())
        .build();
    let w = mock_workspace(&cfg, &[]);
    let unit = w.ctx.registry.require("core").unwrap();

    let pipeline = compose(&w.ctx, &unit);

    assert_eq!(pipeline.stages().len(), 1);
    match &pipeline.stages()[0] {
        Stage::Parallel(tasks) => {
            let kinds: Vec<StepKind> = tasks.iter().map(|t| t.kind()).collect();
            assert_eq!(kinds, vec![StepKind::Lint, StepKind::Compile]);
        }
        other => panic!("expected a parallel stage, got {other:?}"),
    }
}

#[test]
fn lint_runs_as_its_own_stage_in_before_mode() {
    let cfg = ConfigFileBuilder::new()
        .lint_on_build(LintMode::Before)
        .with_unit("core", UnitConfigBuilder::new("libs/core").language("tsc").build())
        .build();
    let w = mock_workspace(&cfg, &[]);
    let unit = w.ctx.registry.require("core").unwrap();

    let pipeline = compose(&w.ctx, &unit);

    assert_eq!(pipeline.stages().len(), 2);
    assert!(matches!(&pipeline.stages()[0], Stage::Single(t) if t.kind() == StepKind::Lint));
    assert!(matches!(&pipeline.stages()[1], Stage::Single(t) if t.kind() == StepKind::Compile));
}

#[test]
fn copy_deps_alone_produces_post_build_step() {
    let cfg = ConfigFileBuilder::new()
        .with_unit("core", UnitConfigBuilder::new("libs/core").build())
        .with_unit(
            "app",
            UnitConfigBuilder::new("apps/web")
                .dep("core")
                .copy_deps_artifacts("vendor")
                .build(),
        )
        .build();
    let w = mock_workspace(&cfg, &[]);

    let core = w.ctx.registry.require("core").unwrap();
    let app = w.ctx.registry.require("app").unwrap();

    assert!(compose(&w.ctx, &core).is_empty());
    assert_eq!(compose(&w.ctx, &app).task_names(), vec!["app:post-build"]);
}

#[test]
fn task_table_returns_existing_handle_for_duplicate_names() {
    let cfg = ConfigFileBuilder::new()
        .with_unit("core", UnitConfigBuilder::new("libs/core").style("sass").build())
        .build();
    let w = mock_workspace(&cfg, &[]);

    let a = w.ctx.tasks.register("core", StepKind::Style);
    let b = w.ctx.tasks.register("core", StepKind::Style);

    assert_eq!(a, b);
    assert_eq!(a.name(), "core:style");
    assert_eq!(w.ctx.tasks.len(), 1);
    assert_eq!(w.ctx.tasks.get("core:style"), Some(a));
}
