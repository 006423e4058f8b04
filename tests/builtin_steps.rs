mod common;
use crate::common::{init_tracing, ws, TestResult};

use std::sync::Arc;

use unitdag::exec::staging::{copy_dependency_artifacts, publish, stage_static_files};
use unitdag::fs::mock::MockFileSystem;
use unitdag::fs::FileSystem;
use unitdag::unit::{DropStep, StaticFile, TaskDescriptorSet, Unit, UnitDecl, UnitRegistry};

fn unit_with(registry: &UnitRegistry, name: &str, root: &str, d: TaskDescriptorSet) -> Arc<Unit> {
    registry
        .register_or_get(UnitDecl::new(name, ws(root)).with_descriptors(d))
        .unwrap()
}

#[test]
fn static_files_copy_single_files_and_globs() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file(ws("app/index.html"), "<html>");
    fs.add_file(ws("app/assets/img/logo.png"), "png");
    fs.add_file(ws("app/assets/fonts/a.woff"), "woff");
    let registry = UnitRegistry::new();
    let unit = unit_with(
        &registry,
        "app",
        "app",
        TaskDescriptorSet {
            static_files: Some(vec![
                StaticFile {
                    source: "index.html".into(),
                    dest: "dist/index.html".into(),
                    watch: false,
                },
                StaticFile {
                    source: "assets/**/*.png".into(),
                    dest: "dist/static".into(),
                    watch: false,
                },
            ]),
            ..Default::default()
        },
    );

    let outputs = stage_static_files(&fs, &unit)?;

    assert_eq!(
        outputs,
        vec![ws("app/dist/index.html"), ws("app/dist/static/img/logo.png")]
    );
    assert_eq!(fs.read(&ws("app/dist/static/img/logo.png"))?, b"png");
    assert!(!fs.exists(&ws("app/dist/static/fonts/a.woff")));
    Ok(())
}

#[test]
fn dependency_artifacts_land_in_per_dependency_folders() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file(ws("libs/core/dist/index.js"), "core");
    fs.add_file(ws("libs/core/dist/types/index.d.ts"), "types");
    let registry = UnitRegistry::new();
    let core = unit_with(&registry, "core", "libs/core", TaskDescriptorSet::default());
    let app = registry.register_or_get(UnitDecl::new("app", ws("apps/web")).with_dep(&core))?;

    let outputs = copy_dependency_artifacts(&fs, &app, "vendor")?;

    assert_eq!(outputs.len(), 2);
    assert_eq!(fs.read(&ws("apps/web/vendor/core/index.js"))?, b"core");
    assert_eq!(fs.read(&ws("apps/web/vendor/core/types/index.d.ts"))?, b"types");
    Ok(())
}

#[test]
fn drop_copies_output_tree_to_every_destination() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file(ws("apps/web/dist/main.js"), "main");
    fs.add_file(ws("apps/web/dist/css/site.css"), "css");
    let registry = UnitRegistry::new();
    let drop = DropStep {
        destinations: vec!["../../public".into(), "../../mirror".into()],
        sources: Vec::new(),
        join: None,
        watch: false,
    };
    let unit = unit_with(
        &registry,
        "web",
        "apps/web",
        TaskDescriptorSet {
            drop: Some(drop.clone()),
            ..Default::default()
        },
    );

    let outputs = publish(&fs, &unit, &drop)?;

    assert_eq!(outputs.len(), 4);
    assert_eq!(fs.read(&ws("public/css/site.css"))?, b"css");
    assert_eq!(fs.read(&ws("mirror/main.js"))?, b"main");
    Ok(())
}

#[test]
fn drop_join_concatenates_sources_in_path_order() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file(ws("lib/src/b.js"), "B;");
    fs.add_file(ws("lib/src/a.js"), "A;");
    fs.add_file(ws("lib/src/readme.txt"), "skip");
    let registry = UnitRegistry::new();
    let drop = DropStep {
        destinations: vec!["out".into()],
        sources: vec!["src/*.js".into()],
        join: Some("bundle.js".into()),
        watch: false,
    };
    let unit = unit_with(&registry, "lib", "lib", TaskDescriptorSet::default());

    let outputs = publish(&fs, &unit, &drop)?;

    assert_eq!(outputs, vec![ws("lib/out/bundle.js")]);
    assert_eq!(fs.read(&ws("lib/out/bundle.js"))?, b"A;B;");
    Ok(())
}

#[test]
fn registry_keeps_first_registration_and_rejects_empty_names() -> TestResult {
    let registry = UnitRegistry::new();
    let first = registry.register_or_get(UnitDecl::new("core", ws("libs/core")))?;
    let second = registry.register_or_get(UnitDecl::new("core", ws("elsewhere")))?;

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.root(), ws("libs/core"));
    assert_eq!(registry.len(), 1);
    assert!(registry.register_or_get(UnitDecl::new("", ws("x"))).is_err());
    assert!(registry.register_or_get(UnitDecl::new("x", "")).is_err());
    Ok(())
}
