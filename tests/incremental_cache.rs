mod common;
use crate::common::builders::{ConfigFileBuilder, UnitConfigBuilder};
use crate::common::{init_tracing, mock_workspace, ws, TestResult};

use std::path::PathBuf;

use tempfile::tempdir;

use unitdag::cache::{collect_inputs, digest_of, digest_of_paths, IncrementalCache};
use unitdag::fs::mock::MockFileSystem;
use unitdag::fs::{FileSystem, RealFileSystem};

fn cache_path() -> PathBuf {
    ws(".unitdag/cache/core.json")
}

/// Mock tree with two inputs and one output, and a saved record for it.
fn saved_fixture() -> (MockFileSystem, Vec<PathBuf>, PathBuf) {
    let fs = MockFileSystem::new();
    let inputs = vec![ws("libs/core/src/a.ts"), ws("libs/core/src/b.ts")];
    fs.add_file(&inputs[0], "a");
    fs.add_file(&inputs[1], "b");
    let output = ws("libs/core/dist/a.js");
    fs.add_file(&output, "compiled a");

    let mut cache = IncrementalCache::load(&fs, cache_path(), "/ws");
    assert!(cache.should_rebuild(&fs, &inputs));
    cache.register_output(&output);
    assert!(cache.save(&fs));

    (fs, inputs, output)
}

#[test]
fn blake3_digest_of_known_content() {
    assert_eq!(
        digest_of(b"hello world").as_str(),
        "d74981efa70a0c880b8d8c1985d075dbcbf679b99a5f9914e5aaf96b831a9e24"
    );
}

#[test]
fn aggregate_digest_ignores_path_order_and_missing_files() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("/x/a", "1");
    fs.add_file("/x/b", "2");

    let forward = digest_of_paths(&fs, ["/x/a", "/x/b"])?;
    let backward = digest_of_paths(&fs, ["/x/b", "/x/missing", "/x/a"])?;
    assert_eq!(forward, backward);

    fs.add_file("/x/b", "3");
    assert_ne!(digest_of_paths(&fs, ["/x/a", "/x/b"])?, forward);
    Ok(())
}

#[test]
fn missing_cache_file_means_rebuild() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file(ws("libs/core/src/a.ts"), "a");

    let mut cache = IncrementalCache::load(&fs, cache_path(), "/ws");

    assert!(cache.record().input_digests.is_empty());
    assert!(cache.should_rebuild(&fs, &[ws("libs/core/src/a.ts")]));
}

#[test]
fn unchanged_inputs_and_outputs_skip_rebuild() {
    let (fs, inputs, _) = saved_fixture();

    let mut cache = IncrementalCache::load(&fs, cache_path(), "/ws");

    assert!(!cache.has_any_input_changed(&fs, &inputs));
    assert!(!cache.has_any_output_changed(&fs));
    assert!(!cache.should_rebuild(&fs, &inputs));
}

#[test]
fn modified_input_flips_rebuild() {
    let (fs, inputs, _) = saved_fixture();
    fs.add_file(&inputs[1], "b changed");

    let mut cache = IncrementalCache::load(&fs, cache_path(), "/ws");

    assert!(cache.should_rebuild(&fs, &inputs));
}

#[test]
fn new_input_flips_rebuild() {
    let (fs, mut inputs, _) = saved_fixture();
    let added = ws("libs/core/src/c.ts");
    fs.add_file(&added, "c");
    inputs.push(added);

    let mut cache = IncrementalCache::load(&fs, cache_path(), "/ws");

    assert!(cache.has_any_input_changed(&fs, &inputs));
}

#[test]
fn deleted_input_flips_rebuild() {
    let (fs, inputs, _) = saved_fixture();
    fs.remove(&inputs[1]);

    let mut cache = IncrementalCache::load(&fs, cache_path(), "/ws");

    assert!(cache.has_any_input_changed(&fs, &inputs[..1]));
}

#[test]
fn deleted_output_flips_rebuild() {
    let (fs, inputs, output) = saved_fixture();
    fs.remove(&output);

    let mut cache = IncrementalCache::load(&fs, cache_path(), "/ws");

    assert!(!cache.has_any_input_changed(&fs, &inputs));
    assert!(cache.has_any_output_changed(&fs));
}

#[test]
fn externally_modified_output_flips_rebuild() {
    let (fs, inputs, output) = saved_fixture();
    fs.add_file(&output, "hand edited");

    let mut cache = IncrementalCache::load(&fs, cache_path(), "/ws");

    assert!(cache.should_rebuild(&fs, &inputs));
}

#[test]
fn malformed_cache_file_loads_as_empty_record() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file(cache_path(), "{ not json");
    fs.add_file(ws("libs/core/src/a.ts"), "a");

    let mut cache = IncrementalCache::load(&fs, cache_path(), "/ws");

    assert!(cache.record().input_digests.is_empty());
    assert!(cache.should_rebuild(&fs, &[ws("libs/core/src/a.ts")]));
}

#[test]
fn record_is_json_keyed_by_workspace_relative_paths() -> TestResult {
    let (fs, _, _) = saved_fixture();

    let json: serde_json::Value = serde_json::from_slice(&fs.read(&cache_path())?)?;

    assert_eq!(
        json["libs/core/src/a.ts"].as_str(),
        Some(digest_of(b"a").as_str())
    );
    assert_eq!(
        json["outputFiles"]["libs/core/dist/a.js"].as_str(),
        Some(digest_of(b"compiled a").as_str())
    );
    Ok(())
}

#[test]
fn save_and_reload_on_real_filesystem() -> TestResult {
    let dir = tempdir()?;
    let fs = RealFileSystem;
    let input = dir.path().join("src/main.ts");
    let output = dir.path().join("dist/main.js");
    fs.write(&input, b"let x = 1;")?;
    fs.write(&output, b"var x = 1;")?;
    let path = dir.path().join(".unitdag/cache/app.json");

    let mut cache = IncrementalCache::load(&fs, &path, dir.path());
    assert!(cache.should_rebuild(&fs, std::slice::from_ref(&input)));
    cache.register_output(&output);
    assert!(cache.save(&fs));

    let mut reloaded = IncrementalCache::load(&fs, &path, dir.path());
    assert!(!reloaded.should_rebuild(&fs, std::slice::from_ref(&input)));
    Ok(())
}

#[test]
fn inputs_exclude_output_and_include_dependency_outputs() -> TestResult {
    let cfg = ConfigFileBuilder::new()
        .with_unit("core", UnitConfigBuilder::new("libs/core").language("tsc").build())
        .with_unit(
            "app",
            UnitConfigBuilder::new("apps/web")
                .dep("core")
                .input("src/**")
                .language("tsc")
                .build(),
        )
        .build();
    let w = mock_workspace(
        &cfg,
        &[
            ("libs/core/src/index.ts", "core"),
            ("libs/core/dist/index.js", "compiled core"),
            ("apps/web/src/main.ts", "main"),
            ("apps/web/README.md", "docs"),
            ("apps/web/dist/main.js", "compiled main"),
        ],
    );
    let core = w.ctx.registry.require("core")?;
    let app = w.ctx.registry.require("app")?;

    let core_inputs = collect_inputs(&w.fs, &core, &w.ctx.cache_dir())?;
    assert_eq!(core_inputs, vec![ws("libs/core/src/index.ts")]);

    let app_inputs = collect_inputs(&w.fs, &app, &w.ctx.cache_dir())?;
    assert_eq!(
        app_inputs,
        vec![ws("apps/web/src/main.ts"), ws("libs/core/dist/index.js")]
    );
    Ok(())
}

#[cfg(unix)]
#[test]
fn cache_keys_resolve_through_a_symlinked_workspace() -> TestResult {
    use unitdag::watch::path_utils::relative_str;

    let dir = tempdir()?;
    let real = dir.path().join("real");
    std::fs::create_dir_all(real.join("src"))?;
    std::fs::write(real.join("src/a.ts"), "a")?;
    let link = dir.path().join("link");
    std::os::unix::fs::symlink(&real, &link)?;

    let rel = relative_str(&RealFileSystem, &link, &real.join("src/a.ts"));
    assert_eq!(rel.as_deref(), Some("src/a.ts"));

    let mock = MockFileSystem::new();
    assert_eq!(relative_str(&mock, &link, &real.join("src/a.ts")), None);
    Ok(())
}
