// src/cache/inputs.rs

//! Which files feed a unit's incremental cache.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::fs::{walk_files, FileSystem};
use crate::unit::Unit;
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::build_globset;

/// Files under the unit root (filtered by its `inputs` globs, excluding its
/// output root and `cache_dir`) plus every file in each direct dependency's
/// output root. Sorted and deduplicated.
pub fn collect_inputs(fs: &dyn FileSystem, unit: &Unit, cache_dir: &Path) -> Result<Vec<PathBuf>> {
    let filter = if unit.inputs().is_empty() {
        None
    } else {
        Some(build_globset(unit.inputs())?)
    };

    let mut files = Vec::new();
    for file in walk_files(fs, unit.root())? {
        if file.starts_with(unit.output()) || file.starts_with(cache_dir) {
            continue;
        }
        if let Some(filter) = &filter {
            match relative_str(fs, unit.root(), &file) {
                Some(rel) if filter.is_match(&rel) => {}
                _ => continue,
            }
        }
        files.push(file);
    }

    for dep in unit.dependencies() {
        files.extend(walk_files(fs, dep.output())?);
    }

    files.sort();
    files.dedup();
    Ok(files)
}
