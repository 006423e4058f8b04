// src/watch/patterns.rs

//! Glob helpers and the per-unit watch profile.
//!
//! Watch globs are matched against absolute, forward-slash paths. Unit roots
//! are escaped before being joined with a relative pattern, so directory
//! names containing glob metacharacters are matched literally.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::unit::Unit;

/// Whether `pattern` contains glob metacharacters.
pub fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}

/// Split a relative pattern into its literal leading directories and the
/// glob remainder: `assets/img/**/*.png` -> (`assets/img`, `**/*.png`).
fn split_pattern(pattern: &str) -> (PathBuf, String) {
    let mut base = PathBuf::new();
    let mut rest: Vec<&str> = Vec::new();
    for part in pattern.split('/') {
        if rest.is_empty() && !is_glob(part) {
            base.push(part);
        } else {
            rest.push(part);
        }
    }
    (base, rest.join("/"))
}

/// Leading directories of `pattern` that contain no glob metacharacters.
pub fn literal_base(pattern: &str) -> PathBuf {
    split_pattern(pattern).0
}

/// Resolve `.` and `..` components without touching the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other),
        }
    }
    out
}

pub fn path_str(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Absolute glob for `pattern` interpreted relative to `root`.
pub fn absolute_pattern(root: &Path, pattern: &str) -> String {
    let (base, rest) = split_pattern(pattern);
    let base = globset::escape(&path_str(&normalize(&root.join(base))));
    if rest.is_empty() {
        base
    } else {
        format!("{}/{}", base.trim_end_matches('/'), rest)
    }
}

/// Glob matching everything below `dir`.
pub fn subtree_pattern(dir: &Path) -> String {
    absolute_pattern(dir, "**")
}

/// Build a GlobSet from simple string patterns.
pub fn build_globset<S: AsRef<str>>(patterns: &[S]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let pat = pat.as_ref();
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// What one unit's watcher observes.
///
/// - included: the unit root, its `watch.includes`, and the output root of
///   every direct dependency
/// - excluded: the unit's own output root (unless it re-publishes on
///   change) and the cache directory
#[derive(Clone)]
pub struct UnitWatchProfile {
    unit: String,
    roots: Vec<PathBuf>,
    include: GlobSet,
    exclude: GlobSet,
}

impl fmt::Debug for UnitWatchProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitWatchProfile")
            .field("unit", &self.unit)
            .field("roots", &self.roots)
            .finish_non_exhaustive()
    }
}

impl UnitWatchProfile {
    pub fn for_unit(unit: &Unit, cache_dir: &Path) -> Result<Self> {
        let mut roots = vec![unit.root().to_path_buf()];
        let mut include = vec![subtree_pattern(unit.root())];

        for pattern in unit.watch_includes() {
            let base = normalize(&unit.root().join(literal_base(pattern)));
            if !base.starts_with(unit.root()) {
                roots.push(base);
            }
            include.push(absolute_pattern(unit.root(), pattern));
        }

        for dep in unit.dependencies() {
            roots.push(dep.output().to_path_buf());
            include.push(subtree_pattern(dep.output()));
        }

        let mut exclude = vec![subtree_pattern(cache_dir)];
        if unit.descriptors().watched_drop().is_none() {
            exclude.push(subtree_pattern(unit.output()));
        }

        roots.sort();
        roots.dedup();

        Ok(Self {
            unit: unit.name().to_string(),
            roots,
            include: build_globset(&include)
                .with_context(|| format!("building watch globset for unit {}", unit.name()))?,
            exclude: build_globset(&exclude)
                .with_context(|| format!("building exclude globset for unit {}", unit.name()))?,
        })
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Directories to subscribe to.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn matches(&self, path: &Path) -> bool {
        let path = path_str(path);
        self.include.is_match(&path) && !self.exclude.is_match(&path)
    }
}
