// src/exec/staging.rs

//! In-process steps: static file staging, dependency artifact copy and
//! publish/drop. These only copy or concatenate files.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::GlobMatcher;
use tracing::{debug, info};

use crate::fs::{walk_files, FileSystem};
use crate::unit::{DropStep, StaticFile, Unit};
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::{is_glob, literal_base, normalize};

/// Copy every static file directive of `unit`.
pub fn stage_static_files(fs: &dyn FileSystem, unit: &Unit) -> Result<Vec<PathBuf>> {
    let mut outputs = Vec::new();
    for directive in unit.descriptors().static_files.iter().flatten() {
        outputs.extend(copy_directive(fs, unit, directive)?);
    }
    debug!(unit = %unit.name(), copied = outputs.len(), "staged static files");
    Ok(outputs)
}

fn copy_directive(fs: &dyn FileSystem, unit: &Unit, directive: &StaticFile) -> Result<Vec<PathBuf>> {
    if !is_glob(&directive.source) {
        let from = unit.root().join(&directive.source);
        let to = unit.root().join(&directive.dest);
        fs.copy(&from, &to)?;
        return Ok(vec![to]);
    }

    let matcher = compile_matcher(&directive.source)?;
    let mut outputs = Vec::new();
    for file in walk_files(fs, unit.root())? {
        if file.starts_with(unit.output()) {
            continue;
        }
        let Some(rel) = relative_str(fs, unit.root(), &file) else {
            continue;
        };
        if matcher.is_match(&rel) {
            outputs.push(copy_static_file(fs, unit, directive, &file)?);
        }
    }
    Ok(outputs)
}

/// Copy one changed file covered by `directive` to its destination.
pub fn copy_static_file(
    fs: &dyn FileSystem,
    unit: &Unit,
    directive: &StaticFile,
    source: &Path,
) -> Result<PathBuf> {
    let to = if is_glob(&directive.source) {
        let base = unit.root().join(literal_base(&directive.source));
        let rel = source.strip_prefix(&base).unwrap_or(source);
        let rel = if rel.is_absolute() {
            Path::new(rel.file_name().unwrap_or_default())
        } else {
            rel
        };
        unit.root().join(&directive.dest).join(rel)
    } else {
        unit.root().join(&directive.dest)
    };

    fs.copy(source, &to)?;
    debug!(unit = %unit.name(), from = ?source, to = ?to, "copied static file");
    Ok(to)
}

/// Copy each dependency's output tree into `<root>/<dest>/<dep name>/`.
pub fn copy_dependency_artifacts(
    fs: &dyn FileSystem,
    unit: &Unit,
    dest: &str,
) -> Result<Vec<PathBuf>> {
    let mut outputs = Vec::new();
    for dep in unit.dependencies() {
        let target = unit.root().join(dest).join(dep.name());
        for file in walk_files(fs, dep.output())? {
            let rel = file
                .strip_prefix(dep.output())
                .with_context(|| format!("relativizing {:?}", file))?;
            let to = target.join(rel);
            fs.copy(&file, &to)?;
            outputs.push(to);
        }
    }
    debug!(unit = %unit.name(), copied = outputs.len(), "copied dependency artifacts");
    Ok(outputs)
}

/// Publish the unit's artifacts to every drop destination.
pub fn publish(fs: &dyn FileSystem, unit: &Unit, drop: &DropStep) -> Result<Vec<PathBuf>> {
    let files = drop_sources(fs, unit, drop)?;
    let mut outputs = Vec::new();

    for destination in &drop.destinations {
        let destination = normalize(&unit.root().join(destination));

        if let Some(join) = &drop.join {
            let mut joined = Vec::new();
            for (file, _) in &files {
                joined.extend(fs.read(file)?);
            }
            let to = destination.join(join);
            fs.write(&to, &joined)?;
            outputs.push(to);
            continue;
        }

        for (file, rel) in &files {
            let to = destination.join(rel);
            fs.copy(file, &to)?;
            outputs.push(to);
        }
    }

    info!(
        unit = %unit.name(),
        files = files.len(),
        destinations = drop.destinations.len(),
        "published artifacts"
    );
    Ok(outputs)
}

/// Files selected by a drop configuration, paired with their path relative
/// to the directory their layout is preserved from. Sorted by path.
pub fn drop_sources(
    fs: &dyn FileSystem,
    unit: &Unit,
    drop: &DropStep,
) -> Result<Vec<(PathBuf, PathBuf)>> {
    if drop.sources.is_empty() {
        return walk_files(fs, unit.output())?
            .into_iter()
            .map(|file| {
                let rel = file
                    .strip_prefix(unit.output())
                    .with_context(|| format!("relativizing {:?}", file))?
                    .to_path_buf();
                Ok((file, rel))
            })
            .collect();
    }

    let matchers = drop
        .sources
        .iter()
        .map(|pattern| Ok((compile_matcher(pattern)?, unit.root().join(literal_base(pattern)))))
        .collect::<Result<Vec<_>>>()?;

    let mut selected = Vec::new();
    for file in walk_files(fs, unit.root())? {
        let Some(rel) = relative_str(fs, unit.root(), &file) else {
            continue;
        };
        if let Some((_, base)) = matchers.iter().find(|(m, _)| m.is_match(&rel)) {
            let rel = file.strip_prefix(base).unwrap_or(&file).to_path_buf();
            selected.push((file, rel));
        }
    }
    Ok(selected)
}

fn compile_matcher(pattern: &str) -> Result<GlobMatcher> {
    Ok(globset::Glob::new(pattern)
        .with_context(|| format!("invalid glob pattern: {pattern}"))?
        .compile_matcher())
}
