// src/watch/classify.rs

//! Map a changed path to the work it implies.

use std::path::Path;

use anyhow::{Context, Result};
use globset::{Glob, GlobMatcher, GlobSet};

use crate::config::model::ExtensionsSection;
use crate::context::OrchestratorContext;
use crate::pipeline::composer::language_stages;
use crate::pipeline::{Pipeline, Stage, StepKind};
use crate::unit::{StaticFile, Unit};
use crate::watch::patterns::{absolute_pattern, build_globset, path_str, subtree_pattern};

/// File type as decided by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileClass {
    Style,
    Schema,
    Language,
    Template,
}

impl FileClass {
    /// Classify by the path's extension. Multi-part extensions such as
    /// `d.ts` fall back to their last part.
    pub fn of(path: &Path, extensions: &ExtensionsSection) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        let has = |list: &[String]| list.iter().any(|e| e.trim_start_matches('.') == ext);

        if has(&extensions.style) {
            Some(FileClass::Style)
        } else if has(&extensions.schema) {
            Some(FileClass::Schema)
        } else if has(&extensions.language) {
            Some(FileClass::Language)
        } else if has(&extensions.template) {
            Some(FileClass::Template)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchAction {
    /// Copy the file per this directive; nothing is dispatched.
    CopyStatic(StaticFile),
    /// Re-run the unit's drop step.
    Publish,
    Run(FileClass),
    Unrecognized,
}

/// Per-unit classifier. Path-specific directives (watched static files and
/// drop sources) take precedence over extensions.
#[derive(Debug, Clone)]
pub struct Classifier {
    static_files: Vec<(GlobMatcher, StaticFile)>,
    drop_sources: Option<GlobSet>,
    extensions: ExtensionsSection,
}

impl Classifier {
    pub fn for_unit(unit: &Unit, extensions: &ExtensionsSection) -> Result<Self> {
        let static_files = unit
            .descriptors()
            .watched_static_files()
            .map(|directive| {
                let pattern = absolute_pattern(unit.root(), &directive.source);
                let matcher = Glob::new(&pattern)
                    .with_context(|| format!("invalid static file source: {}", directive.source))?
                    .compile_matcher();
                Ok((matcher, directive.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        let drop_sources = match unit.descriptors().watched_drop() {
            Some(drop) if drop.sources.is_empty() => {
                Some(build_globset(&[subtree_pattern(unit.output())])?)
            }
            Some(drop) => {
                let patterns: Vec<String> = drop
                    .sources
                    .iter()
                    .map(|s| absolute_pattern(unit.root(), s))
                    .collect();
                Some(build_globset(&patterns)?)
            }
            None => None,
        };

        Ok(Self {
            static_files,
            drop_sources,
            extensions: extensions.clone(),
        })
    }

    pub fn classify(&self, path: &Path) -> WatchAction {
        let abs = path_str(path);
        if let Some((_, directive)) = self.static_files.iter().find(|(m, _)| m.is_match(&abs)) {
            return WatchAction::CopyStatic(directive.clone());
        }
        if self.drop_sources.as_ref().is_some_and(|set| set.is_match(&abs)) {
            return WatchAction::Publish;
        }
        match FileClass::of(path, &self.extensions) {
            Some(class) => WatchAction::Run(class),
            None => WatchAction::Unrecognized,
        }
    }
}

/// The minimal pipeline a change of `class` implies for `unit`.
///
/// Steps the unit does not declare are left out, so the result may be
/// empty. Task handles are the same ones the full pipeline uses.
pub fn subsequence_for(ctx: &OrchestratorContext, unit: &Unit, class: FileClass) -> Pipeline {
    let d = unit.descriptors();
    let name = unit.name();
    let task = |kind| ctx.tasks.register(name, kind);
    let mut stages = Vec::new();

    let compile_after = |stages: &mut Vec<Stage>| {
        if d.language.is_some() {
            stages.push(Stage::Single(task(StepKind::Compile)));
        }
    };

    match class {
        FileClass::Style => {
            if d.style.is_some() {
                stages.push(Stage::Single(task(StepKind::Style)));
            }
        }
        FileClass::Schema => {
            if d.schema.is_some() {
                stages.push(Stage::Single(task(StepKind::Schema)));
            }
            compile_after(&mut stages);
        }
        FileClass::Language => {
            if d.language.is_some() {
                let lint = task(StepKind::Lint);
                let compile = task(StepKind::Compile);
                stages.extend(language_stages(lint, compile, ctx.settings.lint_on_change));
            }
        }
        FileClass::Template => {
            if d.templates.is_some() {
                stages.push(Stage::Single(task(StepKind::Templates)));
            }
            compile_after(&mut stages);
        }
    }

    Pipeline::new(stages)
}

/// Single-stage pipeline re-running the unit's drop step.
pub fn publish_subsequence(ctx: &OrchestratorContext, unit: &Unit) -> Pipeline {
    Pipeline::new(vec![Stage::Single(
        ctx.tasks.register(unit.name(), StepKind::Drop),
    )])
}
