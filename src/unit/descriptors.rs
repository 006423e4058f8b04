// src/unit/descriptors.rs

//! Typed per-unit build step descriptors.
//!
//! A [`TaskDescriptorSet`] has one optional field per step kind. The presence
//! of a field is the only thing that puts the step into the unit's pipeline;
//! descriptors are immutable once the unit is registered.

use serde::Deserialize;

use crate::types::LintReport;

/// `[[unit.<name>.static_files]]` copy directive.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StaticFile {
    /// File or glob, relative to the unit root.
    pub source: String,
    /// Destination, relative to the unit root. A directory when `source` is a glob.
    pub dest: String,
    /// Copy the file again whenever it changes in watch mode.
    #[serde(default)]
    pub watch: bool,
}

/// Schema/IDL compilation (generates language source).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SchemaStep {
    pub cmd: String,
    #[serde(default)]
    pub sources: Vec<String>,
}

/// External native toolchain invocation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NativeStep {
    pub cmd: String,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StyleStep {
    pub cmd: String,
    #[serde(default)]
    pub sources: Vec<String>,
    /// Output directory, relative to the unit root.
    pub dest: Option<String>,
    /// Output bundle file name.
    pub name: Option<String>,
}

/// Template prefetching (inlines templates into the language build).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TemplateStep {
    pub cmd: String,
    #[serde(default)]
    pub roots: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
pub struct LintStep {
    /// Lint command; when absent the lint task succeeds without running anything.
    pub cmd: Option<String>,
    #[serde(default)]
    pub report: LintReport,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LanguageStep {
    pub cmd: String,
    pub target: Option<String>,
    /// Emit declaration files alongside the compiled output.
    #[serde(default)]
    pub declaration: bool,
    pub out_name: Option<String>,
    #[serde(default)]
    pub lint: LintStep,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ParserStep {
    pub cmd: String,
    pub grammar: String,
    pub dest: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AfterBuildStep {
    pub cmd: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CopyDepsArtifacts {
    /// Directory (relative to the unit root) that receives one sub-directory
    /// per dependency.
    #[serde(default = "default_deps_dest")]
    pub dest: String,
}

fn default_deps_dest() -> String {
    "deps".to_string()
}

/// Publish/drop configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DropStep {
    /// Target directories, relative to the unit root.
    pub destinations: Vec<String>,
    /// Globs (relative to the unit root) selecting the files to publish.
    /// Defaults to everything under the unit's output root.
    #[serde(default)]
    pub sources: Vec<String>,
    /// When set, the matched files are concatenated into this file name.
    pub join: Option<String>,
    /// Re-publish when a source changes in watch mode. The unit's own output
    /// root is then watched instead of excluded.
    #[serde(default)]
    pub watch: bool,
}

/// Every step a unit may request. Field order here has no meaning; pipeline
/// ordering is decided by the composer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
pub struct TaskDescriptorSet {
    #[serde(default)]
    pub static_files: Option<Vec<StaticFile>>,
    #[serde(default)]
    pub schema: Option<SchemaStep>,
    #[serde(default)]
    pub native: Option<NativeStep>,
    #[serde(default)]
    pub style: Option<StyleStep>,
    #[serde(default)]
    pub templates: Option<TemplateStep>,
    #[serde(default)]
    pub language: Option<LanguageStep>,
    #[serde(default)]
    pub parser: Option<ParserStep>,
    #[serde(default)]
    pub after_build: Option<AfterBuildStep>,
    #[serde(default)]
    pub copy_deps_artifacts: Option<CopyDepsArtifacts>,
    #[serde(default)]
    pub drop: Option<DropStep>,
}

impl TaskDescriptorSet {
    /// Post-build runs when either a hook or a dependency-artifact copy is configured.
    pub fn has_post_build(&self) -> bool {
        self.after_build.is_some() || self.copy_deps_artifacts.is_some()
    }

    /// Drop configuration that takes part in watch mode.
    pub fn watched_drop(&self) -> Option<&DropStep> {
        self.drop.as_ref().filter(|d| d.watch)
    }

    /// Static file directives that should be re-copied on change.
    pub fn watched_static_files(&self) -> impl Iterator<Item = &StaticFile> {
        self.static_files
            .iter()
            .flatten()
            .filter(|f| f.watch)
    }
}
