// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::LintMode;
use crate::unit::TaskDescriptorSet;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [settings]
/// lint_on_build = "parallel"
/// idle_delay_ms = 1000
///
/// [unit.core]
/// root = "libs/core"
/// language = { cmd = "tsc -p ." }
///
/// [unit.app]
/// root = "apps/web"
/// deps = ["core"]
/// style = { cmd = "sass src:dist/css", sources = ["src/**/*.scss"] }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub settings: SettingsSection,

    /// All units from `[unit.<name>]`, keyed by unit name.
    #[serde(default)]
    pub unit: BTreeMap<String, UnitConfig>,
}

/// Validated configuration.
///
/// Only constructed through `TryFrom<RawConfigFile>`, which guarantees every
/// `deps` entry exists and the dependency graph is acyclic.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub settings: SettingsSection,
    pub unit: BTreeMap<String, UnitConfig>,
    /// Unit names with every dependency listed before its dependents.
    order: Vec<String>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        settings: SettingsSection,
        unit: BTreeMap<String, UnitConfig>,
        order: Vec<String>,
    ) -> Self {
        Self { settings, unit, order }
    }

    pub fn settings(&self) -> &SettingsSection {
        &self.settings
    }

    pub fn units(&self) -> &BTreeMap<String, UnitConfig> {
        &self.unit
    }

    /// Unit names in dependency order (dependencies first).
    pub fn topological_order(&self) -> &[String] {
        &self.order
    }
}

/// `[settings]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SettingsSection {
    /// Scheduling of lint relative to compile in one-shot builds.
    #[serde(default)]
    pub lint_on_build: LintMode,

    /// Scheduling of lint relative to compile when a source file changes.
    #[serde(default)]
    pub lint_on_change: LintMode,

    /// Quiet period before the "idle" notification fires in watch mode.
    #[serde(default = "default_idle_delay_ms")]
    pub idle_delay_ms: u64,

    /// Directory holding one cache file per unit, relative to the config root.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,

    /// Default output root of every unit, relative to the unit root.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    #[serde(default)]
    pub extensions: ExtensionsSection,
}

fn default_idle_delay_ms() -> u64 {
    1000
}

fn default_cache_dir() -> String {
    ".unitdag/cache".to_string()
}

fn default_output_dir() -> String {
    "dist".to_string()
}

impl Default for SettingsSection {
    fn default() -> Self {
        Self {
            lint_on_build: LintMode::default(),
            lint_on_change: LintMode::default(),
            idle_delay_ms: default_idle_delay_ms(),
            cache_dir: default_cache_dir(),
            output_dir: default_output_dir(),
            extensions: ExtensionsSection::default(),
        }
    }
}

/// `[settings.extensions]`: file extensions (without the dot) per file type.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtensionsSection {
    #[serde(default = "default_style_exts")]
    pub style: Vec<String>,
    #[serde(default = "default_schema_exts")]
    pub schema: Vec<String>,
    #[serde(default = "default_language_exts")]
    pub language: Vec<String>,
    #[serde(default = "default_template_exts")]
    pub template: Vec<String>,
}

fn default_style_exts() -> Vec<String> {
    vec!["scss".into(), "less".into(), "css".into()]
}

fn default_schema_exts() -> Vec<String> {
    vec!["proto".into()]
}

fn default_language_exts() -> Vec<String> {
    vec!["ts".into(), "tsx".into()]
}

fn default_template_exts() -> Vec<String> {
    vec!["html".into()]
}

impl Default for ExtensionsSection {
    fn default() -> Self {
        Self {
            style: default_style_exts(),
            schema: default_schema_exts(),
            language: default_language_exts(),
            template: default_template_exts(),
        }
    }
}

/// `[unit.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct UnitConfig {
    /// Unit folder, relative to the config root.
    pub root: String,

    /// Names of the units this one depends on, in build order.
    #[serde(default)]
    pub deps: Vec<String>,

    /// Output root override, relative to the unit root.
    #[serde(default)]
    pub output: Option<String>,

    /// Globs (relative to the unit root) whose files feed the incremental
    /// cache. Empty means every file under the root.
    #[serde(default)]
    pub inputs: Vec<String>,

    #[serde(default)]
    pub watch: WatchSection,

    #[serde(flatten)]
    pub steps: TaskDescriptorSet,
}

/// `[unit.<name>.watch]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WatchSection {
    /// Extra globs to watch, relative to the unit root.
    #[serde(default)]
    pub includes: Vec<String>,
}
