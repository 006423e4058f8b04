#![allow(dead_code)]

use std::collections::BTreeMap;

use unitdag::config::{ConfigFile, RawConfigFile, SettingsSection, UnitConfig, WatchSection};
use unitdag::errors::Result;
use unitdag::types::LintMode;
use unitdag::unit::{
    AfterBuildStep, CopyDepsArtifacts, DropStep, LanguageStep, LintStep, NativeStep, ParserStep,
    SchemaStep, StaticFile, StyleStep, TaskDescriptorSet, TemplateStep,
};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                settings: SettingsSection::default(),
                unit: BTreeMap::new(),
            },
        }
    }

    pub fn with_unit(mut self, name: &str, unit: UnitConfig) -> Self {
        self.config.unit.insert(name.to_string(), unit);
        self
    }

    pub fn lint_on_build(mut self, mode: LintMode) -> Self {
        self.config.settings.lint_on_build = mode;
        self
    }

    pub fn lint_on_change(mut self, mode: LintMode) -> Self {
        self.config.settings.lint_on_change = mode;
        self
    }

    pub fn idle_delay_ms(mut self, ms: u64) -> Self {
        self.config.settings.idle_delay_ms = ms;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `UnitConfig`.
pub struct UnitConfigBuilder {
    unit: UnitConfig,
}

impl UnitConfigBuilder {
    pub fn new(root: &str) -> Self {
        Self {
            unit: UnitConfig {
                root: root.to_string(),
                deps: Vec::new(),
                output: None,
                inputs: Vec::new(),
                watch: WatchSection::default(),
                steps: TaskDescriptorSet::default(),
            },
        }
    }

    pub fn dep(mut self, name: &str) -> Self {
        self.unit.deps.push(name.to_string());
        self
    }

    pub fn output(mut self, dir: &str) -> Self {
        self.unit.output = Some(dir.to_string());
        self
    }

    pub fn input(mut self, pattern: &str) -> Self {
        self.unit.inputs.push(pattern.to_string());
        self
    }

    pub fn watch_include(mut self, pattern: &str) -> Self {
        self.unit.watch.includes.push(pattern.to_string());
        self
    }

    pub fn static_file(mut self, source: &str, dest: &str, watch: bool) -> Self {
        self.unit
            .steps
            .static_files
            .get_or_insert_with(Vec::new)
            .push(StaticFile {
                source: source.to_string(),
                dest: dest.to_string(),
                watch,
            });
        self
    }

    pub fn schema(mut self, cmd: &str) -> Self {
        self.unit.steps.schema = Some(SchemaStep {
            cmd: cmd.to_string(),
            sources: Vec::new(),
        });
        self
    }

    pub fn native(mut self, cmd: &str) -> Self {
        self.unit.steps.native = Some(NativeStep {
            cmd: cmd.to_string(),
            args: Vec::new(),
        });
        self
    }

    pub fn style(mut self, cmd: &str) -> Self {
        self.unit.steps.style = Some(StyleStep {
            cmd: cmd.to_string(),
            sources: Vec::new(),
            dest: None,
            name: None,
        });
        self
    }

    pub fn templates(mut self, cmd: &str) -> Self {
        self.unit.steps.templates = Some(TemplateStep {
            cmd: cmd.to_string(),
            roots: Vec::new(),
        });
        self
    }

    pub fn language(mut self, cmd: &str) -> Self {
        self.unit.steps.language = Some(LanguageStep {
            cmd: cmd.to_string(),
            target: None,
            declaration: false,
            out_name: None,
            lint: LintStep::default(),
        });
        self
    }

    /// Set the lint command of the language step (adds one if missing).
    pub fn lint(mut self, cmd: &str) -> Self {
        if self.unit.steps.language.is_none() {
            self = self.language("true");
        }
        if let Some(language) = self.unit.steps.language.as_mut() {
            language.lint.cmd = Some(cmd.to_string());
        }
        self
    }

    pub fn parser(mut self, cmd: &str, grammar: &str, dest: &str) -> Self {
        self.unit.steps.parser = Some(ParserStep {
            cmd: cmd.to_string(),
            grammar: grammar.to_string(),
            dest: dest.to_string(),
        });
        self
    }

    pub fn after_build(mut self, cmd: &str) -> Self {
        self.unit.steps.after_build = Some(AfterBuildStep {
            cmd: cmd.to_string(),
        });
        self
    }

    pub fn copy_deps_artifacts(mut self, dest: &str) -> Self {
        self.unit.steps.copy_deps_artifacts = Some(CopyDepsArtifacts {
            dest: dest.to_string(),
        });
        self
    }

    pub fn drop(mut self, destinations: &[&str], join: Option<&str>, watch: bool) -> Self {
        self.unit.steps.drop = Some(DropStep {
            destinations: destinations.iter().map(|d| d.to_string()).collect(),
            sources: Vec::new(),
            join: join.map(str::to_string),
            watch,
        });
        self
    }

    pub fn build(self) -> UnitConfig {
        self.unit
    }
}
