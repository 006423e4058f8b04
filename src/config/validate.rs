// src/config/validate.rs

use globset::Glob;
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, UnitdagError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = UnitdagError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let order = validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.settings, raw.unit, order))
    }
}

/// Validate and return the dependency-first unit order.
fn validate_raw_config(cfg: &RawConfigFile) -> Result<Vec<String>> {
    ensure_has_units(cfg)?;
    validate_settings(cfg)?;
    validate_units(cfg)?;
    validate_dependencies(cfg)?;
    dependency_order(cfg)
}

fn ensure_has_units(cfg: &RawConfigFile) -> Result<()> {
    if cfg.unit.is_empty() {
        return Err(UnitdagError::ConfigError(
            "config must contain at least one [unit.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_settings(cfg: &RawConfigFile) -> Result<()> {
    if cfg.settings.idle_delay_ms == 0 {
        return Err(UnitdagError::ConfigError(
            "[settings].idle_delay_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.settings.output_dir.trim().is_empty() {
        return Err(UnitdagError::ConfigError(
            "[settings].output_dir must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_units(cfg: &RawConfigFile) -> Result<()> {
    for (name, unit) in cfg.unit.iter() {
        if unit.root.trim().is_empty() {
            return Err(UnitdagError::ConfigError(format!(
                "unit '{}' must declare a non-empty `root`",
                name
            )));
        }

        let steps = &unit.steps;
        let globs = unit
            .inputs
            .iter()
            .chain(unit.watch.includes.iter())
            .chain(steps.schema.iter().flat_map(|s| s.sources.iter()))
            .chain(steps.style.iter().flat_map(|s| s.sources.iter()))
            .chain(steps.drop.iter().flat_map(|d| d.sources.iter()))
            .chain(steps.static_files.iter().flatten().map(|f| &f.source));

        for pattern in globs {
            if let Err(err) = Glob::new(pattern) {
                return Err(UnitdagError::ConfigError(format!(
                    "unit '{}' has invalid glob '{}': {}",
                    name, pattern, err
                )));
            }
        }

        if let Some(drop) = &steps.drop {
            if drop.destinations.is_empty() {
                return Err(UnitdagError::ConfigError(format!(
                    "unit '{}' declares `drop` without any destinations",
                    name
                )));
            }
        }
    }
    Ok(())
}

fn validate_dependencies(cfg: &RawConfigFile) -> Result<()> {
    for (name, unit) in cfg.unit.iter() {
        for dep in unit.deps.iter() {
            if dep == name {
                return Err(UnitdagError::ConfigError(format!(
                    "unit '{}' cannot depend on itself in `deps`",
                    name
                )));
            }
            if !cfg.unit.contains_key(dep) {
                return Err(UnitdagError::ConfigError(format!(
                    "unit '{}' has unknown dependency '{}' in `deps`",
                    name, dep
                )));
            }
        }
    }
    Ok(())
}

fn dependency_order(cfg: &RawConfigFile) -> Result<Vec<String>> {
    // Edge direction: dep -> unit, so a topological order lists
    // dependencies before their dependents.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.unit.keys() {
        graph.add_node(name.as_str());
    }

    for (name, unit) in cfg.unit.iter() {
        for dep in unit.deps.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(order) => Ok(order.into_iter().map(str::to_string).collect()),
        Err(cycle) => Err(UnitdagError::DependencyCycle(format!(
            "cycle detected in unit dependencies involving unit '{}'",
            cycle.node_id()
        ))),
    }
}
