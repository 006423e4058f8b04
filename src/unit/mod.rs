// src/unit/mod.rs

//! Units and the unit registry.
//!
//! - [`descriptors`] holds the typed per-step configuration of a unit.
//! - [`registry`] holds the deduplicated `name -> Unit` table.

pub mod descriptors;
pub mod registry;

pub use descriptors::{
    AfterBuildStep, CopyDepsArtifacts, DropStep, LanguageStep, LintStep, NativeStep,
    ParserStep, SchemaStep, StaticFile, StyleStep, TaskDescriptorSet, TemplateStep,
};
pub use registry::{Unit, UnitDecl, UnitRegistry};
