// src/exec/mod.rs

//! Step execution layer.
//!
//! - [`backend`] provides the `StepExecutor` trait that the pipeline runner
//!   talks to, so tests can swap in a fake.
//! - [`toolchain`] is the production executor: it runs external tools with
//!   `tokio::process::Command` and the in-process steps from [`staging`].
//! - [`diagnostics`] turns tool output into `CompileError`s.

pub mod backend;
pub mod diagnostics;
pub mod staging;
pub mod toolchain;

pub use backend::{StepExecutor, StepInvocation, StepReport, StepResult};
pub use toolchain::ToolchainExecutor;
