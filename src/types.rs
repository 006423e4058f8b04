use std::str::FromStr;
use serde::Deserialize;

/// How the lint task is scheduled relative to the language compile.
///
/// - `Parallel`: lint and compile are dispatched together and joined before
///   the pipeline moves on (default).
/// - `Before`: lint runs as its own stage; a lint failure stops the compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LintMode {
    Parallel,
    Before,
}

impl Default for LintMode {
    fn default() -> Self {
        LintMode::Parallel
    }
}

impl FromStr for LintMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "parallel" => Ok(LintMode::Parallel),
            "before" => Ok(LintMode::Before),
            other => Err(format!(
                "invalid lint mode: {other} (expected \"parallel\" or \"before\")"
            )),
        }
    }
}

/// What a lint run does with its findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LintReport {
    /// Findings are reported as errors and fail the pipeline.
    Error,
    /// Findings are logged; the lint task still succeeds.
    Warn,
}

impl Default for LintReport {
    fn default() -> Self {
        LintReport::Error
    }
}

/// Whether a build consults the incremental cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    /// Skip units whose inputs and recorded outputs are unchanged.
    Incremental,
    /// Run every pipeline and rewrite the cache.
    Force,
}
