// src/exec/diagnostics.rs

//! Turn tool output into `CompileError`s.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::errors::CompileError;

/// `src/app.ts(12,5): error TS2322: ...`
static PAREN_STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<file>[^\s(:][^(:]*)\((?P<line>\d+),\d+\):\s*(?P<msg>.+)$")
        .expect("valid diagnostic regex")
});

/// `src/style.scss:3:14: expected ";"` (column optional)
static COLON_STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<file>[^\s:][^:]*):(?P<line>\d+):(?:\d+:)?\s*(?P<msg>.+)$")
        .expect("valid diagnostic regex")
});

/// Extract `file/line/message` diagnostics from tool output.
///
/// Relative file paths are resolved against `root`.
pub fn parse_diagnostics(task: &str, root: &Path, output: &str) -> Vec<CompileError> {
    output
        .lines()
        .map(str::trim)
        .filter_map(|line| {
            let caps = PAREN_STYLE
                .captures(line)
                .or_else(|| COLON_STYLE.captures(line))?;
            let file = Path::new(&caps["file"]);
            let file = if file.is_absolute() {
                file.to_path_buf()
            } else {
                root.join(file)
            };
            let line_no = caps["line"].parse::<u32>().ok();
            Some(CompileError::new(task, caps["msg"].trim()).at(file, line_no))
        })
        .collect()
}

/// Diagnostics for a failed tool run; falls back to one error carrying the
/// exit status and the last non-empty output line.
pub fn failure_diagnostics(
    task: &str,
    root: &Path,
    cmd: &str,
    exit_code: Option<i32>,
    output: &str,
) -> Vec<CompileError> {
    let parsed = parse_diagnostics(task, root, output);
    if !parsed.is_empty() {
        return parsed;
    }

    let status = exit_code
        .map(|c| c.to_string())
        .unwrap_or_else(|| "signal".to_string());
    let last = output
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("no output");
    vec![CompileError::new(
        task,
        format!("`{cmd}` exited with status {status}: {last}"),
    )]
}
