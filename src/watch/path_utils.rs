// src/watch/path_utils.rs

use std::path::Path;

use crate::fs::FileSystem;

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// Falls back to comparing canonical paths, which covers platforms that
/// report events under a different absolute prefix (e.g. `/private/var` on
/// macOS). Returns `None` if the path is not under `root`.
pub fn relative_str(fs: &dyn FileSystem, root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(rel.to_string_lossy().replace('\\', "/"));
    }

    let (root_canon, path_canon) = (fs.canonicalize(root).ok()?, fs.canonicalize(path).ok()?);
    path_canon
        .strip_prefix(&root_canon)
        .ok()
        .map(|rel| rel.to_string_lossy().replace('\\', "/"))
}
