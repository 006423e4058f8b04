// src/watch/cache.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::cache::{digest_of_file_if_exists, Digest};
use crate::fs::FileSystem;

/// Last seen digest of every watched file.
///
/// Lets the dispatcher drop `Changed` events that did not change content
/// (editors that rewrite a file on save, `touch`).
#[derive(Debug, Default)]
pub struct FileCache {
    digests: HashMap<PathBuf, Digest>,
}

impl FileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a known digest without hashing (e.g. from a cache record).
    pub fn seed(&mut self, path: impl Into<PathBuf>, digest: Digest) {
        self.digests.insert(path.into(), digest);
    }

    /// Re-hash `path` and report whether its content differs from the last
    /// seen digest. Unknown or unreadable files count as changed.
    pub fn has_changed(&mut self, fs: &dyn FileSystem, path: &Path) -> bool {
        match digest_of_file_if_exists(fs, path) {
            Ok(Some(digest)) => {
                let changed = self.digests.get(path) != Some(&digest);
                self.digests.insert(path.to_path_buf(), digest);
                changed
            }
            Ok(None) => {
                self.forget(path);
                true
            }
            Err(err) => {
                warn!(?path, error = %err, "failed to hash watched file");
                self.forget(path);
                true
            }
        }
    }

    pub fn forget(&mut self, path: &Path) {
        if self.digests.remove(path).is_some() {
            debug!(?path, "dropped cached digest");
        }
    }

    pub fn len(&self) -> usize {
        self.digests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }
}
