// src/cache/record.rs

//! Per-unit incremental cache record.
//!
//! On disk this is one JSON document per unit:
//!
//! ```json
//! { "libs/core/src/a.ts": "<digest>", "outputFiles": { "libs/core/dist/a.js": "<digest>" } }
//! ```
//!
//! Cache I/O never fails the caller: unreadable or malformed files load as
//! an empty record, and a failed save only logs a warning.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cache::digest::{digest_of_file_if_exists, Digest};
use crate::fs::FileSystem;
use crate::watch::path_utils::relative_str;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    #[serde(flatten)]
    pub input_digests: BTreeMap<String, Digest>,
    #[serde(rename = "outputFiles", default)]
    pub output_digests: BTreeMap<String, Digest>,
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache file {path:?}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("malformed cache file {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Loaded record plus the staging copy written by [`IncrementalCache::save`].
#[derive(Debug)]
pub struct IncrementalCache {
    path: PathBuf,
    /// Directory that record keys are relative to.
    base: PathBuf,
    /// True when nothing was loaded from disk.
    fresh: bool,
    record: CacheRecord,
    staging: CacheRecord,
    outputs: BTreeSet<PathBuf>,
}

impl IncrementalCache {
    /// Load the record at `path`; a missing or malformed file yields an
    /// empty record.
    pub fn load(fs: &dyn FileSystem, path: impl Into<PathBuf>, base: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (record, fresh) = match read_record(fs, &path) {
            Ok(Some(record)) => (record, false),
            Ok(None) => {
                debug!(?path, "no cache file yet");
                (CacheRecord::default(), true)
            }
            Err(err) => {
                warn!(error = %err, "ignoring unreadable cache file");
                (CacheRecord::default(), true)
            }
        };

        Self {
            path,
            base: base.into(),
            fresh,
            record,
            staging: CacheRecord::default(),
            outputs: BTreeSet::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The record as loaded from disk.
    pub fn record(&self) -> &CacheRecord {
        &self.record
    }

    /// Recorded input digests keyed by absolute path.
    pub fn recorded_inputs(&self) -> impl Iterator<Item = (PathBuf, &Digest)> + '_ {
        self.record
            .input_digests
            .iter()
            .map(|(key, digest)| (self.resolve(key), digest))
    }

    /// The record that `save` will write (inputs are staged by
    /// [`has_any_input_changed`](Self::has_any_input_changed)).
    pub fn staging(&self) -> &CacheRecord {
        &self.staging
    }

    fn key(&self, fs: &dyn FileSystem, path: &Path) -> String {
        relative_str(fs, &self.base, path)
            .unwrap_or_else(|| path.to_string_lossy().replace('\\', "/"))
    }

    fn resolve(&self, key: &str) -> PathBuf {
        let path = Path::new(key);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base.join(path)
        }
    }

    /// Compare every current input against the loaded record and stage the
    /// new digests.
    ///
    /// A path that is new, modified, unreadable, or recorded before but no
    /// longer present counts as a change. Paths recorded as outputs are not
    /// treated as inputs.
    pub fn has_any_input_changed(&mut self, fs: &dyn FileSystem, inputs: &[PathBuf]) -> bool {
        let mut changed = false;
        let mut current = BTreeMap::new();

        for path in inputs {
            let key = self.key(fs, path);
            if self.record.output_digests.contains_key(&key) {
                continue;
            }
            match digest_of_file_if_exists(fs, path) {
                Ok(Some(digest)) => {
                    if self.record.input_digests.get(&key) != Some(&digest) {
                        debug!(input = %key, "input changed");
                        changed = true;
                    }
                    current.insert(key, digest);
                }
                Ok(None) => {
                    debug!(input = %key, "input vanished while hashing");
                    changed = true;
                }
                Err(err) => {
                    warn!(input = %key, error = %err, "failed to hash input; treating as changed");
                    changed = true;
                }
            }
        }

        if let Some(removed) = self
            .record
            .input_digests
            .keys()
            .find(|k| !current.contains_key(*k))
        {
            debug!(input = %removed, "input removed");
            changed = true;
        }

        self.staging.input_digests = current;
        changed
    }

    /// Whether any previously recorded output was modified or deleted.
    pub fn has_any_output_changed(&self, fs: &dyn FileSystem) -> bool {
        for (key, recorded) in &self.record.output_digests {
            let path = self.resolve(key);
            match digest_of_file_if_exists(fs, &path) {
                Ok(Some(digest)) if &digest == recorded => {}
                Ok(Some(_)) => {
                    debug!(output = %key, "output modified externally");
                    return true;
                }
                Ok(None) => {
                    debug!(output = %key, "output missing");
                    return true;
                }
                Err(err) => {
                    warn!(output = %key, error = %err, "failed to hash output; treating as changed");
                    return true;
                }
            }
        }
        false
    }

    /// `true` unless a record exists and neither inputs nor outputs changed.
    pub fn should_rebuild(&mut self, fs: &dyn FileSystem, inputs: &[PathBuf]) -> bool {
        let inputs_changed = self.has_any_input_changed(fs, inputs);
        let outputs_changed = self.has_any_output_changed(fs);
        self.fresh || inputs_changed || outputs_changed
    }

    /// Record `path` as an output of this run; it is hashed at save time.
    pub fn register_output(&mut self, path: impl Into<PathBuf>) {
        self.outputs.insert(path.into());
    }

    /// Hash the registered outputs and overwrite the cache file.
    ///
    /// Only call this after a run that reported no errors. Returns whether
    /// the record was written.
    pub fn save(mut self, fs: &dyn FileSystem) -> bool {
        let mut output_digests = BTreeMap::new();
        for path in &self.outputs {
            match digest_of_file_if_exists(fs, path) {
                Ok(Some(digest)) => {
                    output_digests.insert(self.key(fs, path), digest);
                }
                Ok(None) => debug!(?path, "registered output was not produced"),
                Err(err) => warn!(?path, error = %err, "failed to hash output"),
            }
        }
        for key in output_digests.keys() {
            self.staging.input_digests.remove(key);
        }
        self.staging.output_digests = output_digests;

        match write_record(fs, &self.path, &self.staging) {
            Ok(()) => {
                info!(
                    path = ?self.path,
                    inputs = self.staging.input_digests.len(),
                    outputs = self.staging.output_digests.len(),
                    "saved cache record"
                );
                true
            }
            Err(err) => {
                warn!(error = %err, "failed to save cache record");
                false
            }
        }
    }
}

fn read_record(fs: &dyn FileSystem, path: &Path) -> Result<Option<CacheRecord>, CacheError> {
    if !fs.exists(path) {
        return Ok(None);
    }
    let bytes = fs.read(path).map_err(|err| CacheError::Io {
        path: path.to_path_buf(),
        message: format!("{err:#}"),
    })?;
    let record = serde_json::from_slice(&bytes).map_err(|source| CacheError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(record))
}

fn write_record(fs: &dyn FileSystem, path: &Path, record: &CacheRecord) -> Result<(), CacheError> {
    let bytes = serde_json::to_vec_pretty(record).map_err(|source| CacheError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs.write(path, &bytes).map_err(|err| CacheError::Io {
        path: path.to_path_buf(),
        message: format!("{err:#}"),
    })
}
