// src/cache/digest.rs

//! Content digests (BLAKE3, lowercase hex).

use std::fmt;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use blake3::Hasher;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::fs::FileSystem;

/// Fixed-length content hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Digest(String);

impl Digest {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<blake3::Hash> for Digest {
    fn from(hash: blake3::Hash) -> Self {
        Digest(hash.to_hex().to_string())
    }
}

pub fn digest_of(bytes: &[u8]) -> Digest {
    blake3::hash(bytes).into()
}

/// Digest a stream without buffering it whole.
pub fn digest_of_reader(mut reader: impl Read) -> io::Result<Digest> {
    let mut hasher = Hasher::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().into())
}

pub fn digest_of_file(fs: &dyn FileSystem, path: &Path) -> Result<Digest> {
    let reader = fs.open_read(path)?;
    digest_of_reader(reader).with_context(|| format!("hashing file {:?}", path))
}

/// Digest of `path`, or `None` when it does not exist.
///
/// A missing file is a normal state (e.g. an output not produced yet) and is
/// never an error.
pub fn digest_of_file_if_exists(fs: &dyn FileSystem, path: &Path) -> Result<Option<Digest>> {
    if !fs.is_file(path) {
        return Ok(None);
    }
    digest_of_file(fs, path).map(Some)
}

/// Aggregate digest over the contents of a set of files.
///
/// The order of `paths` does not matter; missing files are skipped.
pub fn digest_of_paths<I, P>(fs: &dyn FileSystem, paths: I) -> Result<Digest>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut paths: Vec<PathBuf> = paths
        .into_iter()
        .map(|p| p.as_ref().to_path_buf())
        .collect();
    paths.sort();
    paths.dedup();

    let mut hasher = Hasher::new();
    for path in paths {
        if let Some(digest) = digest_of_file_if_exists(fs, &path)? {
            trace!(?path, %digest, "hashed file");
            hasher.update(digest.as_str().as_bytes());
        }
    }
    Ok(hasher.finalize().into())
}
