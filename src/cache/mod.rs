// src/cache/mod.rs

//! Content digests and the per-unit incremental change cache.

pub mod digest;
pub mod inputs;
pub mod record;

pub use digest::{digest_of, digest_of_file_if_exists, digest_of_paths, digest_of_reader, Digest};
pub use inputs::collect_inputs;
pub use record::{CacheError, CacheRecord, IncrementalCache};
