//! # research-cas — the content-addressable store (C1)
//!
//! A durable mapping from content hash to blob bytes and metadata,
//! persisted as two sibling directories: `blobs/` (raw bytes named by
//! sha256 hex digest) and `meta/` (JSON sidecars named `<sha256>.json`).
//!
//! The store provides no cross-process locking. Concurrent writers are
//! permitted; the last metadata writer wins. `put` is a no-op on blob data
//! if the key's blob already exists on disk — metadata is always
//! (re)written. Read failures (missing file, corrupt JSON) are treated as
//! cache misses, never as hard errors: callers cannot tell a miss from
//! corruption, by design (spec.md §4.1).

use research_types::{BlobKey, BlobMeta};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can still escape the CAS: only real I/O failures on the
/// write path, since reads degrade to `None` rather than erroring.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CasError {
    /// Failed to create the store's root directories.
    #[error("failed to initialize CAS at {path}: {source}")]
    Init {
        /// Root path that failed to initialize.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Failed to write a blob or its metadata sidecar.
    #[error("failed to write {what} for {key}: {source}")]
    Write {
        /// `"blob"` or `"meta"`.
        what: &'static str,
        /// The key being written.
        key: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Compute the sha256 hex digest of `content`.
pub fn hash_content(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

/// A filesystem-backed content-addressable store.
pub struct Cas {
    root: PathBuf,
}

impl Cas {
    /// Open (creating if necessary) a CAS rooted at `root`, with `blobs/`
    /// and `meta/` child directories.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, CasError> {
        let root = root.into();
        for sub in ["blobs", "meta"] {
            let dir = root.join(sub);
            std::fs::create_dir_all(&dir).map_err(|source| CasError::Init {
                path: dir,
                source,
            })?;
        }
        Ok(Self { root })
    }

    fn blob_path(&self, digest: &str) -> PathBuf {
        self.root.join("blobs").join(digest)
    }

    fn meta_path(&self, digest: &str) -> PathBuf {
        self.root.join("meta").join(format!("{digest}.json"))
    }

    /// Store `content` under a key derived from its hash and
    /// `parser_version`, recording `meta`. Idempotent on blob data: a
    /// second `put` with identical content is a no-op for the blob file,
    /// but metadata is always rewritten (last writer wins).
    pub fn put(&self, content: &[u8], mut meta: BlobMeta) -> Result<BlobKey, CasError> {
        let digest = hash_content(content);
        let key = BlobKey::new(&digest, &meta.parser_version);
        meta.size = content.len() as u64;

        let blob_path = self.blob_path(&digest);
        if !blob_path.exists() {
            let tmp = blob_path.with_extension("tmp");
            std::fs::write(&tmp, content).map_err(|source| CasError::Write {
                what: "blob",
                key: key.to_string(),
                source,
            })?;
            std::fs::rename(&tmp, &blob_path).map_err(|source| CasError::Write {
                what: "blob",
                key: key.to_string(),
                source,
            })?;
        }

        let meta_path = self.meta_path(&digest);
        let meta_json = serde_json::to_vec_pretty(&meta).unwrap_or_default();
        std::fs::write(&meta_path, meta_json).map_err(|source| CasError::Write {
            what: "meta",
            key: key.to_string(),
            source,
        })?;

        Ok(key)
    }

    /// Fetch the blob content and metadata for `key`, if present and
    /// readable. Any failure to read or deserialize degrades to `None`
    /// for that half of the pair rather than raising an error.
    pub fn get(&self, key: &BlobKey) -> (Option<Vec<u8>>, Option<BlobMeta>) {
        let digest = key.digest();
        let content = std::fs::read(self.blob_path(digest)).ok();
        let meta = std::fs::read(self.meta_path(digest))
            .ok()
            .and_then(|bytes| serde_json::from_slice::<BlobMeta>(&bytes).ok());
        (content, meta)
    }

    /// Root directory backing this store.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn meta(parser_version: &str) -> BlobMeta {
        BlobMeta::local(0, parser_version)
    }

    #[test]
    fn put_then_get_roundtrips() {
        let dir = tempdir().unwrap();
        let cas = Cas::open(dir.path()).unwrap();
        let key = cas.put(b"hello world", meta("v1")).unwrap();
        let (content, m) = cas.get(&key);
        assert_eq!(content.unwrap(), b"hello world");
        assert_eq!(m.unwrap().parser_version, "v1");
    }

    #[test]
    fn put_is_idempotent_on_blob_data() {
        let dir = tempdir().unwrap();
        let cas = Cas::open(dir.path()).unwrap();
        let key1 = cas.put(b"same bytes", meta("v1")).unwrap();
        let key2 = cas.put(b"same bytes", meta("v1")).unwrap();
        assert_eq!(key1, key2);

        let blob_count = std::fs::read_dir(dir.path().join("blobs"))
            .unwrap()
            .count();
        assert_eq!(blob_count, 1);
    }

    #[test]
    fn different_parser_version_is_a_different_key() {
        let dir = tempdir().unwrap();
        let cas = Cas::open(dir.path()).unwrap();
        let key1 = cas.put(b"same bytes", meta("v1")).unwrap();
        let key2 = cas.put(b"same bytes", meta("v2")).unwrap();
        assert_ne!(key1, key2);
        // But the blob itself is stored once, keyed only by digest.
        let blob_count = std::fs::read_dir(dir.path().join("blobs"))
            .unwrap()
            .count();
        assert_eq!(blob_count, 1);
    }

    #[test]
    fn missing_key_is_a_clean_miss() {
        let dir = tempdir().unwrap();
        let cas = Cas::open(dir.path()).unwrap();
        let key = BlobKey::new("deadbeef", "v1");
        let (content, meta) = cas.get(&key);
        assert!(content.is_none());
        assert!(meta.is_none());
    }

    #[test]
    fn corrupt_metadata_degrades_to_miss() {
        let dir = tempdir().unwrap();
        let cas = Cas::open(dir.path()).unwrap();
        let key = cas.put(b"payload", meta("v1")).unwrap();
        std::fs::write(dir.path().join("meta").join(format!("{}.json", key.digest())), b"{not json").unwrap();
        let (content, meta) = cas.get(&key);
        assert!(content.is_some());
        assert!(meta.is_none());
    }
}
