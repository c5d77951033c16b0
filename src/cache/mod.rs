//! On-disk response cache
//!
//! Maps a request URL to the response body fetched for it. Keys are the first
//! 128 bits of the URL's SHA-256 digest, hex encoded; the first character picks a
//! bucket directory and the rest is the file name:
//!
//! ```text
//! <root>/3/f2a9c0...e1
//! ```
//!
//! Entries are never evicted and `put` never overwrites, so the first writer of
//! a key wins. Only [`Cache::replace`] (used by the refresh policy) rewrites an
//! existing entry.

use crate::ScrapeError;
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Hex characters in a cache key (128 bits)
const KEY_LEN: usize = 32;

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Content-addressed store of response bodies
#[derive(Debug, Clone)]
pub struct Cache {
    root: PathBuf,
}

impl Cache {
    /// Creates a cache rooted at `root`; the directory is created lazily on first write
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Derives the cache key for a URL
    pub fn key_for(url: &str) -> String {
        let digest = Sha256::digest(url.as_bytes());
        let mut key = hex::encode(digest);
        key.truncate(KEY_LEN);
        key
    }

    /// Path of the entry for `url`: bucket directory from the first key character
    pub fn path_for(&self, url: &str) -> PathBuf {
        let key = Self::key_for(url);
        let (bucket, name) = key.split_at(1);
        self.root.join(bucket).join(name)
    }

    /// Returns the cached body for `url`, if any
    pub fn get(&self, url: &str) -> Result<Option<Vec<u8>>, ScrapeError> {
        let path = self.path_for(url);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ScrapeError::Cache { path, source }),
        }
    }

    /// Stores `body` for `url` unless an entry already exists
    ///
    /// Returns `true` if this call created the entry. Concurrent writers of the
    /// same key race safely: the entry is published with a hard link, which
    /// fails if another writer got there first.
    pub fn put(&self, url: &str, body: &[u8]) -> Result<bool, ScrapeError> {
        let path = self.path_for(url);
        if path.exists() {
            return Ok(false);
        }

        let tmp = self.write_temp(&path, body)?;
        let created = match std::fs::hard_link(&tmp, &path) {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => false,
            Err(source) => {
                let _ = std::fs::remove_file(&tmp);
                return Err(ScrapeError::Cache { path, source });
            }
        };
        let _ = std::fs::remove_file(&tmp);

        Ok(created)
    }

    /// Stores `body` for `url`, replacing any existing entry
    pub fn replace(&self, url: &str, body: &[u8]) -> Result<(), ScrapeError> {
        let path = self.path_for(url);
        let tmp = self.write_temp(&path, body)?;
        std::fs::rename(&tmp, &path).map_err(|source| {
            let _ = std::fs::remove_file(&tmp);
            ScrapeError::Cache { path, source }
        })
    }

    /// Writes `body` to a unique sibling of `path` and returns the temp path
    fn write_temp(&self, path: &Path, body: &[u8]) -> Result<PathBuf, ScrapeError> {
        let dir = path.parent().unwrap_or(&self.root);
        std::fs::create_dir_all(dir).map_err(|source| ScrapeError::Cache {
            path: dir.to_path_buf(),
            source,
        })?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let tmp = dir.join(format!(
            ".{}.{}.{}.tmp",
            file_name,
            std::process::id(),
            TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        std::fs::write(&tmp, body).map_err(|source| ScrapeError::Cache {
            path: tmp.clone(),
            source,
        })?;

        Ok(tmp)
    }
}
