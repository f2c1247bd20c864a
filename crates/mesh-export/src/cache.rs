//! Content-addressed artifact cache on disk.
//!
//! Keys are the SHA-256 of the shape source followed by the canonical JSON of
//! the conversion parameters, so the same input converted with the same
//! settings is computed once. Each entry is stored next to the SHA-256 of its
//! bytes and is checked against it when read.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::content_hash::{content_hash, verify_artifact};
use crate::errors::ExportError;

#[derive(Debug, Clone)]
pub struct ArtifactCache {
    cache_dir: PathBuf,
}

impl ArtifactCache {
    /// Open (creating if needed) a cache rooted at `cache_dir`.
    pub fn new(cache_dir: impl AsRef<Path>) -> Result<Self, ExportError> {
        let cache_dir = cache_dir.as_ref().to_path_buf();
        fs::create_dir_all(&cache_dir)?;
        Ok(Self { cache_dir })
    }

    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Key for `source` converted with `params`.
    ///
    /// Parameters go through `serde_json::Value`, whose object keys are
    /// sorted, so field order never changes the key.
    pub fn generate_key<P: Serialize>(source: &[u8], params: &P) -> Result<String, ExportError> {
        let canonical = serde_json::to_vec(&serde_json::to_value(params)?)?;
        let mut hasher = Sha256::new();
        hasher.update(source);
        hasher.update([0u8]);
        hasher.update(&canonical);
        Ok(hex::encode(hasher.finalize()))
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.bin", key))
    }

    fn digest_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.sha256", key))
    }

    pub fn has(&self, key: &str) -> bool {
        self.entry_path(key).is_file()
    }

    /// Cached bytes for `key`. An entry whose bytes no longer match the
    /// stored digest, or that has no digest, is dropped and reported as a miss.
    pub fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>, ExportError> {
        let Some(data) = read_optional(&self.entry_path(key))? else {
            return Ok(None);
        };
        let digest = read_optional(&self.digest_path(key))?;
        let verified = match &digest {
            Some(digest) => verify_artifact(&data, &String::from_utf8_lossy(digest)),
            None => Err(ExportError::HashMismatch {
                expected: String::new(),
                actual: content_hash(&data),
            }),
        };
        if let Err(e) = verified {
            warn!(key = %key, error = %e, "Discarding corrupt cache entry");
            self.remove(key)?;
            return Ok(None);
        }
        Ok(Some(data))
    }

    /// Store bytes under `key`. The digest is written first, then the entry
    /// appears atomically.
    pub fn set_bytes(&self, key: &str, data: &[u8]) -> Result<(), ExportError> {
        self.write_atomic(&self.digest_path(key), content_hash(data).as_bytes())?;
        self.write_atomic(&self.entry_path(key), data)?;
        debug!(key = %key, size = data.len(), "Cached artifact");
        Ok(())
    }

    fn write_atomic(&self, path: &Path, data: &[u8]) -> Result<(), ExportError> {
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        let written = fs::write(&tmp, data).and_then(|()| fs::rename(&tmp, path));
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<(), ExportError> {
        remove_optional(&self.entry_path(key))?;
        remove_optional(&self.digest_path(key))
    }

    /// Return the cached bytes for `key`, or run `produce`, store its output
    /// and return it. Errors from `produce` are passed through and nothing is
    /// stored.
    pub fn get_or_insert_with<E, F>(&self, key: &str, produce: F) -> Result<Vec<u8>, E>
    where
        E: From<ExportError>,
        F: FnOnce() -> Result<Vec<u8>, E>,
    {
        if let Some(hit) = self.get_bytes(key)? {
            debug!(key = %key, size = hit.len(), "Cache hit");
            return Ok(hit);
        }
        let data = produce()?;
        if let Err(e) = self.set_bytes(key, &data) {
            warn!(key = %key, error = %e, "Failed to cache artifact");
        }
        Ok(data)
    }
}

fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, ExportError> {
    match fs::read(path) {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn remove_optional(path: &Path) -> Result<(), ExportError> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}
