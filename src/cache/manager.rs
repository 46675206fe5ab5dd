//! Cache manager for persisting oEmbed responses to disk
//!
//! Provides a `CacheManager` that stores raw payloads in timestamped files and
//! reports whether an entry has outlived the configured TTL.

use chrono::Utc;
use fs2::FileExt;
use sha2::{Digest, Sha256};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use super::CacheConfig;

/// Errors that can occur while reading or writing cache files
///
/// None of these are fatal: callers treat every variant as a cache miss.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Directory or file I/O failed
    #[error("Cache I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file has no parseable timestamp line
    #[error("Malformed cache entry: {}", .0.display())]
    MalformedEntry(PathBuf),

    /// An empty payload was offered for caching
    #[error("Refusing to cache an empty payload")]
    EmptyPayload,

    /// The namespace is not a single plain directory name
    #[error("Invalid cache namespace: '{0}'")]
    InvalidNamespace(String),
}

impl CacheError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// A cache entry read back from disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Digest of the request URL this entry belongs to
    pub key: String,
    /// Unix timestamp (seconds) of the write
    pub written_at: i64,
    /// The cached response body, byte-for-byte as written
    pub payload: Vec<u8>,
}

impl CacheEntry {
    /// Whether this entry has expired at `now` for the given TTL
    pub fn is_stale_at(&self, ttl_minutes: u64, now: i64) -> bool {
        is_stale(self.written_at, ttl_minutes, now)
    }
}

/// Derives the cache key for a canonical request URL (hex SHA-256)
pub fn cache_key(request_url: &str) -> String {
    hex::encode(Sha256::digest(request_url.as_bytes()))
}

/// Returns true if an entry written at `written_at` is expired at `now`
///
/// An entry is still fresh at exactly `written_at + ttl`.
pub fn is_stale(written_at: i64, ttl_minutes: u64, now: i64) -> bool {
    let ttl_secs = i64::try_from(ttl_minutes.saturating_mul(60)).unwrap_or(i64::MAX);
    now > written_at.saturating_add(ttl_secs)
}

/// Manages reading and writing cached oEmbed payloads
///
/// Files live in `config.cache_dir()`. The directory is created lazily on the
/// first write, so a manager for an unwritable location is cheap to build and
/// simply never hits.
#[derive(Debug, Clone)]
pub struct CacheManager {
    config: CacheConfig,
    cache_dir: PathBuf,
}

impl CacheManager {
    /// Creates a new CacheManager for the given configuration
    pub fn new(config: CacheConfig) -> Self {
        let cache_dir = config.cache_dir();
        Self { config, cache_dir }
    }

    /// Directory where cache files are stored
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Returns the path to the cache file for the given key
    pub fn entry_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(key)
    }

    /// Whether `entry` has expired under this manager's TTL
    pub fn is_stale(&self, entry: &CacheEntry) -> bool {
        entry.is_stale_at(self.config.ttl_minutes, Utc::now().timestamp())
    }

    fn check_namespace(&self) -> Result<(), CacheError> {
        if self.config.has_valid_namespace() {
            Ok(())
        } else {
            Err(CacheError::InvalidNamespace(self.config.namespace.clone()))
        }
    }

    /// Ensures the cache directory exists
    fn ensure_dir(&self) -> Result<(), CacheError> {
        fs::create_dir_all(&self.cache_dir).map_err(|e| CacheError::io(&self.cache_dir, e))
    }

    /// Reads the entry stored under `key`
    ///
    /// Returns `Ok(None)` if there is no entry (including when the cache
    /// directory does not exist yet) or if the stored payload is empty.
    /// Holds a shared lock while reading.
    pub fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        self.check_namespace()?;
        let path = self.entry_path(key);
        let mut file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CacheError::io(&path, e)),
        };

        FileExt::lock_shared(&file).map_err(|e| CacheError::io(&path, e))?;
        let mut raw = Vec::new();
        let read = file.read_to_end(&mut raw);
        // Dropping the file would release the lock too
        let _ = FileExt::unlock(&file);
        read.map_err(|e| CacheError::io(&path, e))?;

        // A writer created the file but has not locked it yet
        if raw.is_empty() {
            return Ok(None);
        }

        let (written_at, payload) =
            split_entry(&raw).ok_or_else(|| CacheError::MalformedEntry(path.clone()))?;
        if payload.is_empty() {
            debug!(key, "cache entry has an empty payload, ignoring");
            return Ok(None);
        }

        Ok(Some(CacheEntry {
            key: key.to_string(),
            written_at,
            payload: payload.to_vec(),
        }))
    }

    /// Writes `payload` under `key`, stamped with the current time
    pub fn put(&self, key: &str, payload: &[u8]) -> Result<(), CacheError> {
        self.put_at(key, payload, Utc::now().timestamp())
    }

    /// Writes `payload` under `key` with an explicit write timestamp
    ///
    /// The file is opened without truncation and only emptied once the
    /// exclusive lock is held, so concurrent readers see either the old entry
    /// or the new one. If the write fails partway the file is emptied again
    /// before the lock is released, which readers treat as a miss.
    pub(crate) fn put_at(&self, key: &str, payload: &[u8], written_at: i64) -> Result<(), CacheError> {
        if payload.is_empty() {
            return Err(CacheError::EmptyPayload);
        }
        self.check_namespace()?;
        self.ensure_dir()?;

        let path = self.entry_path(key);
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| CacheError::io(&path, e))?;

        FileExt::lock_exclusive(&file).map_err(|e| CacheError::io(&path, e))?;
        let written = rewrite_entry(&mut file, written_at, payload);
        let _ = FileExt::unlock(&file);
        written.map_err(|e| CacheError::io(&path, e))?;

        debug!(key, bytes = payload.len(), "wrote cache entry");
        Ok(())
    }
}

/// Replaces the file content; leaves the file empty if the write fails
fn rewrite_entry(file: &mut File, written_at: i64, payload: &[u8]) -> io::Result<()> {
    file.set_len(0)?;
    let written = write_entry(file, written_at, payload);
    if written.is_err() {
        let _ = file.set_len(0);
    }
    written
}

fn write_entry<W: Write>(out: &mut W, written_at: i64, payload: &[u8]) -> io::Result<()> {
    out.write_all(format!("{}\n", written_at).as_bytes())?;
    out.write_all(payload)?;
    out.flush()
}

/// Splits raw file content into the timestamp header and the payload
fn split_entry(raw: &[u8]) -> Option<(i64, &[u8])> {
    let eol = raw.iter().position(|&b| b == b'\n')?;
    let header = std::str::from_utf8(&raw[..eol]).ok()?;
    let written_at = header.trim().parse::<i64>().ok()?;
    Some((written_at, &raw[eol + 1..]))
}
