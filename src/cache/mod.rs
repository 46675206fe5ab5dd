//! Cache module for storing oEmbed responses to disk
//!
//! One file per provider request URL, named by the SHA-256 digest of that URL.
//! Each file holds the Unix timestamp of the write on its first line followed by
//! the raw response body. Reads take a shared file lock and writes an exclusive
//! one, so a reader never sees a half-written entry. Expired entries are never
//! deleted; they are overwritten by the next successful fetch.

mod config;
mod manager;

pub use config::{is_valid_namespace, CacheConfig, DEFAULT_NAMESPACE, DEFAULT_TTL_MINUTES};
pub use manager::{cache_key, is_stale, CacheEntry, CacheError, CacheManager};
