//! Cache configuration
//!
//! Holds the TTL and on-disk location of the oEmbed cache. A `CacheConfig` is
//! built once (usually from CLI flags) and handed to `CacheManager::new`.

use directories::ProjectDirs;
use std::path::PathBuf;

/// Default time-to-live for cached oEmbed payloads (14 days)
pub const DEFAULT_TTL_MINUTES: u64 = 20160;

/// Default cache bucket name, used as the directory under the cache base
pub const DEFAULT_NAMESPACE: &str = "antenna_urls";

/// Settings for the on-disk oEmbed cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// How long an entry stays fresh, in minutes
    pub ttl_minutes: u64,
    /// Logical bucket name; entries live in `base_dir/namespace/`
    pub namespace: String,
    /// Root directory that holds the namespace directory
    pub base_dir: PathBuf,
}

impl CacheConfig {
    /// Creates a config rooted at `base_dir` with the default TTL and namespace
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            ttl_minutes: DEFAULT_TTL_MINUTES,
            namespace: DEFAULT_NAMESPACE.to_string(),
            base_dir: base_dir.into(),
        }
    }

    pub fn with_ttl_minutes(mut self, ttl_minutes: u64) -> Self {
        self.ttl_minutes = ttl_minutes;
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Directory holding the cache files for this namespace
    pub fn cache_dir(&self) -> PathBuf {
        self.base_dir.join(&self.namespace)
    }

    /// Whether `namespace` names a single directory directly under the base
    pub fn has_valid_namespace(&self) -> bool {
        is_valid_namespace(&self.namespace)
    }

    /// XDG-compliant cache base (`~/.cache/antenna/` on Linux)
    ///
    /// Returns `None` if no home directory can be determined.
    pub fn default_base_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "antenna").map(|dirs| dirs.cache_dir().to_path_buf())
    }
}

/// A namespace must be one plain path component
///
/// Empty names, `.`, `..` and anything with a path separator or NUL would put
/// cache files outside `base_dir/<namespace>/`.
pub fn is_valid_namespace(namespace: &str) -> bool {
    !namespace.is_empty()
        && namespace != "."
        && namespace != ".."
        && !namespace.contains(['/', '\\', '\0'])
}

impl Default for CacheConfig {
    fn default() -> Self {
        let base_dir = Self::default_base_dir()
            .unwrap_or_else(|| std::env::temp_dir().join("antenna"));
        Self::new(base_dir)
    }
}
