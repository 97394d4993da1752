//! Cache storage module
//!
//! Providers cache two kinds of strings: raw response bodies keyed by a URL
//! digest, and derived values keyed by a semantic description of the query.
//! Both go through [`CacheStore`]. Entries carry a time-to-live and read as
//! absent once it has passed. There is no explicit deletion.

use crate::clock::{Clock, SystemClock};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Longest time-to-live any entry is kept for
pub const MAX_CACHE_TTL: Duration = Duration::from_secs(6 * 60 * 60);

/// Errors that can occur during cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    /// Failed to determine cache directory location
    #[error("Failed to determine cache directory location")]
    CacheDirectoryNotFound,

    /// Failed to create or access cache directory
    #[error("Failed to create cache directory at {path}: {source}")]
    DirectoryCreationFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to read cached data
    #[error("Failed to read cache file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write cached data
    #[error("Failed to write cache file {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to deserialize cached data
    #[error("Failed to deserialize cache file {path}: {source}")]
    DeserializationFailed {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Failed to serialize data for caching
    #[error("Failed to serialize data: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Shared key-value store with per-entry time-to-live
///
/// Implementations must tolerate concurrent writers; the last write to a key
/// wins.
pub trait CacheStore: Send + Sync {
    /// Returns the value stored under `key`, or `None` if it is absent or expired
    ///
    /// # Arguments
    ///
    /// * `key` - The full cache key, including the provider prefix
    ///
    /// # Returns
    ///
    /// The stored value if one exists and is still fresh, `None` otherwise.
    /// Returns an error if an entry exists but cannot be read.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// if let Some(rating) = cache.get("omdb_rating:tt0944947")? {
    ///     println!("Cached rating: {}", rating);
    /// }
    /// ```
    fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Stores `value` under `key` for `ttl`
    ///
    /// TTLs above [`MAX_CACHE_TTL`] are clamped. Writing an existing key
    /// replaces the previous value and its expiry.
    ///
    /// # Arguments
    ///
    /// * `key` - The full cache key, including the provider prefix
    /// * `value` - The text to store
    /// * `ttl` - How long the entry stays readable
    ///
    /// # Examples
    ///
    /// ```ignore
    /// cache.put("omdb_rating:tt0944947", "9.2", Duration::from_secs(3600))?;
    /// ```
    fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;
}

/// A single stored value with its absolute expiry
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    /// Full key the entry was written under
    key: String,
    /// Stored value
    value: String,
    /// Unix timestamp (seconds) after which the entry is stale
    expires_at: i64,
}

impl CacheEntry {
    fn new(key: &str, value: &str, ttl: Duration, clock: &dyn Clock) -> Self {
        let ttl = ttl.min(MAX_CACHE_TTL);
        Self {
            key: key.to_string(),
            value: value.to_string(),
            expires_at: clock.now().timestamp() + ttl.as_secs() as i64,
        }
    }

    fn is_fresh(&self, clock: &dyn Clock) -> bool {
        clock.now().timestamp() < self.expires_at
    }
}

/// In-process cache backed by a concurrent hash map
pub struct MemoryCache {
    entries: DashMap<String, CacheEntry>,
    clock: Arc<dyn Clock>,
}

impl MemoryCache {
    /// Creates an empty cache that expires entries against the system clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty cache that expires entries against `clock`
    ///
    /// # Arguments
    ///
    /// * `clock` - The time source used to stamp and expire entries
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let clock = Arc::new(FixedClock::at_date(2000, 2, 1)?);
    /// let cache = MemoryCache::with_clock(clock);
    /// ```
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Number of entries currently held, stale ones included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been stored yet
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        if let Some(entry) = self.entries.get(key) {
            // Serve fresh entries straight from the map
            if entry.is_fresh(self.clock.as_ref()) {
                return Ok(Some(entry.value.clone()));
            }
            // Release the read guard before removing
            drop(entry);
            self.entries.remove(key);
        }
        Ok(None)
    }

    fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let entry = CacheEntry::new(key, value, ttl, self.clock.as_ref());
        self.entries.insert(key.to_string(), entry);
        Ok(())
    }
}

/// Persistent cache storing one JSON file per key
///
/// Files live in the system's standard cache directory unless a directory is
/// given explicitly.
pub struct FileCache {
    /// The directory where cached data is stored
    cache_dir: PathBuf,
    clock: Arc<dyn Clock>,
}

impl FileCache {
    /// Opens or creates a cache storage with the given name
    ///
    /// The cache will be stored in the system's standard cache directory
    /// under a subdirectory named after the application and the provided name.
    /// The name will be sanitized (lowercased, non-alphanumeric characters
    /// replaced with underscores).
    ///
    /// # Arguments
    ///
    /// * `name` - The name for this cache storage, usually a provider prefix
    ///
    /// # Returns
    ///
    /// A Result containing the FileCache or a CacheError
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use imdb_pulse::FileCache;
    ///
    /// let cache = FileCache::open("omdb").unwrap();
    /// println!("caching under {}", cache.cache_dir().display());
    /// ```
    pub fn open(name: &str) -> Result<Self, CacheError> {
        // Get the cache directory for this application
        let proj_dirs = directories::ProjectDirs::from("", "", "imdb_pulse")
            .ok_or(CacheError::CacheDirectoryNotFound)?;

        // Build the full cache directory path from the sanitized name
        let cache_dir = proj_dirs.cache_dir().join(sanitize_name(name));
        Self::open_in(cache_dir, Arc::new(SystemClock))
    }

    /// Opens or creates a cache storage rooted at `cache_dir`
    ///
    /// # Arguments
    ///
    /// * `cache_dir` - The directory to keep entry files in
    /// * `clock` - The time source used to stamp and expire entries
    ///
    /// # Returns
    ///
    /// A Result containing the FileCache or a CacheError if the directory
    /// cannot be created
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use imdb_pulse::{FileCache, SystemClock};
    /// use std::sync::Arc;
    ///
    /// let cache = FileCache::open_in("/tmp/imdb_pulse", Arc::new(SystemClock)).unwrap();
    /// ```
    pub fn open_in(
        cache_dir: impl Into<PathBuf>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, CacheError> {
        let cache_dir = cache_dir.into();

        // Create the directory if it doesn't exist
        fs::create_dir_all(&cache_dir).map_err(|e| CacheError::DirectoryCreationFailed {
            path: cache_dir.clone(),
            source: e,
        })?;

        Ok(Self { cache_dir, clock })
    }

    /// Returns the path to the cache directory
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", sanitize_name(key)))
    }
}

impl CacheStore for FileCache {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let file_path = self.entry_path(key);

        // Check if cache file exists
        if !file_path.exists() {
            return Ok(None);
        }

        // Read the file
        let content = fs::read_to_string(&file_path).map_err(|e| CacheError::ReadFailed {
            path: file_path.clone(),
            source: e,
        })?;

        // Deserialize the JSON
        let entry: CacheEntry =
            serde_json::from_str(&content).map_err(|e| CacheError::DeserializationFailed {
                path: file_path,
                source: e,
            })?;

        // Sanitizing can map distinct keys onto one file
        if entry.key != key || !entry.is_fresh(self.clock.as_ref()) {
            return Ok(None);
        }

        Ok(Some(entry.value))
    }

    fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let file_path = self.entry_path(key);
        let entry = CacheEntry::new(key, value, ttl, self.clock.as_ref());

        // Serialize to JSON
        let content = serde_json::to_string(&entry)?;

        // Write to file
        fs::write(&file_path, content).map_err(|e| CacheError::WriteFailed {
            path: file_path,
            source: e,
        })?;

        Ok(())
    }
}

/// Sanitizes a name for use in file paths
///
/// Converts to lowercase and replaces all characters that are not
/// a-z, 0-9, or hyphen with underscores.
fn sanitize_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MutableClock;

    fn temp_cache_dir() -> PathBuf {
        let name = format!("imdb_pulse_cache_{}", ulid::Ulid::new());
        std::env::temp_dir().join(name)
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("Simple"), "simple");
        assert_eq!(
            sanitize_name("omdb_rating:tt0000001"),
            "omdb_rating_tt0000001"
        );
        assert_eq!(sanitize_name("With-Hyphens"), "with-hyphens");
        assert_eq!(sanitize_name("Special!@#$%"), "special_____");
    }

    #[test]
    fn test_memory_cache_round_trip_and_expiry() {
        let clock = Arc::new(MutableClock::at_date(2000, 2, 1));
        let cache = MemoryCache::with_clock(clock.clone());

        assert_eq!(cache.get("omdb_rating:tt1").unwrap(), None);

        cache
            .put("omdb_rating:tt1", "9.9", Duration::from_secs(60))
            .unwrap();
        assert_eq!(
            cache.get("omdb_rating:tt1").unwrap().as_deref(),
            Some("9.9")
        );

        clock.advance(Duration::from_secs(61));
        assert_eq!(cache.get("omdb_rating:tt1").unwrap(), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_memory_cache_clamps_ttl() {
        let clock = Arc::new(MutableClock::at_date(2000, 2, 1));
        let cache = MemoryCache::with_clock(clock.clone());

        cache
            .put("key", "value", Duration::from_secs(24 * 60 * 60))
            .unwrap();

        clock.advance(MAX_CACHE_TTL + Duration::from_secs(1));
        assert_eq!(cache.get("key").unwrap(), None);
    }

    #[test]
    fn test_memory_cache_last_write_wins() {
        let cache = MemoryCache::new();
        cache.put("key", "first", Duration::from_secs(60)).unwrap();
        cache.put("key", "second", Duration::from_secs(60)).unwrap();
        assert_eq!(cache.get("key").unwrap().as_deref(), Some("second"));
    }

    #[test]
    fn test_file_cache_round_trip_and_expiry() {
        let dir = temp_cache_dir();
        let clock = Arc::new(MutableClock::at_date(2000, 2, 1));
        let cache = FileCache::open_in(&dir, clock.clone()).unwrap();

        assert_eq!(cache.get("myapi_current_season:tt1").unwrap(), None);

        cache
            .put("myapi_current_season:tt1", "2", Duration::from_secs(30))
            .unwrap();
        assert_eq!(
            cache.get("myapi_current_season:tt1").unwrap().as_deref(),
            Some("2")
        );

        clock.advance(Duration::from_secs(31));
        assert_eq!(cache.get("myapi_current_season:tt1").unwrap(), None);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_file_cache_ignores_colliding_keys() {
        let dir = temp_cache_dir();
        let cache = FileCache::open_in(&dir, Arc::new(SystemClock)).unwrap();

        cache.put("a:b", "colon", Duration::from_secs(60)).unwrap();
        assert_eq!(cache.get("a_b").unwrap(), None);
        assert_eq!(cache.get("a:b").unwrap().as_deref(), Some("colon"));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_file_cache_reports_corrupt_entries() {
        let dir = temp_cache_dir();
        let cache = FileCache::open_in(&dir, Arc::new(SystemClock)).unwrap();

        fs::write(dir.join("broken.json"), "not json").unwrap();
        assert!(matches!(
            cache.get("broken"),
            Err(CacheError::DeserializationFailed { .. })
        ));

        fs::remove_dir_all(&dir).ok();
    }
}
