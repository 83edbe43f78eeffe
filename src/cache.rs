//! File-based caching for downloaded feed snapshots.
//!
//! Entries are JSON files with a TTL measured from their modification
//! time. Repository query results are never cached: every audit asks the
//! repository afresh.
//!
//! # Cache Location
//!
//! - Linux: `~/.cache/artifact-audit/`
//! - macOS: `~/Library/Caches/artifact-audit/`
//! - Windows: `%LOCALAPPDATA%\artifact-audit\`
//!
//! # Example
//!
//! ```no_run
//! use artifact_audit::Cache;
//!
//! let cache = Cache::with_ttl_hours(1);
//! cache.set("feed_https://example.com/feed.csv", &"a,b,c".to_string()).unwrap();
//!
//! let value: Option<String> = cache.get("feed_https://example.com/feed.csv");
//! assert_eq!(value.as_deref(), Some("a,b,c"));
//! ```

use anyhow::Result;
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

/// Default cache TTL in hours.
const CACHE_TTL_HOURS: u64 = 1;

/// A file-based cache with TTL support.
pub struct Cache {
    dir: PathBuf,
    ttl: Duration,
}

impl Cache {
    /// Creates a cache in the platform cache directory with the default TTL.
    pub fn new() -> Self {
        Self::with_ttl_hours(CACHE_TTL_HOURS)
    }

    pub fn with_ttl_hours(hours: u64) -> Self {
        Self::with_dir(cache_dir(), Duration::from_secs(hours * 3600))
    }

    /// Creates a cache rooted at an explicit directory.
    pub fn with_dir(dir: PathBuf, ttl: Duration) -> Self {
        Self { dir, ttl }
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)?;
        }
        Ok(())
    }

    /// Converts a cache key to a safe filename.
    fn cache_path(&self, key: &str) -> PathBuf {
        let safe_key: String = key
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", safe_key))
    }

    /// Retrieves a value, or `None` if it is missing or expired.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.cache_path(key);

        if !path.exists() {
            return None;
        }

        if let Ok(modified) = fs::metadata(&path).and_then(|m| m.modified()) {
            if let Ok(elapsed) = SystemTime::now().duration_since(modified) {
                if elapsed > self.ttl {
                    let _ = fs::remove_file(&path);
                    return None;
                }
            }
        }

        let content = fs::read_to_string(&path).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Stores a value as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache directory cannot be created or
    /// the file cannot be written.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        self.ensure_dir()?;
        let path = self.cache_path(key);
        let content = serde_json::to_string(value)?;
        fs::write(&path, content)?;
        Ok(())
    }

    /// Removes all cached entries.
    pub fn clear(&self) -> Result<()> {
        if self.dir.exists() {
            for entry in fs::read_dir(&self.dir)?.flatten() {
                let path = entry.path();
                if path.extension().map(|e| e == "json").unwrap_or(false) {
                    let _ = fs::remove_file(path);
                }
            }
        }
        Ok(())
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns the platform cache directory for this tool.
pub fn cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("artifact-audit")
}
