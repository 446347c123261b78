//! On-disk cache for raw provider responses.
//!
//! Entries are keyed by the SHA-256 of the full request URL and expire
//! after a fixed time-to-live based on file modification time. Cache
//! failures are never fatal: a broken entry is just a miss.

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

/// Lookup counters, shared by every clone of a cache.
#[derive(Debug, Default)]
pub struct CacheStats {
    lookups: AtomicUsize,
    hits: AtomicUsize,
}

impl CacheStats {
    /// Current `(hits, lookups)`.
    pub fn snapshot(&self) -> (usize, usize) {
        (
            self.hits.load(Ordering::Relaxed),
            self.lookups.load(Ordering::Relaxed),
        )
    }
}

/// Time-bounded response cache rooted at a directory.
#[derive(Debug, Clone)]
pub struct ResponseCache {
    dir: PathBuf,
    ttl: Duration,
    stats: Arc<CacheStats>,
}

impl ResponseCache {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
            stats: Arc::new(CacheStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<CacheStats> {
        Arc::clone(&self.stats)
    }

    /// Cache file name for a request URL.
    pub fn key(url: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn path_for(&self, url: &str) -> PathBuf {
        self.dir.join(format!("{}.json", Self::key(url)))
    }

    /// Return the cached body for `url` if present and fresh.
    pub async fn get(&self, url: &str) -> Option<String> {
        let path = self.path_for(url);
        self.stats.lookups.fetch_add(1, Ordering::Relaxed);

        if !self.is_fresh(&path).await {
            return None;
        }

        match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                debug!(url, "Loaded response from cache");
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                Some(content)
            }
            Err(e) => {
                debug!(url, error = %e, "Cache read failed");
                None
            }
        }
    }

    /// Store a response body for `url`.
    pub async fn put(&self, url: &str, body: &str) {
        if let Err(e) = tokio::fs::create_dir_all(&self.dir).await {
            warn!(dir = %self.dir.display(), error = %e, "Cannot create cache directory");
            return;
        }

        if let Err(e) = tokio::fs::write(self.path_for(url), body).await {
            warn!(url, error = %e, "Cache write failed");
        }
    }

    async fn is_fresh(&self, path: &Path) -> bool {
        let modified = match tokio::fs::metadata(path).await.and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(_) => return false,
        };

        match SystemTime::now().duration_since(modified) {
            Ok(age) => age < self.ttl,
            // mtime in the future: treat as just written
            Err(_) => !self.ttl.is_zero(),
        }
    }
}
