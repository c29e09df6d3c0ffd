//! Time-bounded memo of remote lookups, shared by reference across builds.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use crate::source::RemoteEntry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedValue {
    Listing(Arc<Vec<RemoteEntry>>),
    Content(Arc<str>),
    Count(u64),
}

#[derive(Debug)]
struct CacheEntry {
    value: CachedValue,
    stored_at: Instant,
}

/// Key namespaces. Each key is scoped by source (`owner/repo@branch`) and path.
pub mod keys {
    pub fn listing(scope: &str, path: &str) -> String {
        format!("list:{}:{}", scope, path)
    }

    pub fn content(scope: &str, path: &str) -> String {
        format!("content:{}:{}", scope, path)
    }

    /// Counts depend on the exclusion set and depth limit, so both are part of the key.
    pub fn count(scope: &str, path: &str, fingerprint: &str) -> String {
        format!("count:{}:{}#{}", scope, path, fingerprint)
    }
}

/// 响应缓存
///
/// Writes from overlapping builds store the same value under the same key, so the lock only
/// guards the map itself and is never held across an await.
#[derive(Debug)]
pub struct ResponseCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the value under `key`, evicting it instead if it outlived the TTL.
    pub fn get(&self, key: &str) -> Option<CachedValue> {
        let mut entries = self.entries.lock();
        let expired = match entries.get(key) {
            None => return None,
            Some(entry) => entry.stored_at.elapsed() > self.ttl,
        };
        if expired {
            entries.remove(key);
            return None;
        }
        entries.get(key).map(|e| e.value.clone())
    }

    pub fn put(&self, key: String, value: CachedValue) {
        self.entries.lock().insert(
            key,
            CacheEntry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    pub fn get_listing(&self, key: &str) -> Option<Arc<Vec<RemoteEntry>>> {
        match self.get(key)? {
            CachedValue::Listing(l) => Some(l),
            _ => None,
        }
    }

    pub fn get_content(&self, key: &str) -> Option<Arc<str>> {
        match self.get(key)? {
            CachedValue::Content(c) => Some(c),
            _ => None,
        }
    }

    pub fn get_count(&self, key: &str) -> Option<u64> {
        match self.get(key)? {
            CachedValue::Count(n) => Some(n),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every expired entry; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let ttl = self.ttl;
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, e| e.stored_at.elapsed() <= ttl);
        before - entries.len()
    }
}
