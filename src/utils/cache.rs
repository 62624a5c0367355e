//! In-memory TTL cache for API responses.
//!
//! Bounded by entry count; when full, the entry that was inserted
//! earliest is evicted (insertion order, not access order, so eviction
//! is deterministic). Expired entries are dropped lazily on lookup and
//! swept before an eviction is considered.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::debug;

/// Hit/miss counters, snapshotted via [`CacheManager::stats`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub evictions: u64,
    pub size: usize,
    pub max_size: usize,
}

impl CacheStats {
    /// Hit ratio in [0, 1]; 0 when no lookups have happened.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug)]
struct Entry<T> {
    value: T,
    expires_at: Instant,
    seq: u64,
}

#[derive(Debug)]
struct Inner<T> {
    entries: HashMap<String, Entry<T>>,
    next_seq: u64,
    hits: u64,
    misses: u64,
    inserts: u64,
    evictions: u64,
}

/// Bounded TTL cache, safe to share across tasks.
#[derive(Debug)]
pub struct CacheManager<T> {
    max_size: usize,
    default_ttl: Duration,
    inner: Mutex<Inner<T>>,
}

impl<T: Clone> CacheManager<T> {
    /// `max_size` of 0 disables storage entirely; every lookup misses.
    pub fn new(max_size: usize, default_ttl: Duration) -> Self {
        Self {
            max_size,
            default_ttl,
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                next_seq: 0,
                hits: 0,
                misses: 0,
                inserts: 0,
                evictions: 0,
            }),
        }
    }

    /// Look up a key. Expired entries count as misses and are removed.
    pub fn get(&self, key: &str) -> Option<T> {
        let mut inner = self.inner.lock().unwrap();
        match inner.entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                let value = entry.value.clone();
                inner.hits += 1;
                debug!(key, "cache hit");
                Some(value)
            }
            Some(_) => {
                inner.entries.remove(key);
                inner.misses += 1;
                debug!(key, "cache expired");
                None
            }
            None => {
                inner.misses += 1;
                debug!(key, "cache miss");
                None
            }
        }
    }

    /// Insert with the default TTL.
    pub fn insert(&self, key: impl Into<String>, value: T) {
        self.insert_with_ttl(key, value, self.default_ttl);
    }

    /// Insert with an explicit TTL. Overwriting an existing key keeps the
    /// key's place in eviction order fresh (it becomes the newest entry).
    pub fn insert_with_ttl(&self, key: impl Into<String>, value: T, ttl: Duration) {
        if self.max_size == 0 {
            return;
        }
        let key = key.into();
        let now = Instant::now();
        let mut inner = self.inner.lock().unwrap();

        if !inner.entries.contains_key(&key) && inner.entries.len() >= self.max_size {
            // Drop anything already expired before evicting a live entry
            inner.entries.retain(|_, e| e.expires_at > now);
            if inner.entries.len() >= self.max_size {
                if let Some(oldest) = inner
                    .entries
                    .iter()
                    .min_by_key(|(_, e)| e.seq)
                    .map(|(k, _)| k.clone())
                {
                    inner.entries.remove(&oldest);
                    inner.evictions += 1;
                    debug!(key = %oldest, "cache evicted oldest entry");
                }
            }
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.inserts += 1;
        inner.entries.insert(
            key,
            Entry {
                value,
                expires_at: now + ttl,
                seq,
            },
        );
    }

    /// Drop a single key if present.
    pub fn invalidate(&self, key: &str) {
        self.inner.lock().unwrap().entries.remove(key);
    }

    /// Remove everything, leaving counters intact.
    pub fn clear(&self) {
        self.inner.lock().unwrap().entries.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock().unwrap();
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            inserts: inner.inserts,
            evictions: inner.evictions,
            size: inner.entries.len(),
            max_size: self.max_size,
        }
    }
}

/// Builds deterministic cache keys from named fields. Fields are sorted
/// by name and list values are sorted, so semantically equal requests
/// produce byte-identical keys regardless of construction order.
#[derive(Debug, Default)]
pub struct KeyBuilder {
    prefix: String,
    fields: Vec<(String, String)>,
}

impl KeyBuilder {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, name: &str, value: impl std::fmt::Display) -> Self {
        self.fields.push((name.to_string(), value.to_string()));
        self
    }

    /// Absent options contribute nothing to the key.
    pub fn opt_field(self, name: &str, value: Option<impl std::fmt::Display>) -> Self {
        match value {
            Some(v) => self.field(name, v),
            None => self,
        }
    }

    pub fn list_field(mut self, name: &str, values: &[String]) -> Self {
        if values.is_empty() {
            return self;
        }
        let mut sorted = values.to_vec();
        sorted.sort();
        self.fields.push((name.to_string(), sorted.join(",")));
        self
    }

    /// Keys longer than 200 characters are replaced by prefix plus an md5
    /// digest to keep them bounded.
    pub fn finish(mut self) -> String {
        self.fields.sort();
        let body = self
            .fields
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        let key = format!("{}:{}", self.prefix, body);
        if key.len() > 200 {
            format!("{}:{:x}", self.prefix, md5::compute(key.as_bytes()))
        } else {
            key
        }
    }
}
