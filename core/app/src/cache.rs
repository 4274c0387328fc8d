//! Search result cache.
//!
//! Results are keyed by normalized domain and only ever hold
//! [`EntrySummary`] values, so no secret can be served from here.

use std::collections::HashMap;
use std::time::{Duration, Instant};
use url::Url;

use crate::config::ServiceConfig;
use keebridge_common::EntrySummary;

/// Reduce a page URL to the lower-cased key used for matching and caching.
///
/// URLs with a host map to their authority as written (`host[:port]`, any
/// user info dropped), so internationalized hosts stay in the form vault
/// entries store them in and explicit ports are kept. Anything else (a bare
/// domain, a path, junk) is trimmed and lower-cased as is.
pub fn normalize_domain(url: &str) -> String {
    let trimmed = url.trim();
    let has_host = Url::parse(trimmed)
        .map(|parsed| parsed.host_str().is_some())
        .unwrap_or(false);

    if has_host {
        if let Some(authority) = authority(trimmed) {
            return authority.to_lowercase();
        }
    }
    trimmed.to_lowercase()
}

fn authority(url: &str) -> Option<&str> {
    let (_, rest) = url.split_once("://")?;
    let end = rest
        .find(|c| matches!(c, '/' | '?' | '#'))
        .unwrap_or(rest.len());
    let authority = &rest[..end];
    let host = authority
        .rsplit_once('@')
        .map_or(authority, |(_, host)| host);
    (!host.is_empty()).then_some(host)
}

/// A cached search result.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub results: Vec<EntrySummary>,
    pub cached_at: Instant,
}

/// TTL and capacity bounded cache of search results.
///
/// `generation` increases on every [`clear`](Self::clear). A caller that
/// scans outside the lock remembers the generation it started from and its
/// result is dropped if a reload or lock happened in between.
#[derive(Debug)]
pub struct SearchCache {
    entries: HashMap<String, CacheEntry>,
    ttl: Duration,
    capacity: usize,
    evict_batch: usize,
    generation: u64,
}

impl SearchCache {
    /// Create an empty cache.
    pub fn new(ttl: Duration, capacity: usize, evict_batch: usize) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            capacity,
            evict_batch,
            generation: 0,
        }
    }

    /// Create a cache sized from the service configuration.
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(
            config.cache_ttl(),
            config.cache_capacity,
            config.cache_evict_batch,
        )
    }

    /// Current generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of cached keys, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `key` has an entry, fresh or not.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Fresh results for `key`. Expired entries are removed and reported absent.
    pub fn get(&mut self, key: &str, now: Instant) -> Option<Vec<EntrySummary>> {
        let fresh = self
            .entries
            .get(key)
            .map(|entry| now.saturating_duration_since(entry.cached_at) < self.ttl)?;

        if fresh {
            self.entries.get(key).map(|entry| entry.results.clone())
        } else {
            self.entries.remove(key);
            None
        }
    }

    /// Cache `results` under `key`, evicting the oldest keys when over capacity.
    pub fn insert(&mut self, key: String, results: Vec<EntrySummary>, now: Instant) {
        self.entries.insert(
            key,
            CacheEntry {
                results,
                cached_at: now,
            },
        );

        if self.entries.len() > self.capacity {
            self.evict_oldest();
        }
    }

    /// Insert only if no clear happened since `generation` was read.
    ///
    /// Returns whether the result was stored.
    pub fn insert_if_current(
        &mut self,
        generation: u64,
        key: String,
        results: Vec<EntrySummary>,
        now: Instant,
    ) -> bool {
        if generation != self.generation {
            return false;
        }
        self.insert(key, results, now);
        true
    }

    /// Drop everything and start a new generation.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.generation = self.generation.wrapping_add(1);
    }

    fn evict_oldest(&mut self) {
        let mut by_age: Vec<(Instant, String)> = self
            .entries
            .iter()
            .map(|(key, entry)| (entry.cached_at, key.clone()))
            .collect();
        by_age.sort();

        for (_, key) in by_age.into_iter().take(self.evict_batch) {
            self.entries.remove(&key);
        }
    }
}
