//! Offline resource cache.
//!
//! A size-bounded, age-bounded map of resource payloads. The bound is
//! enforced after every admission: expired entries are purged first, then
//! victims are evicted lowest priority first (oldest use breaking ties)
//! until the cache fits. With priority eviction disabled the policy
//! degrades to plain least-recently-used.
//!
//! The cache itself is synchronous; the connectivity handler wraps it in
//! its state mutex.

use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::types::Priority;

/// A cached payload with its bookkeeping.
#[derive(Debug, Clone)]
pub struct CachedResource {
    /// The payload itself.
    pub payload: Bytes,
    /// Priority at admission time, consulted during eviction.
    pub priority: Priority,
    /// When the entry was admitted.
    pub cached_at: Instant,
    /// Most recent hit (admission counts).
    pub last_used: Instant,
    /// Entry reads as a miss from this instant on.
    pub expires_at: Instant,
    /// Number of hits served.
    pub access_count: u64,
}

impl CachedResource {
    /// Payload size in bytes.
    pub fn size(&self) -> u64 {
        self.payload.len() as u64
    }
}

/// Cumulative cache counters.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CacheStats {
    /// Live entries.
    pub entries: usize,
    /// Total payload bytes held.
    pub total_bytes: u64,
    /// Lookups served from the cache.
    pub hits: u64,
    /// Lookups that found nothing usable.
    pub misses: u64,
    /// Entries evicted to satisfy the size bound.
    pub evictions: u64,
    /// Entries dropped because they aged out.
    pub expirations: u64,
}

/// Size- and age-bounded resource cache.
#[derive(Debug)]
pub struct ResourceCache {
    entries: HashMap<String, CachedResource>,
    max_age: Duration,
    max_size: u64,
    priority_eviction: bool,
    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,
}

impl ResourceCache {
    /// Create an empty cache with the given bounds.
    pub fn new(max_age: Duration, max_size: u64, priority_eviction: bool) -> Self {
        Self {
            entries: HashMap::new(),
            max_age,
            max_size,
            priority_eviction,
            hits: 0,
            misses: 0,
            evictions: 0,
            expirations: 0,
        }
    }

    /// Admit a payload, replacing any previous entry for the id.
    ///
    /// The size bound is re-enforced immediately; admitting an entry can
    /// evict others (or, if it alone exceeds the bound, itself).
    pub fn insert(&mut self, resource_id: impl Into<String>, payload: Bytes, priority: Priority, now: Instant) {
        let entry = CachedResource {
            payload,
            priority,
            cached_at: now,
            last_used: now,
            expires_at: now + self.max_age,
            access_count: 0,
        };
        self.entries.insert(resource_id.into(), entry);
        self.enforce_bound(now);
    }

    /// Look up a payload, refreshing its recency on a hit.
    ///
    /// Expired entries read as misses and are dropped.
    pub fn get(&mut self, resource_id: &str, now: Instant) -> Option<Bytes> {
        match self.entries.get_mut(resource_id) {
            Some(entry) if entry.expires_at > now => {
                entry.last_used = now;
                entry.access_count += 1;
                self.hits += 1;
                Some(entry.payload.clone())
            }
            Some(_) => {
                self.entries.remove(resource_id);
                self.expirations += 1;
                self.misses += 1;
                None
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Inspect an entry without touching recency or counters.
    ///
    /// Expired entries are invisible here too.
    pub fn peek(&self, resource_id: &str, now: Instant) -> Option<&CachedResource> {
        self.entries
            .get(resource_id)
            .filter(|entry| entry.expires_at > now)
    }

    /// True if a live entry exists for the id.
    pub fn contains(&self, resource_id: &str, now: Instant) -> bool {
        self.peek(resource_id, now).is_some()
    }

    /// Remove an entry by id.
    pub fn remove(&mut self, resource_id: &str) -> bool {
        self.entries.remove(resource_id).is_some()
    }

    /// Drop all entries. Counters are retained.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Live entry count.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the cache holds nothing.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total payload bytes held.
    pub fn total_bytes(&self) -> u64 {
        self.entries.values().map(|e| e.size()).sum()
    }

    /// Current counters and occupancy.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            total_bytes: self.total_bytes(),
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            expirations: self.expirations,
        }
    }

    /// Change the maximum entry age. Applies to future admissions.
    pub fn set_max_age(&mut self, max_age: Duration) {
        self.max_age = max_age;
    }

    /// Change the size bound and enforce it immediately.
    pub fn set_max_size(&mut self, max_size: u64, now: Instant) {
        self.max_size = max_size;
        self.enforce_bound(now);
    }

    /// Toggle priority-aware eviction.
    pub fn set_priority_eviction(&mut self, enabled: bool) {
        self.priority_eviction = enabled;
    }

    fn enforce_bound(&mut self, now: Instant) {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, e)| e.expires_at <= now)
            .map(|(id, _)| id.clone())
            .collect();
        self.expirations += expired.len() as u64;
        for id in expired {
            self.entries.remove(&id);
        }

        while self.total_bytes() > self.max_size {
            let victim = if self.priority_eviction {
                self.entries
                    .iter()
                    .min_by_key(|(_, e)| (e.priority, e.last_used))
                    .map(|(id, _)| id.clone())
            } else {
                self.entries
                    .iter()
                    .min_by_key(|(_, e)| e.last_used)
                    .map(|(id, _)| id.clone())
            };
            let Some(victim) = victim else { break };
            tracing::debug!(resource = %victim, "evicting cached resource");
            self.entries.remove(&victim);
            self.evictions += 1;
        }
    }
}
