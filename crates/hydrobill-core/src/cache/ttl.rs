use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SubsecRound, Utc};
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, de::IgnoredAny, Serialize};
use tracing::{debug, warn};

use super::clock::{Clock, SystemClock};
use super::entry::{is_live, CacheEntry, MirrorRecord};
use super::error::MirrorError;
use super::mirror::DurableMirror;

/// Entries live for 5 minutes unless the writer asks otherwise.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Prefix applied to every key written to a durable mirror.
pub const DEFAULT_NAMESPACE: &str = "cache_";

/// Expiry and bounding policies for one cache.
///
/// Capacity eviction and the periodic sweep are independent; either, both or
/// neither may be enabled.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub default_ttl: Duration,
    /// Evict oldest writes once the cache holds more than this many entries.
    pub max_entries: Option<usize>,
    /// Interval for [`CacheSweeper`](super::CacheSweeper) purges.
    pub sweep_interval: Option<Duration>,
    /// Let the sweeper also delete expired records from the mirror.
    pub purge_mirror: bool,
    pub namespace: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_TTL,
            max_entries: None,
            sweep_interval: None,
            purge_mirror: false,
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

impl CacheConfig {
    pub fn bounded(max_entries: usize) -> Self {
        Self::default().with_max_entries(max_entries)
    }

    pub fn swept(interval: Duration) -> Self {
        Self::default().with_sweep_interval(interval)
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries);
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = Some(interval);
        self
    }

    pub fn with_mirror_purge(mut self, purge_mirror: bool) -> Self {
        self.purge_mirror = purge_mirror;
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    /// Entries already past their ttl but not yet purged.
    pub expired: usize,
    pub max_entries: Option<usize>,
    pub mirrored: bool,
}

struct Entries<V> {
    map: HashMap<String, CacheEntry<V>>,
    next_seq: u64,
}

/// In-memory key/value cache with per-entry time-to-live and an optional
/// durable mirror.
///
/// Reads go through two stages: memory first, then the mirror. A live mirror
/// hit is promoted back into memory with its original timestamp, so a
/// restart never extends an entry's lifetime. Mirror failures are logged and
/// otherwise ignored; memory is authoritative for the life of the process.
///
/// Cloning is cheap and yields a handle onto the same entries.
pub struct TtlCache<V> {
    entries: Arc<Mutex<Entries<V>>>,
    config: Arc<CacheConfig>,
    mirror: Option<Arc<dyn DurableMirror>>,
    clock: Arc<dyn Clock>,
}

impl<V> Clone for TtlCache<V> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            config: Arc::clone(&self.config),
            mirror: self.mirror.clone(),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<V> TtlCache<V>
where
    V: Clone + Serialize + DeserializeOwned,
{
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: Arc::new(Mutex::new(Entries {
                map: HashMap::new(),
                next_seq: 0,
            })),
            config: Arc::new(config),
            mirror: None,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_mirror(mut self, mirror: Arc<dyn DurableMirror>) -> Self {
        self.mirror = Some(mirror);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    // ===== Writes =====

    pub fn set(&self, key: impl Into<String>, value: V) {
        self.set_with_ttl(key, value, self.config.default_ttl);
    }

    pub fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let key = key.into();
        // Mirror records carry milliseconds; keep memory at the same precision
        let stored_at = self.clock.now().trunc_subsecs(3);
        self.mirror_write(&key, &value, stored_at, ttl);
        self.insert_entry(key, value, stored_at, ttl);
    }

    pub fn delete(&self, key: &str) {
        self.entries.lock().map.remove(key);
        if self.mirror.is_some() {
            self.mirror_remove(&self.mirror_key(key));
        }
    }

    /// Drops every entry, including this cache's mirrored entries. Mirror keys
    /// outside the cache's namespace are left alone.
    ///
    /// If the mirror can't list its keys, the mirror copies of the entries
    /// that were in memory are still removed.
    pub fn clear(&self) {
        let held: Vec<String> = self.entries.lock().map.drain().map(|(key, _)| key).collect();

        let Some(mirror) = &self.mirror else {
            return;
        };
        match mirror.keys() {
            Ok(keys) => {
                for key in keys
                    .iter()
                    .filter(|key| key.starts_with(&self.config.namespace))
                {
                    self.mirror_remove(key);
                }
            }
            Err(e) => {
                warn!(namespace = %self.config.namespace, error = %e, "Failed to list cache mirror keys");
                for key in &held {
                    self.mirror_remove(&self.mirror_key(key));
                }
            }
        }
    }

    // ===== Reads =====

    pub fn get(&self, key: &str) -> Option<V> {
        if let Some(value) = self.memory_lookup(key) {
            return Some(value);
        }
        self.mirror_lookup(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Read-through: memory, then mirror, then `fetch`.
    ///
    /// A successful fetch is stored with the default ttl. A failed fetch is
    /// returned as-is and nothing is cached.
    pub fn get_or_fetch<E, F>(&self, key: &str, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }
        debug!(key, "Cache miss, fetching");
        let value = fetch()?;
        self.set(key, value.clone());
        Ok(value)
    }

    /// Live keys currently held in memory, in no particular order.
    pub fn keys(&self) -> Vec<String> {
        let now = self.clock.now();
        self.entries
            .lock()
            .map
            .iter()
            .filter(|(_, entry)| entry.is_live_at(now))
            .map(|(key, _)| key.clone())
            .collect()
    }

    pub fn age_display(&self, key: &str) -> Option<String> {
        let now = self.clock.now();
        let entries = self.entries.lock();
        entries
            .map
            .get(key)
            .filter(|entry| entry.is_live_at(now))
            .map(|entry| entry.age_display(now))
    }

    // ===== Housekeeping =====

    /// Remove expired in-memory entries. Returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        let before = entries.map.len();
        entries.map.retain(|_, entry| entry.is_live_at(now));
        before - entries.map.len()
    }

    /// Remove expired and unreadable records in this cache's mirror
    /// namespace. Returns how many were deleted.
    ///
    /// Only the record envelope is parsed, so records written by other caches
    /// sharing the namespace are judged by their own timestamp and ttl.
    pub fn purge_expired_mirror(&self) -> usize {
        let Some(mirror) = &self.mirror else {
            return 0;
        };
        let keys = match mirror.keys() {
            Ok(keys) => keys,
            Err(e) => {
                warn!(namespace = %self.config.namespace, error = %e, "Failed to list cache mirror keys");
                return 0;
            }
        };

        let now = self.clock.now();
        let mut removed = 0;
        for key in keys
            .iter()
            .filter(|key| key.starts_with(&self.config.namespace))
        {
            let stale = match mirror.read(key) {
                Ok(Some(text)) => match serde_json::from_str::<MirrorRecord<IgnoredAny>>(&text) {
                    Ok(record) => !is_live(record.timestamp, record.ttl, now),
                    Err(_) => true,
                },
                Ok(None) => false,
                Err(e) => {
                    warn!(key = %key, error = %e, "Cache mirror read failed");
                    false
                }
            };
            if stale {
                self.mirror_remove(key);
                removed += 1;
            }
        }
        removed
    }

    /// Number of entries in memory, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().map.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now();
        let entries = self.entries.lock();
        CacheStats {
            entries: entries.map.len(),
            expired: entries.map.values().filter(|e| !e.is_live_at(now)).count(),
            max_entries: self.config.max_entries,
            mirrored: self.mirror.is_some(),
        }
    }

    // ===== Internals =====

    fn mirror_key(&self, key: &str) -> String {
        format!("{}{}", self.config.namespace, key)
    }

    fn insert_entry(&self, key: String, value: V, stored_at: DateTime<Utc>, ttl: Duration) {
        let evicted = {
            let mut entries = self.entries.lock();
            let seq = entries.next_seq;
            entries.next_seq += 1;
            entries.map.insert(
                key,
                CacheEntry {
                    value,
                    stored_at,
                    ttl,
                    seq,
                },
            );
            self.evict_over_capacity(&mut entries)
        };

        for key in evicted {
            debug!(key = %key, "Evicted cache entry over capacity");
        }
    }

    /// Drop oldest writes until the map fits `max_entries`.
    fn evict_over_capacity(&self, entries: &mut Entries<V>) -> Vec<String> {
        let Some(max) = self.config.max_entries else {
            return Vec::new();
        };

        let mut evicted = Vec::new();
        while entries.map.len() > max {
            let oldest = entries
                .map
                .iter()
                .min_by_key(|(_, entry)| (entry.stored_at, entry.seq))
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => {
                    entries.map.remove(&key);
                    evicted.push(key);
                }
                None => break,
            }
        }
        evicted
    }

    fn memory_lookup(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        match entries.map.get(key) {
            Some(entry) if entry.is_live_at(now) => Some(entry.value.clone()),
            Some(_) => {
                entries.map.remove(key);
                debug!(key, "Dropped expired cache entry");
                None
            }
            None => None,
        }
    }

    fn mirror_lookup(&self, key: &str) -> Option<V> {
        let mirror = self.mirror.as_ref()?;
        let mirror_key = self.mirror_key(key);

        let text = match mirror.read(&mirror_key) {
            Ok(Some(text)) => text,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = %mirror_key, error = %e, "Cache mirror read failed");
                return None;
            }
        };

        let record: MirrorRecord<V> = match serde_json::from_str(&text) {
            Ok(record) => record,
            Err(e) => {
                warn!(key = %mirror_key, error = %e, "Discarding unreadable cache mirror entry");
                self.mirror_remove(&mirror_key);
                return None;
            }
        };

        if !is_live(record.timestamp, record.ttl, self.clock.now()) {
            debug!(key = %mirror_key, "Dropped expired cache mirror entry");
            self.mirror_remove(&mirror_key);
            return None;
        }

        debug!(key, "Promoted cache entry from mirror");
        self.insert_entry(
            key.to_string(),
            record.data.clone(),
            record.timestamp,
            record.ttl,
        );
        Some(record.data)
    }

    fn mirror_write(&self, key: &str, value: &V, stored_at: DateTime<Utc>, ttl: Duration) {
        let Some(mirror) = &self.mirror else {
            return;
        };
        let mirror_key = self.mirror_key(key);
        let record = MirrorRecord {
            data: value,
            timestamp: stored_at,
            ttl,
        };

        let result = serde_json::to_string(&record)
            .map_err(MirrorError::from)
            .and_then(|text| mirror.write(&mirror_key, &text));
        if let Err(e) = result {
            warn!(key = %mirror_key, error = %e, "Cache mirror write failed");
        }
    }

    fn mirror_remove(&self, mirror_key: &str) {
        if let Some(mirror) = &self.mirror {
            if let Err(e) = mirror.remove(mirror_key) {
                warn!(key = %mirror_key, error = %e, "Cache mirror delete failed");
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
