use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::TtlCache;

/// Floor for the sweep period; `tokio::time::interval` rejects zero.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// Background task that periodically purges expired entries from a cache.
///
/// Purely a reclamation job: reads already ignore expired entries. When the
/// cache config sets `purge_mirror`, expired mirror records are deleted too.
pub struct CacheSweeper<V> {
    cache: TtlCache<V>,
    interval: Duration,
    shutdown: CancellationToken,
}

impl<V> CacheSweeper<V>
where
    V: Clone + Serialize + DeserializeOwned + Send + 'static,
{
    pub fn new(cache: TtlCache<V>, interval: Duration) -> Self {
        Self {
            cache,
            interval: interval.max(MIN_SWEEP_INTERVAL),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Spawn the sweep loop on the current tokio runtime. The first sweep
    /// runs immediately.
    pub fn start(self) -> JoinHandle<()> {
        debug!(interval_ms = self.interval.as_millis() as u64, "Starting cache sweeper");

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => {
                        debug!("Cache sweeper shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        let removed = self.cache.purge_expired();
                        if removed > 0 {
                            info!(removed, remaining = self.cache.len(), "Swept expired cache entries");
                        }
                        if self.cache.config().purge_mirror {
                            let purged = self.cache.purge_expired_mirror();
                            if purged > 0 {
                                info!(purged, "Swept expired cache mirror records");
                            }
                        }
                    }
                }
            }
        })
    }
}

impl<V> TtlCache<V>
where
    V: Clone + Serialize + DeserializeOwned + Send + 'static,
{
    /// Start a [`CacheSweeper`] if this cache's config has a sweep interval.
    pub fn start_sweeper(&self, shutdown: CancellationToken) -> Option<JoinHandle<()>> {
        let interval = self.config().sweep_interval?;
        Some(
            CacheSweeper::new(self.clone(), interval)
                .with_cancellation(shutdown)
                .start(),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::cache::{CacheConfig, DurableMirror, ManualClock, MemoryMirror};

    #[tokio::test]
    async fn test_sweeper_purges_expired_entries() {
        let clock = ManualClock::default();
        let cache: TtlCache<u32> = TtlCache::new(CacheConfig::swept(Duration::from_millis(5)))
            .with_clock(Arc::new(clock.clone()));

        cache.set_with_ttl("stale", 1, Duration::from_secs(1));
        cache.set_with_ttl("fresh", 2, Duration::from_secs(3600));
        clock.advance(Duration::from_secs(2));
        assert_eq!(cache.len(), 2);

        let shutdown = CancellationToken::new();
        let handle = cache.start_sweeper(shutdown.clone()).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("fresh"), Some(2));

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_sweeper_purges_expired_mirror_records() {
        let clock = ManualClock::default();
        let mirror = MemoryMirror::new();
        let config = CacheConfig::swept(Duration::from_millis(5)).with_mirror_purge(true);
        let cache: TtlCache<u32> = TtlCache::new(config)
            .with_clock(Arc::new(clock.clone()))
            .with_mirror(Arc::new(mirror.clone()));

        cache.set_with_ttl("readings:s1", 1, Duration::from_secs(1));
        cache.set_with_ttl("readings:s2", 2, Duration::from_secs(3600));
        mirror.write("theme", "dark").unwrap();
        clock.advance(Duration::from_secs(2));

        let shutdown = CancellationToken::new();
        let handle = cache.start_sweeper(shutdown.clone()).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let mut remaining = mirror.keys().unwrap();
        remaining.sort();
        assert_eq!(remaining, vec!["cache_readings:s2", "theme"]);

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_no_sweeper_without_interval() {
        let cache: TtlCache<u32> = TtlCache::new(CacheConfig::bounded(10));
        assert!(cache.start_sweeper(CancellationToken::new()).is_none());
    }
}
