//! Local service wiring for the desktop shell.
//!
//! `App` owns the local store and the caches in front of it. Caches are built
//! here and handed to whatever needs them; nothing is global.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use hydrobill_core::cache::{CacheConfig, CacheStats, DurableMirror, FileMirror, TtlCache};
use hydrobill_core::models::{MeterReading, Payment, Subscriber};
use hydrobill_core::seed::{self, SeedReport};
use hydrobill_core::{Config, LocalStore};

/// Cache keys
const SUBSCRIBERS_KEY: &str = "subscribers";
const PAYMENTS_KEY: &str = "payments";

/// Subdirectory of the cache dir holding mirrored entries
const MIRROR_DIR: &str = "mirror";

pub struct App {
    pub store: LocalStore,
    subscribers: TtlCache<Vec<Subscriber>>,
    payments: TtlCache<Vec<Payment>>,
    readings: TtlCache<Vec<MeterReading>>,
    shutdown: CancellationToken,
    sweepers: Vec<JoinHandle<()>>,
}

impl App {
    pub fn new(config: &Config) -> Result<Self> {
        let store = LocalStore::open(config.database_path())
            .context("Failed to open local store")?;

        let mirror = if config.persist_cache {
            open_mirror(config)
        } else {
            None
        };

        // All three caches share the mirror and its `cache_` namespace, so
        // clearing any one of them drops every mirrored record.
        let cache_config = config.cache_config();

        Ok(Self {
            store,
            subscribers: build_cache(&cache_config, mirror.as_ref()),
            payments: build_cache(&cache_config, mirror.as_ref()),
            readings: build_cache(&cache_config, mirror.as_ref()),
            shutdown: CancellationToken::new(),
            sweepers: Vec::new(),
        })
    }

    /// Start background purges for every cache. Requires a tokio runtime.
    pub fn start_sweepers(&mut self) {
        let handles = [
            self.subscribers.start_sweeper(self.shutdown.clone()),
            self.payments.start_sweeper(self.shutdown.clone()),
            self.readings.start_sweeper(self.shutdown.clone()),
        ];
        self.sweepers.extend(handles.into_iter().flatten());
    }

    pub async fn shutdown(self) {
        self.shutdown.cancel();
        for handle in self.sweepers {
            if let Err(e) = handle.await {
                warn!(error = %e, "Cache sweeper ended abnormally");
            }
        }
    }

    pub fn seed_demo(&self) -> Result<SeedReport> {
        let report = seed::seed_demo(&self.store)?;
        if report.inserted > 0 {
            self.invalidate_all();
        }
        Ok(report)
    }

    pub fn subscribers(&self) -> Result<Vec<Subscriber>> {
        Ok(self
            .subscribers
            .get_or_fetch(SUBSCRIBERS_KEY, || self.store.get_subscribers())?)
    }

    pub fn payments(&self) -> Result<Vec<Payment>> {
        Ok(self
            .payments
            .get_or_fetch(PAYMENTS_KEY, || self.store.get_payments())?)
    }

    pub fn readings(&self, subscriber_id: &str) -> Result<Vec<MeterReading>> {
        let key = format!("readings:{}", subscriber_id);
        Ok(self
            .readings
            .get_or_fetch(&key, || self.store.get_meter_readings(subscriber_id))?)
    }

    /// How long ago the subscriber list was cached, if it is cached
    pub fn subscribers_age(&self) -> Option<String> {
        self.subscribers.age_display(SUBSCRIBERS_KEY)
    }

    pub fn invalidate_all(&self) {
        self.subscribers.clear();
        self.payments.clear();
        self.readings.clear();
        debug!("Cleared all caches");
    }

    pub fn cache_stats(&self) -> [(&'static str, CacheStats); 3] {
        [
            ("subscribers", self.subscribers.stats()),
            ("payments", self.payments.stats()),
            ("readings", self.readings.stats()),
        ]
    }
}

fn build_cache<V>(config: &CacheConfig, mirror: Option<&Arc<dyn DurableMirror>>) -> TtlCache<V>
where
    V: Clone + Serialize + DeserializeOwned,
{
    let cache = TtlCache::new(config.clone());
    match mirror {
        Some(mirror) => cache.with_mirror(Arc::clone(mirror)),
        None => cache,
    }
}

/// A mirror that can't be opened just means an in-memory-only session.
fn open_mirror(config: &Config) -> Option<Arc<dyn DurableMirror>> {
    let dir = match config.cache_dir() {
        Ok(dir) => dir.join(MIRROR_DIR),
        Err(e) => {
            warn!(error = %e, "No cache directory, cache mirror disabled");
            return None;
        }
    };
    match FileMirror::new(dir) {
        Ok(mirror) => Some(Arc::new(mirror)),
        Err(e) => {
            warn!(error = %e, "Failed to open cache mirror, continuing without it");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_app(dir: &std::path::Path) -> App {
        let config = Config {
            database_path: Some(dir.join("local.db")),
            persist_cache: false,
            ..Config::default()
        };
        App::new(&config).unwrap()
    }

    #[test]
    fn test_subscribers_served_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(dir.path());
        app.seed_demo().unwrap();

        assert_eq!(app.subscribers().unwrap().len(), 3);
        assert_eq!(app.subscribers_age().as_deref(), Some("just now"));

        // A row written behind the cache's back stays invisible until invalidation
        let mut extra = seed::demo_subscribers().remove(0);
        extra.id = "late".to_string();
        app.store.add_subscriber(&extra).unwrap();
        assert_eq!(app.subscribers().unwrap().len(), 3);

        app.invalidate_all();
        assert_eq!(app.subscribers().unwrap().len(), 4);
    }

    #[test]
    fn test_seed_invalidates_caches() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(dir.path());

        assert!(app.readings("demo-001").unwrap().is_empty());
        app.seed_demo().unwrap();
        assert_eq!(app.readings("demo-001").unwrap().len(), 2);
        assert_eq!(app.payments().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_sweepers_stop_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(dir.path());

        app.start_sweepers();
        assert_eq!(app.sweepers.len(), 3);
        app.shutdown().await;
    }
}
