//! Client-side caching for expensive remote reads.
//!
//! This module provides `TtlCache`, an in-memory key/value cache with
//! per-entry expiry that can be mirrored to durable local storage so cached
//! data survives a restart of the desktop shell.
//!
//! - `TtlCache`: the cache itself, with optional capacity eviction
//! - `CacheSweeper`: periodic purge of expired entries
//! - `DurableMirror`: storage behind the cache (`FileMirror`, `MemoryMirror`)
//! - `Clock`: time source (`SystemClock`, `ManualClock`)
//!
//! Mirrored entries are stored under `cache_<key>` as
//! `{ "data", "timestamp", "ttl" }` JSON.

pub mod clock;
pub mod entry;
pub mod error;
pub mod mirror;
pub mod sweeper;
pub mod ttl;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use error::MirrorError;
pub use mirror::{DurableMirror, FileMirror, MemoryMirror};
pub use sweeper::CacheSweeper;
pub use ttl::{CacheConfig, CacheStats, TtlCache, DEFAULT_NAMESPACE, DEFAULT_TTL};
