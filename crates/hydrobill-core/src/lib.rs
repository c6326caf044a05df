//! Core library for hydrobill.
//!
//! Local persistence for the water-utility billing desktop shell:
//!
//! - `cache`: TTL caches in front of remote reads, optionally mirrored to disk
//! - `store`: the embedded SQLite mirror (subscribers, payments, meter readings)
//! - `models`: the records both of them carry
//! - `config`: persisted application settings
//! - `seed`: demo rows for a fresh local store

pub mod cache;
pub mod config;
pub mod models;
pub mod seed;
pub mod store;
pub mod utils;

pub use cache::{CacheConfig, TtlCache};
pub use config::Config;
pub use store::{LocalStore, StoreError};
