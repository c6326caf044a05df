//! Embedded relational mirror.
//!
//! A local SQLite file holding subscribers, payments and meter readings,
//! used by the desktop shell as an offline/demo data source. It is separate
//! from the remote document store and from the TTL cache.
//!
//! Rows are insert-only here. References from payments and readings to a
//! subscriber are not enforced.

pub mod error;
pub mod local;
pub mod schema;

pub use error::{Result, StoreError};
pub use local::{LocalStore, DEFAULT_DB_PATH};
