//! Records mirrored into the local store.
//!
//! - `Subscriber`: a metered household or building account
//! - `Payment`: money received against a subscriber account
//! - `MeterReading`: a single water meter reading
//!
//! Field names serialize in camelCase to match the documents held by the
//! remote store, so the same values can be cached as-is.

pub mod meter_reading;
pub mod payment;
pub mod subscriber;

pub use meter_reading::MeterReading;
pub use payment::Payment;
pub use subscriber::Subscriber;
