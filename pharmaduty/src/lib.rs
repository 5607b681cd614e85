//! Pharmaduty - location-aware on-duty pharmacy directory engine.
//!
//! This library provides the core of the service: a device-location
//! pipeline (sampling, significance filtering, delivery throttling), a
//! bounded k-nearest proximity selector, the schedule-key resolver that
//! maps wall-clock time to the active duty roster, and the cache-backed,
//! rate-limited gateway plus HTTP surface that serve roster data.

pub mod coord;
pub mod gateway;
pub mod location;
pub mod proximity;
pub mod roster;
pub mod schedule;
pub mod server;
pub mod store;

/// Crate version, for startup banners and diagnostics.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
