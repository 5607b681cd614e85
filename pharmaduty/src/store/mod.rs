//! Roster persistence.
//!
//! The gateway sees one [`RosterStore`] trait; backends provide an
//! in-memory store for development and tests and a Redis REST store for
//! production deployments.

mod memory;
mod redis;
mod traits;

pub use memory::{MemoryStore, DEFAULT_MAX_VALUE_BYTES};
pub use redis::{RedisRestConfig, RedisRestStore, DEFAULT_REQUEST_TIMEOUT};
pub use traits::{BoxFuture, RosterStore, StoreError, WindowCount};
