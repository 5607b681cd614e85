//! Core trait for the roster key-value store.
//!
//! The gateway treats persistence as an opaque, externally synchronized
//! key-value store: point reads of roster JSON plus one atomic counter
//! primitive for rate-limit windows. All backends implement this trait,
//! so the gateway works identically against the in-memory store and the
//! Redis REST backend.
//!
//! # Design Principles
//!
//! - **String keys**: schedule keys and rate-limit identifiers are
//!   human-readable in logs and debugging tools
//! - **Vec<u8> values**: raw bytes, no serialization opinions imposed
//! - **No read-modify-write**: the gateway only performs point reads;
//!   the single mutable-counter case goes through `increment`, which
//!   backends must implement with their native atomic primitive
//! - **Dyn-compatible**: uses `Pin<Box<dyn Future>>` so the gateway can
//!   hold an `Arc<dyn RosterStore>`

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use thiserror::Error;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors surfaced by store backends.
///
/// Details stay inside the error for logging; the gateway maps every
/// variant to a generic upstream failure before anything leaves the
/// process.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be reached.
    #[error("store unreachable: {0}")]
    Unreachable(String),

    /// The store responded, but the payload violated the expected
    /// protocol shape.
    #[error("store protocol error: {0}")]
    Protocol(String),
}

/// Result of one atomic window increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCount {
    /// The counter value after this increment.
    pub count: u64,
    /// Time until the counter's window expires.
    pub reset_after: Duration,
}

/// Key-value storage for rosters and rate-limit counters.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the gateway shares one store
/// across all request tasks.
pub trait RosterStore: Send + Sync {
    /// Point read of the value stored under `key`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(bytes))` if the key exists
    /// - `Ok(None)` if the key is not present
    /// - `Err(_)` on backend failure
    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<Vec<u8>>, StoreError>>;

    /// Store a value under `key`, replacing any existing entry.
    fn set(&self, key: &str, value: Vec<u8>) -> BoxFuture<'_, Result<(), StoreError>>;

    /// Atomically increment the counter under `key`.
    ///
    /// A missing or expired counter starts a fresh window of length
    /// `ttl` at one. Concurrent increments from the same identifier must
    /// not lose updates; backends use their native atomic primitive
    /// (entry locking in memory, `INCR` on Redis).
    fn increment(&self, key: &str, ttl: Duration) -> BoxFuture<'_, Result<WindowCount, StoreError>>;
}
