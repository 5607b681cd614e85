//! In-memory roster store.
//!
//! Backs local development, seeding, and tests. Roster values live in a
//! `moka::future::Cache` weighted by entry size, so a runaway seed file
//! cannot grow without bound; rate-limit counters live in a `DashMap`
//! whose entry API provides the per-key exclusive access `increment`
//! needs to stay atomic under concurrent requests.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use moka::future::Cache;

use super::traits::{BoxFuture, RosterStore, StoreError, WindowCount};

/// Default cap on resident roster bytes (16 MB; a day's roster is a few
/// hundred kilobytes at most).
pub const DEFAULT_MAX_VALUE_BYTES: u64 = 16 * 1024 * 1024;

/// One rate-limit counter window.
#[derive(Debug, Clone, Copy)]
struct CounterWindow {
    count: u64,
    expires_at: Instant,
}

/// In-memory implementation of [`RosterStore`].
pub struct MemoryStore {
    values: Cache<String, Arc<Vec<u8>>>,
    counters: DashMap<String, CounterWindow>,
}

impl MemoryStore {
    /// Create a store with the default size cap.
    pub fn new() -> Self {
        Self::with_max_bytes(DEFAULT_MAX_VALUE_BYTES)
    }

    /// Create a store capped at `max_bytes` of resident values.
    pub fn with_max_bytes(max_bytes: u64) -> Self {
        let values = Cache::builder()
            .weigher(|key: &String, value: &Arc<Vec<u8>>| -> u32 {
                (key.len() + value.len()).min(u32::MAX as usize) as u32
            })
            .max_capacity(max_bytes)
            .build();

        Self {
            values,
            counters: DashMap::new(),
        }
    }

    /// Number of roster entries currently resident.
    pub fn entry_count(&self) -> u64 {
        self.values.entry_count()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RosterStore for MemoryStore {
    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<Vec<u8>>, StoreError>> {
        let key = key.to_string();
        Box::pin(async move {
            Ok(self
                .values
                .get(&key)
                .await
                .map(|value| value.as_ref().clone()))
        })
    }

    fn set(&self, key: &str, value: Vec<u8>) -> BoxFuture<'_, Result<(), StoreError>> {
        let key = key.to_string();
        Box::pin(async move {
            self.values.insert(key, Arc::new(value)).await;
            Ok(())
        })
    }

    fn increment(&self, key: &str, ttl: Duration) -> BoxFuture<'_, Result<WindowCount, StoreError>> {
        let key = key.to_string();
        Box::pin(async move {
            let now = Instant::now();

            // The entry guard holds the shard lock, making the
            // read-reset-increment sequence atomic per key.
            let mut entry = self.counters.entry(key).or_insert(CounterWindow {
                count: 0,
                expires_at: now + ttl,
            });

            if entry.expires_at <= now {
                entry.count = 0;
                entry.expires_at = now + ttl;
            }
            entry.count += 1;

            Ok(WindowCount {
                count: entry.count,
                reset_after: entry.expires_at.saturating_duration_since(now),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_missing_key_returns_none() {
        let store = MemoryStore::new();
        assert_eq!(store.get("14/03/2024").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_then_get_round_trips() {
        let store = MemoryStore::new();
        let value = br#"[{"name":"test"}]"#.to_vec();

        store.set("14/03/2024", value.clone()).await.unwrap();
        assert_eq!(store.get("14/03/2024").await.unwrap(), Some(value));
        assert_eq!(store.entry_count(), 1);
    }

    #[tokio::test]
    async fn test_set_replaces_existing_value() {
        let store = MemoryStore::new();
        store.set("k", b"old".to_vec()).await.unwrap();
        store.set("k", b"new".to_vec()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"new".to_vec()));
    }

    #[tokio::test]
    async fn test_increment_counts_within_window() {
        let store = MemoryStore::new();
        let ttl = Duration::from_secs(60);

        for expected in 1..=3 {
            let window = store.increment("ratelimit:1.2.3.4", ttl).await.unwrap();
            assert_eq!(window.count, expected);
            assert!(window.reset_after <= ttl);
        }
    }

    #[tokio::test]
    async fn test_increment_isolates_identifiers() {
        let store = MemoryStore::new();
        let ttl = Duration::from_secs(60);

        store.increment("ratelimit:a", ttl).await.unwrap();
        store.increment("ratelimit:a", ttl).await.unwrap();
        let other = store.increment("ratelimit:b", ttl).await.unwrap();
        assert_eq!(other.count, 1);
    }

    #[tokio::test]
    async fn test_increment_resets_after_expiry() {
        let store = MemoryStore::new();

        // Zero-length window: already expired on the next call.
        let first = store
            .increment("ratelimit:x", Duration::from_secs(0))
            .await
            .unwrap();
        assert_eq!(first.count, 1);

        let second = store
            .increment("ratelimit:x", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(second.count, 1, "expired window restarts at one");
    }

    #[tokio::test]
    async fn test_concurrent_increments_lose_no_updates() {
        let store = Arc::new(MemoryStore::new());
        let mut handles = Vec::new();

        for _ in 0..50 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .increment("ratelimit:shared", Duration::from_secs(60))
                    .await
                    .unwrap()
            }));
        }

        let mut max_seen = 0;
        for handle in handles {
            max_seen = max_seen.max(handle.await.unwrap().count);
        }
        assert_eq!(max_seen, 50);
    }

    #[tokio::test]
    async fn test_trait_object_usage() {
        let store: Arc<dyn RosterStore> = Arc::new(MemoryStore::new());
        store.set("k", b"v".to_vec()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"v".to_vec()));
    }
}
