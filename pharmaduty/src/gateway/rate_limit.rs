//! Per-client request rate limiting.
//!
//! Each client identifier gets a counter window in the roster store,
//! created lazily on its first request and expiring with the window TTL.
//! Counting goes through the store's atomic increment, so concurrent
//! requests from one identifier cannot slip past the quota, and the
//! limiter itself keeps no local state.

use std::sync::Arc;
use std::time::Duration;

use crate::store::{RosterStore, StoreError};

/// Default request quota per window.
pub const DEFAULT_MAX_REQUESTS: u64 = 6;
/// Default window length.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Key prefix separating counter windows from roster entries.
const COUNTER_PREFIX: &str = "ratelimit";

/// Rate limiter parameters.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Requests allowed per window.
    pub max_requests: u64,
    /// Window length.
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_MAX_REQUESTS,
            window: DEFAULT_WINDOW,
        }
    }
}

/// Outcome of one rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether this request is within quota.
    pub allowed: bool,
    /// The configured quota, for response headers.
    pub limit: u64,
    /// Requests left in the current window.
    pub remaining: u64,
    /// Time until the window resets.
    pub reset_after: Duration,
}

/// Sliding-window request limiter over the roster store.
pub struct RateLimiter {
    store: Arc<dyn RosterStore>,
    config: RateLimitConfig,
}

impl RateLimiter {
    /// Create a limiter counting through the given store.
    pub fn new(store: Arc<dyn RosterStore>, config: RateLimitConfig) -> Self {
        Self { store, config }
    }

    /// Count one request from `identifier` and decide whether it may
    /// proceed.
    ///
    /// # Errors
    ///
    /// Propagates store failures; the caller decides how a broken
    /// counter backend maps onto its own error taxonomy.
    pub async fn check(&self, identifier: &str) -> Result<RateLimitDecision, StoreError> {
        let key = format!("{COUNTER_PREFIX}:{identifier}");
        let window = self.store.increment(&key, self.config.window).await?;

        Ok(RateLimitDecision {
            allowed: window.count <= self.config.max_requests,
            limit: self.config.max_requests,
            remaining: self.config.max_requests.saturating_sub(window.count),
            reset_after: window.reset_after,
        })
    }

    /// The limiter configuration.
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn limiter() -> RateLimiter {
        RateLimiter::new(Arc::new(MemoryStore::new()), RateLimitConfig::default())
    }

    #[tokio::test]
    async fn test_first_request_allowed() {
        let limiter = limiter();
        let decision = limiter.check("1.2.3.4").await.unwrap();
        assert!(decision.allowed);
        assert_eq!(decision.limit, DEFAULT_MAX_REQUESTS);
        assert_eq!(decision.remaining, DEFAULT_MAX_REQUESTS - 1);
    }

    #[tokio::test]
    async fn test_sixth_allowed_seventh_rejected() {
        let limiter = limiter();

        for i in 1..=6 {
            let decision = limiter.check("1.2.3.4").await.unwrap();
            assert!(decision.allowed, "request {i} should pass");
        }

        let decision = limiter.check("1.2.3.4").await.unwrap();
        assert!(!decision.allowed, "seventh request must be rejected");
        assert_eq!(decision.remaining, 0);
    }

    #[tokio::test]
    async fn test_identifiers_counted_independently() {
        let limiter = limiter();

        for _ in 0..6 {
            limiter.check("1.2.3.4").await.unwrap();
        }
        assert!(!limiter.check("1.2.3.4").await.unwrap().allowed);
        assert!(limiter.check("5.6.7.8").await.unwrap().allowed);
    }

    #[tokio::test]
    async fn test_custom_quota() {
        let limiter = RateLimiter::new(
            Arc::new(MemoryStore::new()),
            RateLimitConfig {
                max_requests: 2,
                window: Duration::from_secs(60),
            },
        );

        assert!(limiter.check("c").await.unwrap().allowed);
        assert!(limiter.check("c").await.unwrap().allowed);
        assert!(!limiter.check("c").await.unwrap().allowed);
    }

    #[tokio::test]
    async fn test_reset_after_within_window() {
        let limiter = limiter();
        let decision = limiter.check("1.2.3.4").await.unwrap();
        assert!(decision.reset_after <= DEFAULT_WINDOW);
        assert!(decision.reset_after > Duration::ZERO);
    }
}
