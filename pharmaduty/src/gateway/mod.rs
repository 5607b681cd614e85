//! Directory gateway.
//!
//! Orchestrates roster retrieval: rate limiting (applied before anything
//! else, so throttled clients consume no lookup resources), default key
//! resolution through the schedule resolver, strict key validation, the
//! store point read, and error shaping. Callers always receive a
//! structured result; nothing here panics on bad input or a broken
//! backend.

mod rate_limit;

pub use rate_limit::{
    RateLimitConfig, RateLimitDecision, RateLimiter, DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW,
};

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, warn};

use crate::roster::Pharmacy;
use crate::schedule::{current_active_key, is_valid_key_format, ScheduleConfig};
use crate::store::RosterStore;

/// Errors returned by roster retrieval.
///
/// Backing-store details are logged at the failure site and collapsed
/// into [`GatewayError::Upstream`], so nothing internal leaks to
/// clients.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The requested key is not a valid `DD/MM/YYYY` date.
    #[error("invalid date key: {key}")]
    BadRequest {
        /// The rejected key.
        key: String,
    },

    /// The key is valid but no roster is stored under it.
    #[error("no roster found for {key}")]
    NotFound {
        /// The key that was looked up.
        key: String,
    },

    /// The client exceeded its request quota.
    #[error("rate limit exceeded")]
    RateLimited {
        /// Quota, for response headers.
        limit: u64,
        /// Time until the window resets.
        reset_after: Duration,
    },

    /// The backing store failed; details are in the logs.
    #[error("backing store failure")]
    Upstream,
}

/// Gateway parameters.
#[derive(Debug, Clone, Default)]
pub struct GatewayConfig {
    /// Schedule rotation used for default key resolution.
    pub schedule: ScheduleConfig,
    /// Request quota per client identifier.
    pub rate_limit: RateLimitConfig,
}

/// A retrieved roster with the key it was stored under.
#[derive(Debug, Clone, PartialEq)]
pub struct Roster {
    /// The schedule key this roster belongs to.
    pub key: String,
    /// The stored records, returned verbatim.
    pub pharmacies: Vec<Pharmacy>,
}

/// Roster retrieval orchestrator.
pub struct DirectoryGateway {
    store: Arc<dyn RosterStore>,
    limiter: RateLimiter,
    schedule: ScheduleConfig,
}

impl DirectoryGateway {
    /// Create a gateway over the given store.
    pub fn new(store: Arc<dyn RosterStore>, config: GatewayConfig) -> Self {
        let limiter = RateLimiter::new(Arc::clone(&store), config.rate_limit);
        Self {
            store,
            limiter,
            schedule: config.schedule,
        }
    }

    /// Fetch the roster for `requested_key`, or for the currently active
    /// schedule key when none is given.
    ///
    /// `client_id` identifies the caller for rate limiting; it is
    /// checked before any validation or lookup happens.
    pub async fn fetch_roster(
        &self,
        client_id: &str,
        requested_key: Option<&str>,
    ) -> Result<Roster, GatewayError> {
        let decision = self.limiter.check(client_id).await.map_err(|e| {
            error!(error = %e, "rate limiter store failure");
            GatewayError::Upstream
        })?;
        if !decision.allowed {
            warn!(client = %client_id, "request rejected by rate limit");
            return Err(GatewayError::RateLimited {
                limit: decision.limit,
                reset_after: decision.reset_after,
            });
        }

        let key = match requested_key {
            Some(key) => key.to_string(),
            None => current_active_key(&self.schedule),
        };

        if !is_valid_key_format(&key) {
            return Err(GatewayError::BadRequest { key });
        }

        let bytes = self.store.get(&key).await.map_err(|e| {
            error!(error = %e, key = %key, "roster lookup failed");
            GatewayError::Upstream
        })?;

        let Some(bytes) = bytes else {
            debug!(key = %key, "no roster stored under key");
            return Err(GatewayError::NotFound { key });
        };

        let pharmacies: Vec<Pharmacy> = serde_json::from_slice(&bytes).map_err(|e| {
            // A stored entry that does not parse is a persistence-side
            // defect, reported like any other upstream failure.
            error!(error = %e, key = %key, "stored roster is not valid JSON");
            GatewayError::Upstream
        })?;

        debug!(key = %key, count = pharmacies.len(), "roster served");
        Ok(Roster { key, pharmacies })
    }

    /// The schedule configuration used for default keys.
    pub fn schedule(&self) -> &ScheduleConfig {
        &self.schedule
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{BoxFuture, MemoryStore, StoreError, WindowCount};

    fn pharmacies_json() -> Vec<u8> {
        r#"[
            {"city":"ANKARA","district":"Çankaya","name":"MERKEZ ECZANESİ",
             "phone":"03121234567","address":"Atatürk Bulvarı No: 1",
             "lat":39.9188,"long":32.8541}
        ]"#
        .as_bytes()
        .to_vec()
    }

    async fn gateway_with_roster(key: &str) -> DirectoryGateway {
        let store = Arc::new(MemoryStore::new());
        store.set(key, pharmacies_json()).await.unwrap();
        DirectoryGateway::new(store, GatewayConfig::default())
    }

    #[tokio::test]
    async fn test_fetch_explicit_key() {
        let gateway = gateway_with_roster("14/03/2024").await;
        let roster = gateway
            .fetch_roster("client", Some("14/03/2024"))
            .await
            .unwrap();

        assert_eq!(roster.key, "14/03/2024");
        assert_eq!(roster.pharmacies.len(), 1);
        assert_eq!(roster.pharmacies[0].name, "MERKEZ ECZANESİ");
    }

    #[tokio::test]
    async fn test_invalid_key_is_bad_request() {
        let gateway = gateway_with_roster("14/03/2024").await;
        let result = gateway.fetch_roster("client", Some("31/02/2024")).await;
        assert_eq!(
            result,
            Err(GatewayError::BadRequest {
                key: "31/02/2024".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_missing_roster_is_not_found_not_empty_success() {
        let gateway = gateway_with_roster("14/03/2024").await;
        let result = gateway.fetch_roster("client", Some("15/03/2024")).await;
        assert_eq!(
            result,
            Err(GatewayError::NotFound {
                key: "15/03/2024".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_default_key_resolves_via_schedule() {
        let store = Arc::new(MemoryStore::new());
        let config = GatewayConfig::default();
        let key = current_active_key(&config.schedule);
        store.set(&key, pharmacies_json()).await.unwrap();

        let gateway = DirectoryGateway::new(store, config);
        let roster = gateway.fetch_roster("client", None).await.unwrap();
        assert_eq!(roster.key, key);
    }

    #[tokio::test]
    async fn test_rate_limit_enforced_before_validation() {
        let gateway = gateway_with_roster("14/03/2024").await;

        // Burn the quota with malformed requests; they still count.
        for _ in 0..6 {
            let result = gateway.fetch_roster("client", Some("garbage")).await;
            assert!(matches!(result, Err(GatewayError::BadRequest { .. })));
        }

        // The seventh request is throttled before its key is even looked
        // at, valid or not.
        let result = gateway.fetch_roster("client", Some("14/03/2024")).await;
        assert!(matches!(result, Err(GatewayError::RateLimited { .. })));
    }

    #[tokio::test]
    async fn test_rate_limit_is_per_client() {
        let gateway = gateway_with_roster("14/03/2024").await;

        for _ in 0..6 {
            gateway
                .fetch_roster("client-a", Some("14/03/2024"))
                .await
                .unwrap();
        }
        assert!(matches!(
            gateway.fetch_roster("client-a", Some("14/03/2024")).await,
            Err(GatewayError::RateLimited { .. })
        ));
        assert!(gateway
            .fetch_roster("client-b", Some("14/03/2024"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_corrupt_stored_roster_is_upstream() {
        let store = Arc::new(MemoryStore::new());
        store
            .set("14/03/2024", b"not json at all".to_vec())
            .await
            .unwrap();

        let gateway = DirectoryGateway::new(store, GatewayConfig::default());
        let result = gateway.fetch_roster("client", Some("14/03/2024")).await;
        assert_eq!(result, Err(GatewayError::Upstream));
    }

    #[tokio::test]
    async fn test_store_failure_is_generic_upstream() {
        /// Store whose every operation fails.
        struct BrokenStore;

        impl RosterStore for BrokenStore {
            fn get(&self, _key: &str) -> BoxFuture<'_, Result<Option<Vec<u8>>, StoreError>> {
                Box::pin(async { Err(StoreError::Unreachable("connection reset".into())) })
            }

            fn set(&self, _key: &str, _value: Vec<u8>) -> BoxFuture<'_, Result<(), StoreError>> {
                Box::pin(async { Err(StoreError::Unreachable("connection reset".into())) })
            }

            fn increment(
                &self,
                _key: &str,
                _ttl: Duration,
            ) -> BoxFuture<'_, Result<WindowCount, StoreError>> {
                Box::pin(async { Err(StoreError::Unreachable("connection reset".into())) })
            }
        }

        let gateway = DirectoryGateway::new(Arc::new(BrokenStore), GatewayConfig::default());
        let result = gateway.fetch_roster("client", Some("14/03/2024")).await;

        // The outward error carries no store internals.
        assert_eq!(result, Err(GatewayError::Upstream));
        assert_eq!(
            GatewayError::Upstream.to_string(),
            "backing store failure"
        );
    }
}
