//! End-to-end gateway tests: store, gateway, and HTTP router together.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use pharmaduty::gateway::{DirectoryGateway, GatewayConfig, RateLimitConfig};
use pharmaduty::roster::Pharmacy;
use pharmaduty::schedule::current_active_key;
use pharmaduty::server::{router, AppState};
use pharmaduty::store::{MemoryStore, RosterStore};

fn sample_roster() -> Vec<Pharmacy> {
    vec![
        Pharmacy {
            city: "ANKARA".to_string(),
            district: "Çankaya".to_string(),
            name: "MERKEZ ECZANESİ".to_string(),
            phone: "03121234567".to_string(),
            address: "Atatürk Bulvarı No: 1".to_string(),
            lat: 39.9188,
            long: 32.8541,
        },
        Pharmacy {
            city: "ANKARA".to_string(),
            district: "Keçiören".to_string(),
            name: "YILDIZ ECZANESİ".to_string(),
            phone: "03129876543".to_string(),
            address: "Fatih Cad. 42".to_string(),
            lat: 39.9812,
            long: 32.8617,
        },
    ]
}

async fn seeded_state(keys: &[&str]) -> AppState {
    let store = Arc::new(MemoryStore::new());
    let bytes = serde_json::to_vec(&sample_roster()).unwrap();
    for key in keys {
        store.set(key, bytes.clone()).await.unwrap();
    }
    let gateway = Arc::new(DirectoryGateway::new(store, GatewayConfig::default()));
    AppState::new(gateway)
}

fn request(uri: &str, client: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-forwarded-for", client)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn roster_round_trips_verbatim_through_the_stack() {
    let app = router(seeded_state(&["14/03/2024"]).await);

    let response = app
        .oneshot(request("/roster?date=14%2F03%2F2024", "10.0.0.1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(header::CACHE_CONTROL));

    let body = body_json(response).await;
    assert_eq!(body["success"], Value::Bool(true));

    // The served records are byte-for-byte what was stored.
    let served: Vec<Pharmacy> = serde_json::from_value(body["data"].clone()).unwrap();
    assert_eq!(served, sample_roster());
}

#[tokio::test]
async fn default_key_serves_todays_roster() {
    let active = current_active_key(&GatewayConfig::default().schedule);
    let app = router(seeded_state(&[active.as_str()]).await);

    let response = app.oneshot(request("/roster", "10.0.0.1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], Value::Bool(true));
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn missing_roster_is_failure_envelope_not_empty_success() {
    let app = router(seeded_state(&[]).await);

    let response = app
        .oneshot(request("/roster?date=14%2F03%2F2024", "10.0.0.1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], Value::Bool(false));
    assert!(body.get("data").is_none());
    assert!(body["error"].as_str().unwrap().contains("14/03/2024"));
}

#[tokio::test]
async fn quota_spans_valid_and_invalid_requests() {
    let store = Arc::new(MemoryStore::new());
    store
        .set(
            "14/03/2024",
            serde_json::to_vec(&sample_roster()).unwrap(),
        )
        .await
        .unwrap();
    let gateway = Arc::new(DirectoryGateway::new(
        store,
        GatewayConfig {
            rate_limit: RateLimitConfig::default(),
            ..GatewayConfig::default()
        },
    ));
    let app = router(AppState::new(gateway));

    // Three good requests and three malformed ones all count.
    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(request("/roster?date=14%2F03%2F2024", "10.9.9.9"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(request("/roster?date=bogus", "10.9.9.9"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .oneshot(request("/roster?date=14%2F03%2F2024", "10.9.9.9"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers().get("x-ratelimit-remaining").unwrap(), "0");

    let body = body_json(response).await;
    assert_eq!(body["success"], Value::Bool(false));
    assert!(body.get("data").is_none());
}

#[tokio::test]
async fn every_response_satisfies_the_envelope_invariant() {
    let app = router(seeded_state(&["14/03/2024"]).await);

    let uris = [
        "/roster?date=14%2F03%2F2024",
        "/roster?date=31%2F02%2F2024",
        "/roster?date=15%2F03%2F2024",
        "/health",
    ];

    for uri in uris {
        let response = app.clone().oneshot(request(uri, "10.1.1.1")).await.unwrap();
        let body = body_json(response).await;

        let success = body["success"].as_bool().expect("success always present");
        let has_data = body.get("data").is_some();
        let has_error = body.get("error").is_some();
        assert_ne!(has_data, has_error, "exactly one of data/error for {uri}");
        assert_eq!(success, has_data, "success must match populated field");
    }
}
