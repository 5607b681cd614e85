//! HTTP surface for the directory gateway.
//!
//! One router, two routes: `GET /roster` (optional `date` query) and a
//! `GET /health` probe. Every response body is the envelope the clients
//! of this service already speak: `success` plus exactly one of `data`
//! or `error`. Domain-level failures (bad date, nothing stored) are
//! `200` with a failure envelope; only rate limiting changes the status
//! code (`429`, with `X-RateLimit-*` headers).

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::gateway::{DirectoryGateway, GatewayError};
use crate::roster::Pharmacy;

/// Freshness window attached to successful roster responses.
///
/// Rosters rotate once a day, so an hour of CDN caching with an hour of
/// stale-while-revalidate matches how quickly the data actually moves.
pub const CACHE_CONTROL_VALUE: &str = "public, s-maxage=3600, stale-while-revalidate=3600";

/// Identifier used when no forwarded address is present.
pub const FALLBACK_CLIENT_ID: &str = "anonymous";

/// Response envelope: `success` plus exactly one of `data` or `error`.
///
/// The constructors are the only way to build one, which keeps the
/// exactly-one-of invariant by construction.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl<T> Envelope<T> {
    /// Successful envelope carrying `data`.
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: None,
        }
    }

    /// Failure envelope carrying an error and an optional detail
    /// message.
    pub fn failure(error: impl Into<String>, message: Option<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            message,
        }
    }
}

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    gateway: Arc<DirectoryGateway>,
}

impl AppState {
    /// Create state around a gateway.
    pub fn new(gateway: Arc<DirectoryGateway>) -> Self {
        Self { gateway }
    }
}

/// Build the service router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/roster", get(get_roster))
        .route("/health", get(health))
        .with_state(state)
}

/// Serve the router on `listener` until `shutdown` resolves.
///
/// In-flight requests are drained before this returns.
pub async fn serve<F>(
    listener: tokio::net::TcpListener,
    state: AppState,
    shutdown: F,
) -> std::io::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

/// Query parameters of `GET /roster`.
#[derive(Debug, Deserialize)]
struct RosterQuery {
    date: Option<String>,
}

/// `GET /roster?date=DD/MM/YYYY`: roster for the given (or currently
/// active) schedule key.
async fn get_roster(
    State(state): State<AppState>,
    Query(query): Query<RosterQuery>,
    headers: HeaderMap,
) -> Response {
    let client = client_identifier(&headers);
    debug!(client = %client, date = ?query.date, "roster request");

    match state.gateway.fetch_roster(&client, query.date.as_deref()).await {
        Ok(roster) => {
            let mut response = Json(Envelope::success(roster.pharmacies)).into_response();
            response.headers_mut().insert(
                header::CACHE_CONTROL,
                HeaderValue::from_static(CACHE_CONTROL_VALUE),
            );
            response
        }
        Err(error @ (GatewayError::BadRequest { .. } | GatewayError::NotFound { .. })) => {
            Json(Envelope::<Vec<Pharmacy>>::failure(error.to_string(), None)).into_response()
        }
        Err(GatewayError::RateLimited { limit, reset_after }) => {
            let mut response = (
                StatusCode::TOO_MANY_REQUESTS,
                Json(Envelope::<Vec<Pharmacy>>::failure(
                    "Too many requests",
                    Some("Request quota exceeded, retry after the window resets".to_string()),
                )),
            )
                .into_response();
            let headers = response.headers_mut();
            insert_rate_limit_header(headers, "x-ratelimit-limit", limit);
            insert_rate_limit_header(headers, "x-ratelimit-remaining", 0);
            insert_rate_limit_header(headers, "x-ratelimit-reset", reset_after.as_secs());
            response
        }
        Err(GatewayError::Upstream) => Json(Envelope::<Vec<Pharmacy>>::failure(
            "Internal server error",
            Some("Failed to fetch roster data".to_string()),
        ))
        .into_response(),
    }
}

/// `GET /health`: liveness probe in the standard envelope.
async fn health() -> Response {
    Json(Envelope::success(serde_json::json!({ "status": "ok" }))).into_response()
}

/// Derive the rate-limit identifier from the forwarded address, falling
/// back to a constant when the header is absent or unusable.
fn client_identifier(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| FALLBACK_CLIENT_ID.to_string())
}

/// Numeric header values are always valid; skip silently if not.
fn insert_rate_limit_header(headers: &mut HeaderMap, name: &'static str, value: u64) {
    if let Ok(value) = HeaderValue::from_str(&value.to_string()) {
        headers.insert(name, value);
    }
}
