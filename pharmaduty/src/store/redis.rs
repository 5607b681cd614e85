//! Redis REST roster store.
//!
//! Talks to an Upstash-compatible Redis REST endpoint: commands are
//! posted as JSON arrays to the base URL (avoiding any need to embed
//! slash-bearing schedule keys in URL paths) and pipelines go to
//! `/pipeline`. Values are text (roster JSON), matching what the
//! ingestion pipeline writes.
//!
//! `increment` maps to `INCR` + `EXPIRE NX` + `TTL` in one pipeline, so
//! window counting is atomic on the server and concurrent requests from
//! one identifier cannot lose updates.

use std::time::Duration;

use serde_json::{json, Value};
use tracing::debug;

use super::traits::{BoxFuture, RosterStore, StoreError, WindowCount};

/// Default request timeout against the REST endpoint.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(7_500);

/// Connection settings for the REST endpoint.
#[derive(Debug, Clone)]
pub struct RedisRestConfig {
    /// Base URL of the REST endpoint.
    pub url: String,
    /// Bearer token for authentication.
    pub token: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl RedisRestConfig {
    /// Create a configuration with the default timeout.
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// [`RosterStore`] backed by a Redis REST endpoint.
pub struct RedisRestStore {
    client: reqwest::Client,
    url: String,
    token: String,
}

impl RedisRestStore {
    /// Create a store from connection settings.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the HTTP client cannot be constructed.
    pub fn new(config: RedisRestConfig) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StoreError::Unreachable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: config.url.trim_end_matches('/').to_string(),
            token: config.token,
        })
    }

    /// Execute a single command against the REST endpoint.
    async fn command(&self, command: Value) -> Result<Value, StoreError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&command)
            .send()
            .await
            .map_err(|e| StoreError::Unreachable(e.to_string()))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| StoreError::Protocol(format!("invalid response body: {e}")))?;

        extract_result(status.as_u16(), body)
    }

    /// Execute a command pipeline, returning one result per command.
    async fn pipeline(&self, commands: Value) -> Result<Vec<Value>, StoreError> {
        let response = self
            .client
            .post(format!("{}/pipeline", self.url))
            .bearer_auth(&self.token)
            .json(&commands)
            .send()
            .await
            .map_err(|e| StoreError::Unreachable(e.to_string()))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| StoreError::Protocol(format!("invalid response body: {e}")))?;

        extract_pipeline_results(status.as_u16(), body)
    }
}

impl RosterStore for RedisRestStore {
    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<Vec<u8>>, StoreError>> {
        let command = json!(["GET", key]);
        Box::pin(async move {
            let result = self.command(command).await?;
            parse_get_result(result)
        })
    }

    fn set(&self, key: &str, value: Vec<u8>) -> BoxFuture<'_, Result<(), StoreError>> {
        let key = key.to_string();
        Box::pin(async move {
            let value = String::from_utf8(value)
                .map_err(|_| StoreError::Protocol("non-UTF-8 value for REST store".to_string()))?;
            debug!(key = %key, bytes = value.len(), "writing roster value");
            self.command(json!(["SET", key, value])).await?;
            Ok(())
        })
    }

    fn increment(&self, key: &str, ttl: Duration) -> BoxFuture<'_, Result<WindowCount, StoreError>> {
        let ttl_secs = ttl.as_secs();
        let commands = json!([
            ["INCR", key],
            ["EXPIRE", key, ttl_secs, "NX"],
            ["TTL", key],
        ]);
        Box::pin(async move {
            let results = self.pipeline(commands).await?;
            parse_increment_results(&results, ttl)
        })
    }
}

/// Unwrap a `{"result": ...}` envelope, surfacing `{"error": ...}`.
fn extract_result(status: u16, body: Value) -> Result<Value, StoreError> {
    if let Some(error) = body.get("error").and_then(Value::as_str) {
        return Err(StoreError::Protocol(error.to_string()));
    }
    if !(200..300).contains(&status) {
        return Err(StoreError::Unreachable(format!(
            "REST endpoint returned status {status}"
        )));
    }
    Ok(body.get("result").cloned().unwrap_or(Value::Null))
}

/// Unwrap a pipeline response: an array of result envelopes.
fn extract_pipeline_results(status: u16, body: Value) -> Result<Vec<Value>, StoreError> {
    if !(200..300).contains(&status) {
        return Err(StoreError::Unreachable(format!(
            "REST endpoint returned status {status}"
        )));
    }
    let Value::Array(entries) = body else {
        return Err(StoreError::Protocol(
            "pipeline response is not an array".to_string(),
        ));
    };
    entries
        .into_iter()
        .map(|entry| extract_result(status, entry))
        .collect()
}

/// Interpret a `GET` result: null means absent, a string is the value.
fn parse_get_result(result: Value) -> Result<Option<Vec<u8>>, StoreError> {
    match result {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.into_bytes())),
        other => Err(StoreError::Protocol(format!(
            "unexpected GET result: {other}"
        ))),
    }
}

/// Interpret the `INCR`/`EXPIRE`/`TTL` pipeline results.
fn parse_increment_results(results: &[Value], ttl: Duration) -> Result<WindowCount, StoreError> {
    let count = results
        .first()
        .and_then(Value::as_u64)
        .ok_or_else(|| StoreError::Protocol("INCR returned no count".to_string()))?;

    // TTL can report -1/-2 transiently; fall back to the requested window.
    let reset_after = results
        .get(2)
        .and_then(Value::as_i64)
        .filter(|secs| *secs > 0)
        .map(|secs| Duration::from_secs(secs as u64))
        .unwrap_or(ttl);

    Ok(WindowCount { count, reset_after })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_result_unwraps_envelope() {
        let body = json!({"result": "OK"});
        assert_eq!(extract_result(200, body).unwrap(), json!("OK"));
    }

    #[test]
    fn test_extract_result_surfaces_error_field() {
        let body = json!({"error": "WRONGPASS invalid token"});
        let err = extract_result(200, body).unwrap_err();
        assert!(matches!(err, StoreError::Protocol(_)));
        assert!(err.to_string().contains("WRONGPASS"));
    }

    #[test]
    fn test_extract_result_rejects_http_failure() {
        let err = extract_result(503, json!({})).unwrap_err();
        assert!(matches!(err, StoreError::Unreachable(_)));
    }

    #[test]
    fn test_parse_get_null_is_absent() {
        assert_eq!(parse_get_result(Value::Null).unwrap(), None);
    }

    #[test]
    fn test_parse_get_string_is_bytes() {
        let result = parse_get_result(json!("[{\"name\":\"x\"}]")).unwrap();
        assert_eq!(result, Some(br#"[{"name":"x"}]"#.to_vec()));
    }

    #[test]
    fn test_parse_get_rejects_unexpected_shape() {
        assert!(parse_get_result(json!(42)).is_err());
    }

    #[test]
    fn test_parse_increment_uses_server_ttl() {
        let results = vec![json!(4), json!(0), json!(17)];
        let window = parse_increment_results(&results, Duration::from_secs(60)).unwrap();
        assert_eq!(window.count, 4);
        assert_eq!(window.reset_after, Duration::from_secs(17));
    }

    #[test]
    fn test_parse_increment_falls_back_to_requested_ttl() {
        // TTL -1 means "no expiry set yet" on some server versions.
        let results = vec![json!(1), json!(1), json!(-1)];
        let window = parse_increment_results(&results, Duration::from_secs(60)).unwrap();
        assert_eq!(window.count, 1);
        assert_eq!(window.reset_after, Duration::from_secs(60));
    }

    #[test]
    fn test_parse_increment_requires_count() {
        let results = vec![json!(null)];
        assert!(parse_increment_results(&results, Duration::from_secs(60)).is_err());
    }

    #[test]
    fn test_extract_pipeline_results() {
        let body = json!([{"result": 1}, {"result": 1}, {"result": 59}]);
        let results = extract_pipeline_results(200, body).unwrap();
        assert_eq!(results, vec![json!(1), json!(1), json!(59)]);
    }

    #[test]
    fn test_config_trims_trailing_slash() {
        let store =
            RedisRestStore::new(RedisRestConfig::new("https://example.upstash.io/", "token"))
                .unwrap();
        assert_eq!(store.url, "https://example.upstash.io");
    }
}
