//! Fetch client: cache lookup, network attempt, retry with delay.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use super::cache::{RequestKey, ResponseCache};
use super::error::FetchError;
use super::retry::RetryPolicy;
use super::transport::{split_query, RequestOptions, Transport};
use crate::notify::Notifier;

const TERMINAL_FAILURE_MESSAGE: &str = "Failed to load data. Please try again.";

/// Returns parsed JSON for an endpoint, reusing recent identical results and
/// masking transient failures.
///
/// Cloning is cheap; clones share the cache.
#[derive(Clone)]
pub struct FetchClient {
  transport: Arc<dyn Transport>,
  cache: Arc<ResponseCache>,
  notifier: Arc<dyn Notifier>,
  policy: RetryPolicy,
}

impl FetchClient {
  pub fn new(
    transport: Arc<dyn Transport>,
    notifier: Arc<dyn Notifier>,
    cache_duration: Duration,
    policy: RetryPolicy,
  ) -> Self {
    Self {
      transport,
      cache: Arc::new(ResponseCache::new(cache_duration)),
      notifier,
      policy,
    }
  }

  /// Request with the configured retry budget.
  pub async fn request(&self, endpoint: &str, options: &RequestOptions) -> Result<Value, FetchError> {
    self
      .request_with_retries(endpoint, options, self.policy.max_retries)
      .await
  }

  /// Request with an explicit retry budget: at most `max_retries + 1` attempts.
  ///
  /// A query string on `endpoint` is folded into the option parameters, so
  /// `/api/clients?date_from=2024-01-01` and `/api/clients` with a
  /// `date_from` parameter share one cache entry.
  ///
  /// Every retry emits a warning toast and every terminal failure an error
  /// toast before the error is returned.
  pub async fn request_with_retries(
    &self,
    endpoint: &str,
    options: &RequestOptions,
    max_retries: u32,
  ) -> Result<Value, FetchError> {
    validate_endpoint(endpoint)?;
    let (path, options) = split_query(endpoint, options);
    let (endpoint, options) = (path.as_str(), &options);

    let key = RequestKey::new(endpoint, options);
    if let Some(data) = self.cache.get(&key) {
      tracing::debug!(endpoint, key = %key.digest(), "cache hit");
      return Ok(data);
    }

    let mut retries_left = max_retries;
    loop {
      let attempt = max_retries - retries_left + 1;
      match self.attempt(endpoint, options).await {
        Ok(data) => {
          tracing::debug!(endpoint, key = %key.digest(), attempt, "fetched");
          self.cache.insert(key, data.clone());
          return Ok(data);
        }
        Err(err) if !err.is_retryable() => {
          tracing::error!(endpoint, error = %err, "request rejected");
          return Err(err);
        }
        Err(err) if retries_left > 0 => {
          let delay = self.policy.delay_after(attempt);
          tracing::warn!(
            endpoint,
            attempt,
            max_retries,
            error = %err,
            ?delay,
            "request failed, retrying"
          );
          self
            .notifier
            .warning(&format!("Attempt {}/{}...", attempt, max_retries));
          tokio::time::sleep(delay).await;
          retries_left -= 1;
        }
        Err(err) => {
          tracing::error!(endpoint, attempts = attempt, error = %err, "request failed");
          self.notifier.error(TERMINAL_FAILURE_MESSAGE);
          return Err(err);
        }
      }
    }
  }

  /// Wipe every cached response.
  pub fn clear_cache(&self) {
    tracing::debug!(entries = self.cache.len(), "clearing response cache");
    self.cache.clear();
  }

  async fn attempt(&self, endpoint: &str, options: &RequestOptions) -> Result<Value, FetchError> {
    let response = self.transport.send(endpoint, options).await?;
    if !response.is_success() {
      return Err(FetchError::from_status(response.status, &response.body));
    }
    serde_json::from_slice(&response.body).map_err(|e| FetchError::Parse(e.to_string()))
  }
}

fn validate_endpoint(endpoint: &str) -> Result<(), FetchError> {
  if endpoint.is_empty() {
    return Err(FetchError::Validation("empty endpoint".to_string()));
  }
  if !endpoint.starts_with('/') {
    return Err(FetchError::Validation(format!(
      "endpoint must start with '/': {}",
      endpoint
    )));
  }
  if endpoint.contains('#') {
    return Err(FetchError::Validation(format!(
      "endpoint must not carry a fragment: {}",
      endpoint
    )));
  }
  Ok(())
}


#[cfg(test)]
mod tests {
  use super::testing::*;
  use super::*;
  use crate::notify::{RecordingNotifier, ToastKind};
  use serde_json::json;

  fn make_client(transport: Arc<ScriptedTransport>) -> (FetchClient, RecordingNotifier) {
    let notifier = RecordingNotifier::default();
    let client = FetchClient::new(
      transport,
      Arc::new(notifier.clone()),
      Duration::from_millis(300_000),
      RetryPolicy::default(),
    );
    (client, notifier)
  }

  fn clients_options() -> RequestOptions {
    RequestOptions::get().param("date_from", "2024-01-01")
  }

  #[tokio::test(start_paused = true)]
  async fn test_fails_twice_then_succeeds() {
    let transport = Arc::new(
      ScriptedTransport::always_ok(r#"[{"client_id":"a","revenue":100}]"#)
        .then(Ok(status(502, "")))
        .then(Err(FetchError::Network("connection reset".into()))),
    );
    let (client, notifier) = make_client(transport.clone());

    let data = client
      .request("/api/clients", &clients_options())
      .await
      .unwrap();

    assert_eq!(data, json!([{"client_id": "a", "revenue": 100}]));
    assert_eq!(transport.calls(), 3);
    assert_eq!(notifier.count(ToastKind::Warning), 2);
    assert_eq!(notifier.count(ToastKind::Error), 0);
    assert_eq!(
      notifier.messages(),
      vec!["Attempt 1/3...".to_string(), "Attempt 2/3...".to_string()]
    );
  }

  #[tokio::test(start_paused = true)]
  async fn test_always_failing_exhausts_budget() {
    let transport = Arc::new(ScriptedTransport::always_failing());
    let (client, notifier) = make_client(transport.clone());

    let err = client
      .request("/api/clients", &clients_options())
      .await
      .unwrap_err();

    assert!(matches!(err, FetchError::Status { status: 503, .. }));
    assert_eq!(transport.calls(), 4);
    assert_eq!(notifier.count(ToastKind::Warning), 3);
    assert_eq!(notifier.count(ToastKind::Error), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_attempt_count_is_retries_plus_one() {
    for n in 0..5u32 {
      let transport = Arc::new(ScriptedTransport::always_failing());
      let (client, notifier) = make_client(transport.clone());
      let result = client
        .request_with_retries("/api/monthly", &RequestOptions::get(), n)
        .await;
      assert!(result.is_err());
      assert_eq!(transport.calls(), n as usize + 1);
      assert_eq!(notifier.count(ToastKind::Warning), n as usize);
      assert_eq!(notifier.count(ToastKind::Error), 1);
    }
  }

  #[tokio::test(start_paused = true)]
  async fn test_retries_wait_fixed_delay() {
    let transport = Arc::new(ScriptedTransport::always_failing());
    let (client, _) = make_client(transport);
    let started = tokio::time::Instant::now();
    let _ = client
      .request("/api/monthly", &RequestOptions::get())
      .await;
    assert_eq!(started.elapsed(), Duration::from_secs(3));
  }

  #[tokio::test(start_paused = true)]
  async fn test_cache_hit_skips_network() {
    let transport = Arc::new(ScriptedTransport::always_ok(r#"{"months":["2024-01"]}"#));
    let (client, notifier) = make_client(transport.clone());

    let first = client
      .request("/api/budget-months", &RequestOptions::get())
      .await
      .unwrap();
    let second = client
      .request("/api/budget-months", &RequestOptions::get())
      .await
      .unwrap();

    assert_eq!(first, second);
    assert_eq!(transport.calls(), 1);
    assert!(notifier.messages().is_empty());
  }

  #[tokio::test(start_paused = true)]
  async fn test_cache_expiry_scenario() {
    let transport = Arc::new(ScriptedTransport::always_ok("[1]"));
    let (client, _) = make_client(transport.clone());
    let options = clients_options();

    client.request("/api/clients", &options).await.unwrap();
    assert_eq!(transport.calls(), 1);

    tokio::time::advance(Duration::from_secs(60)).await;
    client.request("/api/clients", &options).await.unwrap();
    assert_eq!(transport.calls(), 1);

    tokio::time::advance(Duration::from_secs(300)).await;
    client.request("/api/clients", &options).await.unwrap();
    assert_eq!(transport.calls(), 2);
  }

  #[tokio::test(start_paused = true)]
  async fn test_clear_cache_forces_fetch() {
    let transport = Arc::new(ScriptedTransport::always_ok("[]"));
    let (client, _) = make_client(transport.clone());

    client.request("/api/alerts", &RequestOptions::get()).await.unwrap();
    client.clear_cache();
    client.request("/api/alerts", &RequestOptions::get()).await.unwrap();

    assert_eq!(transport.calls(), 2);
  }

  #[tokio::test(start_paused = true)]
  async fn test_different_options_do_not_share_entries() {
    let transport = Arc::new(ScriptedTransport::always_ok("[]"));
    let (client, _) = make_client(transport.clone());

    client
      .request("/api/clients", &RequestOptions::get().param("include_paul", "true"))
      .await
      .unwrap();
    client
      .request("/api/clients", &RequestOptions::get())
      .await
      .unwrap();

    assert_eq!(transport.calls(), 2);
  }

  #[tokio::test(start_paused = true)]
  async fn test_parse_errors_are_retried() {
    let transport = Arc::new(
      ScriptedTransport::always_ok("[]")
        .then(Ok(ok("<html>")))
    );
    let (client, notifier) = make_client(transport.clone());

    let data = client
      .request("/api/alerts", &RequestOptions::get())
      .await
      .unwrap();

    assert_eq!(data, json!([]));
    assert_eq!(transport.calls(), 2);
    assert_eq!(notifier.count(ToastKind::Warning), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_failures_are_not_cached() {
    let transport = Arc::new(
      ScriptedTransport::always_ok("[]").then(Ok(status(500, r#"{"error":"boom"}"#))),
    );
    let (client, _) = make_client(transport.clone());

    let err = client
      .request_with_retries("/api/alerts", &RequestOptions::get(), 0)
      .await
      .unwrap_err();
    assert_eq!(err.user_message(), "boom");

    client
      .request_with_retries("/api/alerts", &RequestOptions::get(), 0)
      .await
      .unwrap();
    assert_eq!(transport.calls(), 2);
  }

  #[tokio::test]
  async fn test_validation_errors_fail_fast() {
    let transport = Arc::new(ScriptedTransport::always_ok("[]"));
    let (client, notifier) = make_client(transport.clone());

    for endpoint in ["", "api/clients", "/api/clients#top"] {
      let err = client
        .request(endpoint, &RequestOptions::get())
        .await
        .unwrap_err();
      assert!(matches!(err, FetchError::Validation(_)));
    }

    assert_eq!(transport.calls(), 0);
    assert!(notifier.messages().is_empty());
  }

  #[tokio::test(start_paused = true)]
  async fn test_endpoint_with_query_fails_twice_then_succeeds() {
    let transport = Arc::new(
      ScriptedTransport::always_ok(r#"[{"client_id":"a"}]"#)
        .then(Ok(status(503, "")))
        .then(Ok(status(503, ""))),
    );
    let (client, notifier) = make_client(transport.clone());

    let data = client
      .request("/api/clients?date_from=2024-01-01", &RequestOptions::get())
      .await
      .unwrap();

    assert_eq!(data, json!([{"client_id": "a"}]));
    assert_eq!(transport.calls(), 3);
    assert_eq!(notifier.count(ToastKind::Warning), 2);
    assert_eq!(notifier.count(ToastKind::Error), 0);

    let seen = transport.seen.lock().unwrap();
    assert_eq!(seen[0].0, "/api/clients");
    assert_eq!(seen[0].1, clients_options());
  }

  #[tokio::test(start_paused = true)]
  async fn test_query_order_shares_cache_entry() {
    let transport = Arc::new(ScriptedTransport::always_ok("[]"));
    let (client, _) = make_client(transport.clone());

    client
      .request("/api/clients?date_from=2024-01-01&date_to=2024-01-31", &RequestOptions::get())
      .await
      .unwrap();
    client
      .request("/api/clients?date_to=2024-01-31&date_from=2024-01-01", &RequestOptions::get())
      .await
      .unwrap();
    client
      .request(
        "/api/clients",
        &RequestOptions::get()
          .param("date_from", "2024-01-01")
          .param("date_to", "2024-01-31"),
      )
      .await
      .unwrap();

    assert_eq!(transport.calls(), 1);
  }
}
