use serde::de::DeserializeOwned;

use super::error::FetchError;
use super::fetch::FetchClient;
use super::transport::RequestOptions;
use super::types::{
  AnalyticsClient, BudgetProgress, ClientProfit, ClientTimeline, ClientWithHours, EmployeeHours,
  HealthCheck, MonthlyTotal, PaidMedia, ProfitabilityAlert,
};
use crate::filters::Filters;

/// Typed endpoints of the dashboard API.
#[derive(Clone)]
pub struct DashboardApi {
  fetch: FetchClient,
  /// Bearer token sent with every request, if configured
  token: Option<String>,
}

impl DashboardApi {
  pub fn new(fetch: FetchClient, token: Option<String>) -> Self {
    Self { fetch, token }
  }

  /// Drop every cached response so the next loads hit the network.
  pub fn clear_cache(&self) {
    self.fetch.clear_cache();
  }

  fn options(&self, params: Vec<(&'static str, String)>) -> RequestOptions {
    params
      .into_iter()
      .fold(RequestOptions::get(), |opts, (k, v)| opts.param(k, v))
      .bearer(self.token.as_deref())
  }

  async fn get<T: DeserializeOwned>(
    &self,
    endpoint: &str,
    params: Vec<(&'static str, String)>,
  ) -> Result<T, FetchError> {
    let value = self.fetch.request(endpoint, &self.options(params)).await?;
    serde_json::from_value(value)
      .map_err(|e| FetchError::Parse(format!("{} returned unexpected data: {}", endpoint, e)))
  }

  /// Profitability per client
  pub async fn clients(&self, filters: &Filters) -> Result<Vec<ClientProfit>, FetchError> {
    self.get("/api/clients", filters.params(true)).await
  }

  /// Monthly totals
  pub async fn monthly(&self, filters: &Filters) -> Result<Vec<MonthlyTotal>, FetchError> {
    self.get("/api/monthly", filters.params(true)).await
  }

  /// Hours per employee
  pub async fn employees(&self, filters: &Filters) -> Result<Vec<EmployeeHours>, FetchError> {
    self.get("/api/employees", filters.params(false)).await
  }

  /// Clients that have hours logged in the period
  pub async fn clients_with_hours(
    &self,
    filters: &Filters,
  ) -> Result<Vec<ClientWithHours>, FetchError> {
    self.get("/api/clients-with-hours", filters.params(false)).await
  }

  /// Daily hours per employee for one client
  pub async fn client_timeline(
    &self,
    client_id: &str,
    filters: &Filters,
  ) -> Result<ClientTimeline, FetchError> {
    let id = client_id.trim();
    if id.is_empty() || id.contains(['/', '?', '#']) {
      return Err(FetchError::Validation(format!(
        "invalid client id '{}'",
        client_id
      )));
    }
    let endpoint = format!("/api/client-timeline/{}", id);
    self.get(&endpoint, filters.params(false)).await
  }

  /// Months ("YYYY-MM") that have budget data, most recent first
  pub async fn budget_months(&self) -> Result<Vec<String>, FetchError> {
    self.get("/api/budget-months", Vec::new()).await
  }

  /// Budget progress for a month ("YYYY-MM")
  pub async fn budget_progress(&self, month: &str) -> Result<BudgetProgress, FetchError> {
    self
      .get("/api/budget-progress", vec![("month", month.to_string())])
      .await
  }

  /// Clients with no revenue, a loss, or a low margin
  pub async fn alerts(&self) -> Result<Vec<ProfitabilityAlert>, FetchError> {
    self.get("/api/alerts", Vec::new()).await
  }

  /// Most recent check of every data source
  pub async fn health_latest(&self) -> Result<Vec<HealthCheck>, FetchError> {
    self.get("/api/health/latest", Vec::new()).await
  }

  /// Every check over the last `days` days
  pub async fn health_history(&self, days: u32) -> Result<Vec<HealthCheck>, FetchError> {
    self
      .get("/api/health/history", vec![("days", days.to_string())])
      .await
  }

  /// Clients configured for marketing analytics
  pub async fn analytics_clients(&self) -> Result<Vec<AnalyticsClient>, FetchError> {
    self.get("/api/analytics/clients", Vec::new()).await
  }

  /// Ad spend and results for one analytics client in the filtered period
  pub async fn paid_media(
    &self,
    client_id: &str,
    filters: &Filters,
  ) -> Result<PaidMedia, FetchError> {
    let id = client_id.trim();
    if id.is_empty() {
      return Err(FetchError::Validation("missing client id".to_string()));
    }
    let mut params = vec![("client_id", id.to_string())];
    params.extend(filters.params(false));
    self.get("/api/analytics/paid-media", params).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::fetch::testing::ScriptedTransport;
  use crate::api::retry::RetryPolicy;
  use crate::config::DisplayConfig;
  use crate::notify::RecordingNotifier;
  use chrono::NaiveDate;
  use std::sync::Arc;
  use std::time::Duration;

  fn api(transport: Arc<ScriptedTransport>, token: Option<&str>) -> DashboardApi {
    let fetch = FetchClient::new(
      transport,
      Arc::new(RecordingNotifier::default()),
      Duration::from_secs(300),
      RetryPolicy::default(),
    );
    DashboardApi::new(fetch, token.map(String::from))
  }

  fn filters() -> Filters {
    Filters::new(
      NaiveDate::from_ymd_opt(2024, 2, 10).unwrap(),
      &DisplayConfig::default(),
    )
  }

  #[tokio::test]
  async fn test_clients_sends_filters_and_token() {
    let transport = Arc::new(ScriptedTransport::always_ok(
      r#"[{"client_id":"a","client_name":"Acme","revenue":100,"cost":40,"hours":10}]"#,
    ));
    let api = api(transport.clone(), Some("tok"));
    let mut filters = filters();
    filters.toggle_include_paul();

    let clients = api.clients(&filters).await.unwrap();
    assert_eq!(clients.len(), 1);
    assert_eq!(clients[0].client_name, "Acme");

    let seen = transport.seen.lock().unwrap();
    let (endpoint, options) = &seen[0];
    assert_eq!(endpoint, "/api/clients");
    assert_eq!(options.params.get("date_from").unwrap(), "2024-01-01");
    assert_eq!(options.params.get("include_paul").unwrap(), "true");
    assert_eq!(options.headers.get("authorization").unwrap(), "Bearer tok");
  }

  #[tokio::test]
  async fn test_employees_never_send_toggle() {
    let transport = Arc::new(ScriptedTransport::always_ok("[]"));
    let api = api(transport.clone(), None);
    let mut filters = filters();
    filters.toggle_include_paul();

    api.employees(&filters).await.unwrap();

    let seen = transport.seen.lock().unwrap();
    assert!(!seen[0].1.params.contains_key("include_paul"));
    assert!(seen[0].1.headers.is_empty());
  }

  #[tokio::test]
  async fn test_shape_mismatch_is_parse_error() {
    let transport = Arc::new(ScriptedTransport::always_ok(r#"{"unexpected": true}"#));
    let api = api(transport, None);
    let err = api.alerts().await.unwrap_err();
    assert!(matches!(err, FetchError::Parse(_)));
  }

  #[tokio::test]
  async fn test_client_timeline_rejects_bad_ids() {
    let transport = Arc::new(ScriptedTransport::always_ok("{}"));
    let api = api(transport.clone(), None);
    for id in ["a/b", "a?x=1", " "] {
      let err = api.client_timeline(id, &filters()).await.unwrap_err();
      assert!(matches!(err, FetchError::Validation(_)));
    }
    assert_eq!(transport.calls(), 0);

    api.client_timeline("acme", &filters()).await.unwrap();
    assert_eq!(
      transport.seen.lock().unwrap()[0].0,
      "/api/client-timeline/acme"
    );
  }

  #[tokio::test]
  async fn test_health_history_sends_days() {
    let transport = Arc::new(ScriptedTransport::always_ok(
      r#"[{"source_name":"harvest","status":"OK","check_timestamp":"2024-05-01T06:00:00Z"}]"#,
    ));
    let api = api(transport.clone(), None);

    let history = api.health_history(30).await.unwrap();
    assert_eq!(history[0].source_name, "harvest");
    api.health_latest().await.unwrap();

    let seen = transport.seen.lock().unwrap();
    assert_eq!(seen[0].0, "/api/health/history");
    assert_eq!(seen[0].1.params.get("days").unwrap(), "30");
    assert_eq!(seen[1].0, "/api/health/latest");
  }

  #[tokio::test]
  async fn test_paid_media_sends_client_and_period() {
    let transport = Arc::new(ScriptedTransport::always_ok(
      r#"{"summary":{"total_spend":500}}"#,
    ));
    let api = api(transport.clone(), None);
    let mut filters = filters();
    filters.toggle_include_paul();

    let media = api.paid_media("acme", &filters).await.unwrap();
    assert_eq!(media.summary.total_spend, 500.0);

    let seen = transport.seen.lock().unwrap();
    let (endpoint, options) = &seen[0];
    assert_eq!(endpoint, "/api/analytics/paid-media");
    assert_eq!(options.params.get("client_id").unwrap(), "acme");
    assert_eq!(options.params.get("date_to").unwrap(), "2024-01-31");
    assert!(!options.params.contains_key("include_paul"));
    drop(seen);

    let err = api.paid_media("  ", &filters).await.unwrap_err();
    assert!(matches!(err, FetchError::Validation(_)));
    assert_eq!(transport.calls(), 1);
  }
}
