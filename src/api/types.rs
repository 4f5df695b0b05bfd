use serde::{Deserialize, Serialize};

/// Profitability of one client over the selected period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientProfit {
  pub client_id: String,
  pub client_name: String,
  #[serde(default)]
  pub hours: f64,
  #[serde(default)]
  pub cost: f64,
  #[serde(default)]
  pub revenue: f64,
}

/// Totals for one month ("YYYY-MM")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTotal {
  pub month: String,
  #[serde(default)]
  pub hours: f64,
  #[serde(default)]
  pub cost: f64,
  #[serde(default)]
  pub revenue: f64,
  #[serde(default)]
  pub profit: f64,
}

/// Hours logged by one employee
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeHours {
  #[serde(default)]
  pub employee_id: Option<String>,
  pub employee_name: String,
  #[serde(default)]
  pub total_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientWithHours {
  pub client_id: String,
  pub client_name: String,
  #[serde(default)]
  pub total_hours: f64,
}

/// Hours one employee logged on one day for a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyHours {
  pub date: String,
  pub employee_name: String,
  #[serde(default)]
  pub hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeTotal {
  pub employee_name: String,
  #[serde(default)]
  pub total_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientTimeline {
  #[serde(default)]
  pub client_name: String,
  #[serde(default)]
  pub daily: Vec<DailyHours>,
  #[serde(default)]
  pub totals: Vec<EmployeeTotal>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetStatus {
  #[default]
  Ok,
  Warning,
  #[serde(alias = "exceeded")]
  Over,
  /// Anything the API adds later
  #[serde(other)]
  Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeShare {
  pub employee_name: String,
  #[serde(default)]
  pub hours: f64,
}

/// Budget versus actual hours for one client in one month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientBudget {
  pub client_name: String,
  #[serde(default)]
  pub budgeted_hours: f64,
  #[serde(default)]
  pub actual_hours: f64,
  #[serde(default)]
  pub remaining_hours: f64,
  #[serde(default)]
  pub progress_pct: f64,
  /// Hours ahead (+) or behind (-) the linear pace for the month
  #[serde(default)]
  pub pace_diff: f64,
  #[serde(default)]
  pub status: BudgetStatus,
  #[serde(default)]
  pub employees: Vec<EmployeeShare>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetProgress {
  /// How far through the month we are, 0-100
  #[serde(default)]
  pub month_progress_pct: f64,
  #[serde(default)]
  pub clients: Vec<ClientBudget>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitabilityAlert {
  #[serde(default)]
  pub client_id: Option<String>,
  pub client_name: String,
  /// NO_REVENUE, LOSS or LOW_MARGIN
  pub alert_type: String,
  #[serde(default)]
  pub total_revenue_gbp: Option<f64>,
  #[serde(default)]
  pub total_profit_gbp: Option<f64>,
  #[serde(default)]
  pub margin_pct: Option<f64>,
}

/// Freshness of one upstream data source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SourceStatus {
  Ok,
  Warning,
  Critical,
  #[default]
  #[serde(other)]
  Unknown,
}

impl SourceStatus {
  /// Score used by the health timeline: OK counts fully, WARNING half
  pub fn score(&self) -> f64 {
    match self {
      SourceStatus::Ok => 1.0,
      SourceStatus::Warning => 0.5,
      SourceStatus::Critical | SourceStatus::Unknown => 0.0,
    }
  }
}

/// One health check of a data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheck {
  pub source_name: String,
  #[serde(default)]
  pub status: SourceStatus,
  /// ISO timestamp of the check
  #[serde(default)]
  pub check_timestamp: String,
  #[serde(default)]
  pub latest_data_date: Option<String>,
  #[serde(default)]
  pub days_lag: Option<i64>,
  #[serde(default)]
  pub row_count_last_7d: Option<u64>,
  #[serde(default)]
  pub alert_reason: Option<String>,
}

/// A client set up for marketing analytics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsClient {
  pub client_id: String,
  pub client_name: String,
  #[serde(default)]
  pub active: bool,
  #[serde(default)]
  pub meta_ads_accounts: Vec<String>,
  #[serde(default)]
  pub google_ads_accounts: Vec<String>,
  #[serde(default)]
  pub linkedin_ads_accounts: Vec<String>,
  #[serde(default)]
  pub ga4_properties: Vec<String>,
  #[serde(default)]
  pub gsc_domains: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaidMediaSummary {
  #[serde(default)]
  pub total_spend: f64,
  #[serde(default)]
  pub total_impressions: f64,
  #[serde(default)]
  pub total_clicks: f64,
  /// Click-through rate in percent
  #[serde(default)]
  pub avg_ctr: f64,
  #[serde(default)]
  pub avg_cpc: f64,
  #[serde(default)]
  pub total_leads: f64,
  #[serde(default)]
  pub total_conversions: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaidMediaDay {
  #[serde(default)]
  pub date: Option<String>,
  #[serde(default)]
  pub spend: f64,
  #[serde(default)]
  pub leads: f64,
  #[serde(default)]
  pub conversions: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformSpend {
  pub platform: String,
  #[serde(default)]
  pub spend: f64,
  #[serde(default)]
  pub impressions: f64,
  #[serde(default)]
  pub clicks: f64,
  #[serde(default)]
  pub ctr: f64,
  #[serde(default)]
  pub leads: f64,
  #[serde(default)]
  pub conversions: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformsAvailable {
  #[serde(default)]
  pub meta: bool,
  #[serde(default)]
  pub google: bool,
  #[serde(default)]
  pub linkedin: bool,
}

/// Ad spend and results for one client over the filtered period
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaidMedia {
  #[serde(default)]
  pub summary: PaidMediaSummary,
  #[serde(default)]
  pub timeline: Vec<PaidMediaDay>,
  #[serde(default)]
  pub platform_breakdown: Vec<PlatformSpend>,
  #[serde(default)]
  pub platforms_available: PlatformsAvailable,
}
