//! Figures derived from API payloads: KPIs, sorting, comparisons.

use chrono::{Datelike, NaiveDate};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::api::types::{
  BudgetProgress, ClientProfit, EmployeeHours, HealthCheck, MonthlyTotal, PaidMedia, SourceStatus,
};

/// Share of logged hours assumed billable when no split is available
pub const BILLABLE_SHARE: f64 = 0.85;
/// Average billed rate, GBP per billable hour
pub const HOURLY_RATE_GBP: f64 = 100.0;
/// Average internal cost, GBP per logged hour
pub const HOURLY_COST_GBP: f64 = 50.0;

/// Whole-number percentage `part / whole`, 0 when `whole` is zero.
pub fn percent(part: f64, whole: f64) -> f64 {
  if whole == 0.0 {
    0.0
  } else {
    (part / whole * 100.0).round()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Badge {
  High,
  Medium,
  Low,
}

pub fn margin_badge(margin: f64) -> Badge {
  if margin >= 70.0 {
    Badge::High
  } else if margin >= 50.0 {
    Badge::Medium
  } else {
    Badge::Low
  }
}

pub fn billable_badge(rate: f64) -> Badge {
  if rate >= 80.0 {
    Badge::High
  } else if rate >= 60.0 {
    Badge::Medium
  } else {
    Badge::Low
  }
}

impl ClientProfit {
  pub fn profit(&self) -> f64 {
    self.revenue - self.cost
  }

  pub fn margin(&self) -> f64 {
    percent(self.profit(), self.revenue)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClientTotals {
  pub revenue: f64,
  pub cost: f64,
  pub hours: f64,
  pub profit: f64,
  pub margin: f64,
}

pub fn client_totals(clients: &[ClientProfit]) -> ClientTotals {
  let revenue: f64 = clients.iter().map(|c| c.revenue).sum();
  let cost: f64 = clients.iter().map(|c| c.cost).sum();
  let hours: f64 = clients.iter().map(|c| c.hours).sum();
  let profit = revenue - cost;
  ClientTotals {
    revenue,
    cost,
    hours,
    profit,
    margin: percent(profit, revenue),
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientColumn {
  Name,
  Revenue,
  Cost,
  Hours,
  Profit,
  Margin,
}

impl ClientColumn {
  pub const ALL: [ClientColumn; 6] = [
    ClientColumn::Name,
    ClientColumn::Revenue,
    ClientColumn::Cost,
    ClientColumn::Hours,
    ClientColumn::Profit,
    ClientColumn::Margin,
  ];

  pub fn title(&self) -> &'static str {
    match self {
      ClientColumn::Name => "Client",
      ClientColumn::Revenue => "Revenue",
      ClientColumn::Cost => "Cost",
      ClientColumn::Hours => "Hours",
      ClientColumn::Profit => "Profit",
      ClientColumn::Margin => "Margin",
    }
  }

  fn numeric(&self, c: &ClientProfit) -> f64 {
    match self {
      ClientColumn::Name => 0.0,
      ClientColumn::Revenue => c.revenue,
      ClientColumn::Cost => c.cost,
      ClientColumn::Hours => c.hours,
      ClientColumn::Profit => c.profit(),
      ClientColumn::Margin => c.margin(),
    }
  }
}

/// Sort column and direction for the clients table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortState {
  pub column: Option<ClientColumn>,
  pub ascending: bool,
}

impl SortState {
  /// Select a column: same column flips the direction, a new one starts descending.
  pub fn select(&mut self, column: ClientColumn) {
    if self.column == Some(column) {
      self.ascending = !self.ascending;
    } else {
      self.column = Some(column);
      self.ascending = false;
    }
  }

  /// Sorted copy of `clients`; unsorted input order when no column is selected.
  ///
  /// For names, "descending" is A→Z, matching the numeric columns where the
  /// first click puts the most interesting rows on top.
  pub fn apply(&self, clients: &[ClientProfit]) -> Vec<ClientProfit> {
    let mut sorted = clients.to_vec();
    let Some(column) = self.column else {
      return sorted;
    };
    sorted.sort_by(|a, b| {
      let ord = match column {
        ClientColumn::Name => a
          .client_name
          .to_lowercase()
          .cmp(&b.client_name.to_lowercase()),
        _ => column
          .numeric(b)
          .partial_cmp(&column.numeric(a))
          .unwrap_or(Ordering::Equal),
      };
      if self.ascending {
        ord.reverse()
      } else {
        ord
      }
    });
    sorted
  }
}

/// Change of one figure between two periods
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trend {
  pub current: f64,
  pub delta: f64,
  /// Percent change, or points for margins
  pub change: f64,
}

impl Trend {
  fn between(current: f64, previous: f64) -> Self {
    Self {
      current,
      delta: current - previous,
      change: percent(current - previous, previous),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Comparison {
  pub revenue: Trend,
  pub profit: Trend,
  /// `change` is in margin points
  pub margin: Trend,
  pub hours: Trend,
}

fn month_key(date: NaiveDate) -> String {
  format!("{}-{:02}", date.year(), date.month())
}

fn compare(current: &MonthlyTotal, previous: &MonthlyTotal) -> Comparison {
  let current_margin = percent(current.profit, current.revenue);
  let previous_margin = percent(previous.profit, previous.revenue);
  Comparison {
    revenue: Trend::between(current.revenue, previous.revenue),
    profit: Trend::between(current.profit, previous.profit),
    margin: Trend {
      current: current_margin,
      delta: current_margin - previous_margin,
      change: current_margin - previous_margin,
    },
    hours: Trend::between(current.hours, previous.hours),
  }
}

/// Month-over-month and year-over-year comparisons for `today`'s month.
/// Either side is None when a month is missing from the data.
pub fn monthly_comparisons(
  data: &[MonthlyTotal],
  today: NaiveDate,
) -> (Option<Comparison>, Option<Comparison>) {
  let find = |key: String| data.iter().find(|m| m.month == key);

  let current = find(month_key(today));
  let (last_month_start, _) = crate::filters::previous_month(today);
  let last_month = find(month_key(last_month_start));
  let last_year = today
    .with_day(1)
    .and_then(|d| d.with_year(today.year() - 1))
    .and_then(|d| find(month_key(d)));

  let mom = current.zip(last_month).map(|(c, p)| compare(c, p));
  let yoy = current.zip(last_year).map(|(c, p)| compare(c, p));
  (mom, yoy)
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmployeePerformance {
  pub employee_name: String,
  pub total_hours: f64,
  pub billable_hours: f64,
  pub billable_rate: f64,
  pub revenue: f64,
  pub cost: f64,
  pub profit: f64,
}

/// Estimated performance per employee, best billable rate first.
pub fn performance(employees: &[EmployeeHours]) -> Vec<EmployeePerformance> {
  let mut rows: Vec<EmployeePerformance> = employees
    .iter()
    .map(|e| {
      let billable_hours = e.total_hours * BILLABLE_SHARE;
      let revenue = billable_hours * HOURLY_RATE_GBP;
      let cost = e.total_hours * HOURLY_COST_GBP;
      EmployeePerformance {
        employee_name: e.employee_name.clone(),
        total_hours: e.total_hours,
        billable_hours,
        billable_rate: percent(billable_hours, e.total_hours),
        revenue,
        cost,
        profit: revenue - cost,
      }
    })
    .collect();
  rows.sort_by(|a, b| {
    b.billable_rate
      .partial_cmp(&a.billable_rate)
      .unwrap_or(Ordering::Equal)
  });
  rows
}

/// `(name, hours, share %)` rows sorted by hours, most first.
pub fn hours_share<'a>(rows: impl Iterator<Item = (&'a str, f64)>) -> Vec<(String, f64, f64)> {
  let rows: Vec<(&str, f64)> = rows.collect();
  let total: f64 = rows.iter().map(|(_, h)| h).sum();
  let mut shares: Vec<(String, f64, f64)> = rows
    .into_iter()
    .map(|(name, hours)| (name.to_string(), hours, percent(hours, total)))
    .collect();
  shares.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
  shares
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BudgetSummary {
  pub budgeted: f64,
  pub actual: f64,
  pub remaining: f64,
}

pub fn budget_summary(progress: &BudgetProgress) -> BudgetSummary {
  let budgeted: f64 = progress.clients.iter().map(|c| c.budgeted_hours).sum();
  let actual: f64 = progress.clients.iter().map(|c| c.actual_hours).sum();
  BudgetSummary {
    budgeted,
    actual,
    remaining: budgeted - actual,
  }
}

/// Status of every source on one day of the health history
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HealthDay {
  /// "YYYY-MM-DD"
  pub date: String,
  pub statuses: BTreeMap<String, SourceStatus>,
}

impl HealthDay {
  /// Average source score, 0-100
  pub fn score(&self) -> f64 {
    if self.statuses.is_empty() {
      return 0.0;
    }
    let total: f64 = self.statuses.values().map(|s| s.score()).sum();
    (total / self.statuses.len() as f64 * 100.0).round()
  }
}

/// Group checks by the day they ran, oldest day first. When a source was
/// checked more than once on a day, the latest check counts.
pub fn health_timeline(history: &[HealthCheck]) -> Vec<HealthDay> {
  let mut days: BTreeMap<&str, BTreeMap<&str, &HealthCheck>> = BTreeMap::new();
  for check in history {
    let Some(date) = check.check_timestamp.get(..10) else {
      continue;
    };
    let sources = days.entry(date).or_default();
    let newer = sources
      .get(check.source_name.as_str())
      .map_or(true, |seen| seen.check_timestamp < check.check_timestamp);
    if newer {
      sources.insert(check.source_name.as_str(), check);
    }
  }
  days
    .into_iter()
    .map(|(date, sources)| HealthDay {
      date: date.to_string(),
      statuses: sources
        .into_iter()
        .map(|(name, check)| (name.to_string(), check.status))
        .collect(),
    })
    .collect()
}

/// Spend per result, None when there were no results
pub fn cost_per(spend: f64, results: f64) -> Option<f64> {
  if results > 0.0 {
    Some(spend / results)
  } else {
    None
  }
}

/// `(platform, spend, share of total spend %)`, biggest spender first
pub fn platform_shares(media: &PaidMedia) -> Vec<(String, f64, f64)> {
  let total = if media.summary.total_spend > 0.0 {
    media.summary.total_spend
  } else {
    media.platform_breakdown.iter().map(|p| p.spend).sum()
  };
  let mut rows: Vec<(String, f64, f64)> = media
    .platform_breakdown
    .iter()
    .map(|p| (p.platform.clone(), p.spend, percent(p.spend, total)))
    .collect();
  rows.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
  rows
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::types::{ClientBudget, PlatformSpend};

  fn client(name: &str, revenue: f64, cost: f64, hours: f64) -> ClientProfit {
    ClientProfit {
      client_id: name.to_lowercase(),
      client_name: name.to_string(),
      hours,
      cost,
      revenue,
    }
  }

  fn month(key: &str, revenue: f64, profit: f64, hours: f64) -> MonthlyTotal {
    MonthlyTotal {
      month: key.to_string(),
      hours,
      cost: revenue - profit,
      revenue,
      profit,
    }
  }

  #[test]
  fn test_client_totals() {
    let clients = vec![client("A", 1000.0, 400.0, 10.0), client("B", 0.0, 100.0, 5.0)];
    let totals = client_totals(&clients);
    assert_eq!(totals.revenue, 1000.0);
    assert_eq!(totals.profit, 500.0);
    assert_eq!(totals.margin, 50.0);
    assert_eq!(clients[1].margin(), 0.0);
    assert_eq!(client_totals(&[]).margin, 0.0);
  }

  #[test]
  fn test_badges() {
    assert_eq!(margin_badge(70.0), Badge::High);
    assert_eq!(margin_badge(55.0), Badge::Medium);
    assert_eq!(margin_badge(-5.0), Badge::Low);
    assert_eq!(billable_badge(85.0), Badge::High);
    assert_eq!(billable_badge(60.0), Badge::Medium);
  }

  #[test]
  fn test_sort_toggles_direction() {
    let clients = vec![
      client("Beta", 200.0, 0.0, 1.0),
      client("alpha", 300.0, 0.0, 1.0),
      client("Gamma", 100.0, 0.0, 1.0),
    ];
    let mut sort = SortState::default();

    sort.select(ClientColumn::Revenue);
    let names: Vec<_> = sort.apply(&clients).into_iter().map(|c| c.client_name).collect();
    assert_eq!(names, ["alpha", "Beta", "Gamma"]);

    sort.select(ClientColumn::Revenue);
    let names: Vec<_> = sort.apply(&clients).into_iter().map(|c| c.client_name).collect();
    assert_eq!(names, ["Gamma", "Beta", "alpha"]);

    sort.select(ClientColumn::Name);
    assert!(!sort.ascending);
    let names: Vec<_> = sort.apply(&clients).into_iter().map(|c| c.client_name).collect();
    assert_eq!(names, ["alpha", "Beta", "Gamma"]);
  }

  #[test]
  fn test_unsorted_keeps_input_order() {
    let clients = vec![client("B", 1.0, 0.0, 0.0), client("A", 2.0, 0.0, 0.0)];
    assert_eq!(SortState::default().apply(&clients), clients);
  }

  #[test]
  fn test_monthly_comparisons() {
    let data = vec![
      month("2023-05", 800.0, 400.0, 100.0),
      month("2024-04", 1000.0, 500.0, 100.0),
      month("2024-05", 1200.0, 720.0, 110.0),
    ];
    let today = NaiveDate::from_ymd_opt(2024, 5, 14).unwrap();
    let (mom, yoy) = monthly_comparisons(&data, today);

    let mom = mom.unwrap();
    assert_eq!(mom.revenue.delta, 200.0);
    assert_eq!(mom.revenue.change, 20.0);
    assert_eq!(mom.margin.current, 60.0);
    assert_eq!(mom.margin.change, 10.0);
    assert_eq!(mom.hours.change, 10.0);

    let yoy = yoy.unwrap();
    assert_eq!(yoy.revenue.change, 50.0);
  }

  #[test]
  fn test_comparisons_missing_months() {
    let data = vec![month("2024-05", 1.0, 1.0, 1.0)];
    let today = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
    assert_eq!(monthly_comparisons(&data, today), (None, None));
  }

  #[test]
  fn test_performance_estimates() {
    let employees = vec![EmployeeHours {
      employee_id: None,
      employee_name: "Ada".to_string(),
      total_hours: 100.0,
    }];
    let rows = performance(&employees);
    assert_eq!(rows[0].billable_hours, 85.0);
    assert_eq!(rows[0].billable_rate, 85.0);
    assert_eq!(rows[0].revenue, 8500.0);
    assert_eq!(rows[0].cost, 5000.0);
    assert_eq!(rows[0].profit, 3500.0);
  }

  #[test]
  fn test_hours_share() {
    let rows = vec![("Ada", 25.0), ("Bob", 75.0)];
    let shares = hours_share(rows.into_iter());
    assert_eq!(shares[0], ("Bob".to_string(), 75.0, 75.0));
    assert_eq!(shares[1].2, 25.0);
  }

  #[test]
  fn test_budget_summary() {
    let budget = |b: f64, a: f64| ClientBudget {
      client_name: "x".into(),
      budgeted_hours: b,
      actual_hours: a,
      remaining_hours: b - a,
      progress_pct: 0.0,
      pace_diff: 0.0,
      status: Default::default(),
      employees: vec![],
    };
    let progress = BudgetProgress {
      month_progress_pct: 50.0,
      clients: vec![budget(10.0, 4.0), budget(20.0, 25.0)],
    };
    let summary = budget_summary(&progress);
    assert_eq!(summary.budgeted, 30.0);
    assert_eq!(summary.actual, 29.0);
    assert_eq!(summary.remaining, 1.0);
  }

  fn check(source: &str, at: &str, status: SourceStatus) -> HealthCheck {
    HealthCheck {
      source_name: source.to_string(),
      status,
      check_timestamp: at.to_string(),
      latest_data_date: None,
      days_lag: None,
      row_count_last_7d: None,
      alert_reason: None,
    }
  }

  #[test]
  fn test_health_timeline_groups_by_day() {
    let history = vec![
      check("xero", "2024-05-02T06:00:00Z", SourceStatus::Critical),
      check("harvest", "2024-05-01T06:00:00Z", SourceStatus::Ok),
      check("xero", "2024-05-01T06:00:00Z", SourceStatus::Warning),
      check("xero", "2024-05-02T18:00:00Z", SourceStatus::Ok),
      check("harvest", "bad", SourceStatus::Ok),
    ];
    let days = health_timeline(&history);
    assert_eq!(days.len(), 2);
    assert_eq!(days[0].date, "2024-05-01");
    assert_eq!(days[0].score(), 75.0);
    // Later check on the same day wins
    assert_eq!(days[1].statuses["xero"], SourceStatus::Ok);
    assert_eq!(days[1].score(), 100.0);
    assert_eq!(HealthDay::default().score(), 0.0);
  }

  #[test]
  fn test_paid_media_figures() {
    assert_eq!(cost_per(500.0, 20.0), Some(25.0));
    assert_eq!(cost_per(500.0, 0.0), None);

    let platform = |name: &str, spend: f64| PlatformSpend {
      platform: name.to_string(),
      spend,
      impressions: 0.0,
      clicks: 0.0,
      ctr: 0.0,
      leads: 0.0,
      conversions: 0.0,
    };
    let mut media = PaidMedia {
      platform_breakdown: vec![platform("google", 250.0), platform("meta", 750.0)],
      ..PaidMedia::default()
    };
    let shares = platform_shares(&media);
    assert_eq!(shares[0], ("meta".to_string(), 750.0, 75.0));

    media.summary.total_spend = 2000.0;
    assert_eq!(platform_shares(&media)[1].2, 13.0);
  }
}
