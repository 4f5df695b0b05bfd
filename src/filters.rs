//! Date range and toggle filters shared by every tab.

use chrono::{Datelike, Duration, NaiveDate};

use crate::config::DisplayConfig;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Quick date ranges relative to today
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePreset {
  Last7Days,
  Last30Days,
  Last90Days,
  LastMonth,
  YearToDate,
  All,
}

impl DatePreset {
  pub const ALL: [DatePreset; 6] = [
    DatePreset::Last7Days,
    DatePreset::Last30Days,
    DatePreset::Last90Days,
    DatePreset::LastMonth,
    DatePreset::YearToDate,
    DatePreset::All,
  ];

  pub fn name(&self) -> &'static str {
    match self {
      DatePreset::Last7Days => "7days",
      DatePreset::Last30Days => "30days",
      DatePreset::Last90Days => "90days",
      DatePreset::LastMonth => "lastmonth",
      DatePreset::YearToDate => "ytd",
      DatePreset::All => "all",
    }
  }

  pub fn from_name(name: &str) -> Option<Self> {
    let name = name.trim().to_lowercase();
    Self::ALL.iter().copied().find(|p| p.name() == name)
  }

  pub fn next(&self) -> Self {
    let idx = Self::ALL.iter().position(|p| p == self).unwrap_or(0);
    Self::ALL[(idx + 1) % Self::ALL.len()]
  }

  pub fn previous(&self) -> Self {
    let idx = Self::ALL.iter().position(|p| p == self).unwrap_or(0);
    Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
  }

  /// Inclusive range and display label for this preset, relative to `today`.
  pub fn resolve(
    &self,
    today: NaiveDate,
    display: &DisplayConfig,
  ) -> (Option<NaiveDate>, Option<NaiveDate>, String) {
    match self {
      DatePreset::Last7Days => (
        Some(today - Duration::days(7)),
        Some(today),
        "Last 7 days".to_string(),
      ),
      DatePreset::Last30Days => (
        Some(today - Duration::days(30)),
        Some(today),
        "Last 30 days".to_string(),
      ),
      DatePreset::Last90Days => (
        Some(today - Duration::days(90)),
        Some(today),
        "Last 90 days".to_string(),
      ),
      DatePreset::LastMonth => {
        let (first, last) = previous_month(today);
        let label = format!("{} {}", display.month_name(first.month()), first.year());
        (Some(first), Some(last), label)
      }
      DatePreset::YearToDate => (
        NaiveDate::from_ymd_opt(today.year(), 1, 1),
        Some(today),
        "Year to date".to_string(),
      ),
      DatePreset::All => (None, None, "All data".to_string()),
    }
  }
}

/// First and last day of the month before `today`'s month.
pub fn previous_month(today: NaiveDate) -> (NaiveDate, NaiveDate) {
  let first_of_this_month = today.with_day(1).unwrap_or(today);
  let last = first_of_this_month - Duration::days(1);
  let first = last.with_day(1).unwrap_or(last);
  (first, last)
}

/// Parse a command-line date argument; "-" means "no bound".
pub fn parse_date_arg(arg: &str) -> Result<Option<NaiveDate>, String> {
  let arg = arg.trim();
  if arg.is_empty() || arg == "-" {
    return Ok(None);
  }
  NaiveDate::parse_from_str(arg, DATE_FORMAT)
    .map(Some)
    .map_err(|_| format!("Invalid date '{}', expected YYYY-MM-DD", arg))
}

/// Current filter selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filters {
  pub date_from: Option<NaiveDate>,
  pub date_to: Option<NaiveDate>,
  /// Include the founder's internal hours in financial endpoints
  pub include_paul: bool,
  /// Preset that produced the current range, None for a custom range
  pub preset: Option<DatePreset>,
  pub label: String,
}

impl Filters {
  /// Filters at startup: last month, toggle off.
  pub fn new(today: NaiveDate, display: &DisplayConfig) -> Self {
    let mut filters = Self {
      date_from: None,
      date_to: None,
      include_paul: false,
      preset: None,
      label: String::new(),
    };
    filters.apply_preset(DatePreset::LastMonth, today, display);
    filters
  }

  pub fn apply_preset(&mut self, preset: DatePreset, today: NaiveDate, display: &DisplayConfig) {
    let (from, to, label) = preset.resolve(today, display);
    self.date_from = from;
    self.date_to = to;
    self.preset = Some(preset);
    self.label = label;
  }

  pub fn apply_range(&mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<(), String> {
    if let (Some(f), Some(t)) = (from, to) {
      if f > t {
        return Err(format!("Start date {} is after end date {}", f, t));
      }
    }
    self.date_from = from;
    self.date_to = to;
    self.preset = None;
    self.label = match (from, to) {
      (Some(f), Some(t)) => format!("{} - {}", f.format(DATE_FORMAT), t.format(DATE_FORMAT)),
      (Some(f), None) => format!("Since {}", f.format(DATE_FORMAT)),
      (None, Some(t)) => format!("Until {}", t.format(DATE_FORMAT)),
      (None, None) => "All data".to_string(),
    };
    Ok(())
  }

  pub fn toggle_include_paul(&mut self) {
    self.include_paul = !self.include_paul;
  }

  /// Query parameters for an endpoint. `with_toggle` is set for endpoints
  /// that understand `include_paul`.
  pub fn params(&self, with_toggle: bool) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    if let Some(from) = self.date_from {
      params.push(("date_from", from.format(DATE_FORMAT).to_string()));
    }
    if let Some(to) = self.date_to {
      params.push(("date_to", to.format(DATE_FORMAT).to_string()));
    }
    if with_toggle && self.include_paul {
      params.push(("include_paul", "true".to_string()));
    }
    params
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  #[test]
  fn test_default_is_last_month() {
    let filters = Filters::new(date(2024, 3, 15), &DisplayConfig::default());
    assert_eq!(filters.date_from, Some(date(2024, 2, 1)));
    assert_eq!(filters.date_to, Some(date(2024, 2, 29)));
    assert_eq!(filters.label, "February 2024");
    assert_eq!(filters.preset, Some(DatePreset::LastMonth));
    assert!(!filters.include_paul);
  }

  #[test]
  fn test_last_month_in_january() {
    assert_eq!(
      previous_month(date(2024, 1, 10)),
      (date(2023, 12, 1), date(2023, 12, 31))
    );
  }

  #[test]
  fn test_presets_resolve() {
    let display = DisplayConfig::default();
    let today = date(2024, 5, 20);
    let mut filters = Filters::new(today, &display);

    filters.apply_preset(DatePreset::Last7Days, today, &display);
    assert_eq!(filters.date_from, Some(date(2024, 5, 13)));
    assert_eq!(filters.date_to, Some(today));

    filters.apply_preset(DatePreset::YearToDate, today, &display);
    assert_eq!(filters.date_from, Some(date(2024, 1, 1)));
    assert_eq!(filters.label, "Year to date");

    filters.apply_preset(DatePreset::All, today, &display);
    assert_eq!(filters.date_from, None);
    assert_eq!(filters.date_to, None);
    assert!(filters.params(true).is_empty());
  }

  #[test]
  fn test_params_include_toggle_only_when_supported() {
    let mut filters = Filters::new(date(2024, 2, 10), &DisplayConfig::default());
    filters.toggle_include_paul();

    let with = filters.params(true);
    assert_eq!(
      with,
      vec![
        ("date_from", "2024-01-01".to_string()),
        ("date_to", "2024-01-31".to_string()),
        ("include_paul", "true".to_string()),
      ]
    );
    assert_eq!(filters.params(false).len(), 2);
  }

  #[test]
  fn test_custom_range_labels() {
    let mut filters = Filters::new(date(2024, 2, 10), &DisplayConfig::default());
    filters
      .apply_range(Some(date(2024, 1, 5)), None)
      .unwrap();
    assert_eq!(filters.label, "Since 2024-01-05");
    assert_eq!(filters.preset, None);

    filters.apply_range(None, Some(date(2024, 1, 9))).unwrap();
    assert_eq!(filters.label, "Until 2024-01-09");

    assert!(filters
      .apply_range(Some(date(2024, 2, 1)), Some(date(2024, 1, 1)))
      .is_err());
  }

  #[test]
  fn test_preset_cycle_and_names() {
    assert_eq!(DatePreset::All.next(), DatePreset::Last7Days);
    assert_eq!(DatePreset::Last7Days.previous(), DatePreset::All);
    assert_eq!(DatePreset::from_name(" YTD "), Some(DatePreset::YearToDate));
    assert_eq!(DatePreset::from_name("decade"), None);
  }

  #[test]
  fn test_parse_date_arg() {
    assert_eq!(parse_date_arg("-"), Ok(None));
    assert_eq!(parse_date_arg("2024-01-31"), Ok(Some(date(2024, 1, 31))));
    assert!(parse_date_arg("31/01/2024").is_err());
  }
}
