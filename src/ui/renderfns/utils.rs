use ratatui::prelude::Color;
use std::str::FromStr;

use crate::api::types::{BudgetStatus, SourceStatus};
use crate::config::DisplayConfig;
use crate::metrics::Badge;

/// Truncate a string to a maximum length in characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

fn group_thousands(whole: u64) -> String {
  let digits = whole.to_string();
  let mut out = String::with_capacity(digits.len() + digits.len() / 3);
  for (i, c) in digits.chars().enumerate() {
    if i > 0 && (digits.len() - i) % 3 == 0 {
      out.push(',');
    }
    out.push(c);
  }
  out
}

/// Whole pounds with thousands separators: "£12,345", "-£80"
pub fn format_gbp(amount: f64) -> String {
  let rounded = amount.round();
  let sign = if rounded < 0.0 { "-" } else { "" };
  format!("{}£{}", sign, group_thousands(rounded.abs() as u64))
}

/// Hours with one decimal: "12.5h"
pub fn format_hours(hours: f64) -> String {
  format!("{:.1}h", hours)
}

/// Signed change: "+12%", "-3 pts"
pub fn format_change(change: f64, unit: &str) -> String {
  let sign = if change > 0.0 { "+" } else { "" };
  format!("{}{:.0}{}", sign, change, unit)
}

pub fn badge_color(badge: Badge) -> Color {
  match badge {
    Badge::High => Color::Green,
    Badge::Medium => Color::Yellow,
    Badge::Low => Color::Red,
  }
}

/// Green for growth, red for decline
pub fn change_color(change: f64) -> Color {
  if change > 0.0 {
    Color::Green
  } else if change < 0.0 {
    Color::Red
  } else {
    Color::Gray
  }
}

pub fn budget_color(status: &BudgetStatus) -> Color {
  match status {
    BudgetStatus::Ok => Color::Green,
    BudgetStatus::Warning => Color::Yellow,
    BudgetStatus::Over => Color::Red,
    BudgetStatus::Unknown => Color::Gray,
  }
}

pub fn source_status_color(status: &SourceStatus) -> Color {
  match status {
    SourceStatus::Ok => Color::Green,
    SourceStatus::Warning => Color::Yellow,
    SourceStatus::Critical => Color::Red,
    SourceStatus::Unknown => Color::Gray,
  }
}

/// Parse "#RRGGBB" (or a named color) from config
pub fn parse_color(value: &str) -> Option<Color> {
  Color::from_str(value.trim()).ok()
}

/// Color for a named series: the configured employee color, else a palette
/// entry picked by position.
pub fn series_color(display: &DisplayConfig, name: &str, index: usize) -> Color {
  display
    .employee_colors
    .get(name)
    .and_then(|c| parse_color(c))
    .or_else(|| {
      if display.palette.is_empty() {
        None
      } else {
        parse_color(&display.palette[index % display.palette.len()])
      }
    })
    .unwrap_or(Color::Cyan)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_truncate() {
    assert_eq!(truncate("hello", 10), "hello");
    assert_eq!(truncate("hello", 5), "hello");
    assert_eq!(truncate("hello world", 8), "hello...");
    assert_eq!(truncate("café crème", 7), "café...");
  }

  #[test]
  fn test_format_gbp() {
    assert_eq!(format_gbp(0.0), "£0");
    assert_eq!(format_gbp(999.4), "£999");
    assert_eq!(format_gbp(12345.6), "£12,346");
    assert_eq!(format_gbp(-1_234_567.0), "-£1,234,567");
  }

  #[test]
  fn test_format_hours_and_change() {
    assert_eq!(format_hours(12.26), "12.3h");
    assert_eq!(format_change(12.0, "%"), "+12%");
    assert_eq!(format_change(-3.0, " pts"), "-3 pts");
    assert_eq!(format_change(0.0, "%"), "0%");
  }

  #[test]
  fn test_series_color() {
    let mut display = DisplayConfig::default();
    display
      .employee_colors
      .insert("Ada".to_string(), "#ff0000".to_string());
    assert_eq!(series_color(&display, "Ada", 3), Color::Rgb(255, 0, 0));
    assert_eq!(series_color(&display, "Bob", 0), Color::Rgb(0x3b, 0x82, 0xf6));

    display.palette.clear();
    assert_eq!(series_color(&display, "Bob", 0), Color::Cyan);
  }

  #[test]
  fn test_budget_color() {
    assert_eq!(budget_color(&BudgetStatus::Over), Color::Red);
    assert_eq!(budget_color(&BudgetStatus::Ok), Color::Green);
  }
}
