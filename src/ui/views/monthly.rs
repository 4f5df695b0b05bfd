use chrono::NaiveDate;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Cell, Paragraph, Row, Table, TableState};

use super::{ensure_valid_selection, panel, render_bars, render_placeholder};
use crate::api::types::MonthlyTotal;
use crate::config::DisplayConfig;
use crate::metrics::{self, Comparison};
use crate::query::Query;
use crate::tabs::Tab;
use crate::ui::memo::{Bar, ChartSlot, PreparedChart, RenderKey};
use crate::ui::renderfns::{change_color, format_change, format_gbp, format_hours};
use crate::ui::view::{LoadContext, RenderContext, View};

/// Monthly totals with month-over-month and year-over-year trends
#[derive(Default)]
pub struct MonthlyView {
  query: Query<Vec<MonthlyTotal>>,
  table_state: TableState,
}

impl MonthlyView {
  pub fn new() -> Self {
    Self::default()
  }
}

/// "2024-03" -> "Mar 24" using the configured month names
fn short_month(key: &str, display: &DisplayConfig) -> String {
  let Some((year, month)) = key.split_once('-') else {
    return key.to_string();
  };
  let Ok(month) = month.parse::<u32>() else {
    return key.to_string();
  };
  let name: String = display.month_name(month).chars().take(3).collect();
  format!("{} {}", name, year.get(2..).unwrap_or(year))
}

fn profit_chart(months: &[MonthlyTotal], display: &DisplayConfig) -> PreparedChart {
  PreparedChart {
    bars: months
      .iter()
      .map(|m| Bar {
        label: short_month(&m.month, display),
        value: m.profit.max(0.0).round() as u64,
        text: format_gbp(m.profit),
        color: Some(if m.profit < 0.0 { "red" } else { "green" }.to_string()),
      })
      .collect(),
  }
}

fn comparison_lines(label: &str, comparison: Option<Comparison>) -> Vec<Line<'static>> {
  let Some(c) = comparison else {
    return vec![Line::from(Span::styled(
      format!("{}: not enough data", label),
      Style::default().fg(Color::DarkGray),
    ))];
  };
  let item = |name: &str, change: f64, unit: &str| {
    vec![
      Span::styled(format!("{:<9}", name), Style::default().fg(Color::DarkGray)),
      Span::styled(
        format!("{:<9}", format_change(change, unit)),
        Style::default().fg(change_color(change)),
      ),
    ]
  };
  let mut first = item("Revenue", c.revenue.change, "%");
  first.extend(item("Profit", c.profit.change, "%"));
  let mut second = item("Margin", c.margin.change, " pts");
  second.extend(item("Hours", c.hours.change, "%"));
  vec![
    Line::from(Span::styled(label.to_string(), Style::default().bold())),
    Line::from(first),
    Line::from(second),
  ]
}

fn render_comparisons(frame: &mut Frame, area: Rect, data: &[MonthlyTotal], today: NaiveDate) {
  let (mom, yoy) = metrics::monthly_comparisons(data, today);
  let mut lines = comparison_lines("vs last month", mom);
  lines.push(Line::raw(""));
  lines.extend(comparison_lines("vs same month last year", yoy));
  frame.render_widget(Paragraph::new(lines).block(panel(" This month ")), area);
}

impl View for MonthlyView {
  fn tab(&self) -> Tab {
    Tab::Monthly
  }

  fn load(&mut self, ctx: &LoadContext) {
    let api = ctx.api.clone();
    let filters = ctx.filters.clone();
    self
      .query
      .run(ctx.epoch, async move { api.monthly(&filters).await });
  }

  fn needs_load(&self) -> bool {
    self.query.state().is_idle()
  }

  fn tick(&mut self) -> bool {
    self.query.poll()
  }

  fn handle_key(&mut self, key: KeyEvent, _ctx: &LoadContext) -> bool {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.table_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.table_state.select_previous(),
      _ => return false,
    }
    true
  }

  fn render(&mut self, frame: &mut Frame, area: Rect, ctx: &mut RenderContext) {
    if render_placeholder(frame, area, "Monthly", self.query.state(), |d| d.is_empty()) {
      return;
    }
    let months = match self.query.data() {
      Some(data) => data.clone(),
      None => return,
    };

    let cols = Layout::default()
      .direction(Direction::Horizontal)
      .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
      .split(area);
    let right = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(9), Constraint::Min(5)])
      .split(cols[1]);

    ensure_valid_selection(&mut self.table_state, months.len());
    let header = Row::new(["Month", "Revenue", "Cost", "Profit", "Margin", "Hours"])
      .style(Style::default().fg(Color::Yellow).bold());
    let rows: Vec<Row> = months
      .iter()
      .map(|m| {
        let margin = metrics::percent(m.profit, m.revenue);
        Row::new(vec![
          Cell::from(short_month(&m.month, ctx.display)),
          Cell::from(format_gbp(m.revenue)),
          Cell::from(format_gbp(m.cost)),
          Cell::from(format_gbp(m.profit)).style(Style::default().fg(change_color(m.profit))),
          Cell::from(format!("{:.0}%", margin)),
          Cell::from(format_hours(m.hours)),
        ])
      })
      .collect();
    let widths = [
      Constraint::Length(8),
      Constraint::Length(11),
      Constraint::Length(11),
      Constraint::Length(11),
      Constraint::Length(7),
      Constraint::Length(9),
    ];
    let table = Table::new(rows, widths)
      .header(header)
      .block(panel(format!(" Months ({}) ", months.len())))
      .row_highlight_style(Style::default().bg(Color::DarkGray))
      .highlight_symbol("> ");
    frame.render_stateful_widget(table, cols[0], &mut self.table_state);

    render_comparisons(frame, right[0], &months, ctx.today);

    let display = ctx.display;
    let chart = ctx.memo.prepare(ChartSlot::MonthlyProfit, RenderKey::of(&months), || {
      profit_chart(&months, display)
    });
    render_bars(frame, right[1], "Profit per month", chart);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_short_month() {
    let display = DisplayConfig::default();
    assert_eq!(short_month("2024-03", &display), "Mar 24");
    assert_eq!(short_month("garbage", &display), "garbage");
  }

  #[test]
  fn test_profit_chart_marks_losses() {
    let months = vec![MonthlyTotal {
      month: "2024-01".into(),
      hours: 10.0,
      cost: 500.0,
      revenue: 300.0,
      profit: -200.0,
    }];
    let chart = profit_chart(&months, &DisplayConfig::default());
    assert_eq!(chart.bars[0].value, 0);
    assert_eq!(chart.bars[0].text, "-£200");
    assert_eq!(chart.bars[0].color.as_deref(), Some("red"));
  }
}
