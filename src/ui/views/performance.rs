use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Cell, Paragraph, Row, Table, TableState};

use super::{ensure_valid_selection, panel, render_bars, render_placeholder};
use crate::api::types::EmployeeHours;
use crate::config::DisplayConfig;
use crate::metrics::{self, EmployeePerformance};
use crate::query::Query;
use crate::tabs::Tab;
use crate::ui::memo::{Bar, ChartSlot, PreparedChart, RenderKey};
use crate::ui::renderfns::{badge_color, format_gbp, format_hours, series_color, truncate};
use crate::ui::view::{LoadContext, RenderContext, View};

/// Estimated billable performance per employee
#[derive(Default)]
pub struct PerformanceView {
  query: Query<Vec<EmployeeHours>>,
  table_state: TableState,
}

impl PerformanceView {
  pub fn new() -> Self {
    Self::default()
  }
}

fn hours_chart(rows: &[EmployeePerformance], display: &DisplayConfig) -> PreparedChart {
  PreparedChart {
    bars: rows
      .iter()
      .enumerate()
      .map(|(i, r)| Bar {
        label: truncate(&r.employee_name, 14),
        value: r.total_hours.round() as u64,
        text: format_hours(r.total_hours),
        color: Some(series_color(display, &r.employee_name, i).to_string()),
      })
      .collect(),
  }
}

impl View for PerformanceView {
  fn tab(&self) -> Tab {
    Tab::Performance
  }

  fn load(&mut self, ctx: &LoadContext) {
    let api = ctx.api.clone();
    let filters = ctx.filters.clone();
    self
      .query
      .run(ctx.epoch, async move { api.employees(&filters).await });
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
    if render_placeholder(frame, area, "Performance", self.query.state(), |d| d.is_empty()) {
      return;
    }
    let employees = match self.query.data() {
      Some(data) => data.clone(),
      None => return,
    };
    let rows = metrics::performance(&employees);

    let layout = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Min(6), Constraint::Length(2)])
      .split(area);
    let cols = Layout::default()
      .direction(Direction::Horizontal)
      .constraints([Constraint::Percentage(62), Constraint::Percentage(38)])
      .split(layout[0]);

    ensure_valid_selection(&mut self.table_state, rows.len());
    let header = Row::new(["Employee", "Hours", "Billable", "Rate", "Revenue", "Cost", "Profit"])
      .style(Style::default().fg(Color::Yellow).bold());
    let body: Vec<Row> = rows
      .iter()
      .map(|r| {
        Row::new(vec![
          Cell::from(truncate(&r.employee_name, 24)),
          Cell::from(format_hours(r.total_hours)),
          Cell::from(format_hours(r.billable_hours)),
          Cell::from(format!("{:.0}%", r.billable_rate))
            .style(Style::default().fg(badge_color(metrics::billable_badge(r.billable_rate)))),
          Cell::from(format_gbp(r.revenue)),
          Cell::from(format_gbp(r.cost)),
          Cell::from(format_gbp(r.profit)),
        ])
      })
      .collect();
    let widths = [
      Constraint::Min(16),
      Constraint::Length(9),
      Constraint::Length(9),
      Constraint::Length(6),
      Constraint::Length(10),
      Constraint::Length(10),
      Constraint::Length(10),
    ];
    let table = Table::new(body, widths)
      .header(header)
      .block(panel(format!(" Team ({}) ", rows.len())))
      .row_highlight_style(Style::default().bg(Color::DarkGray))
      .highlight_symbol("> ");
    frame.render_stateful_widget(table, cols[0], &mut self.table_state);

    let display = ctx.display;
    let chart = ctx.memo.prepare(ChartSlot::PerformanceHours, RenderKey::of(&employees), || {
      hours_chart(&rows, display)
    });
    render_bars(frame, cols[1], "Hours logged", chart);

    let note = Paragraph::new(format!(
      " Estimates: {:.0}% of hours billable at {}/h, cost {}/h",
      metrics::BILLABLE_SHARE * 100.0,
      format_gbp(metrics::HOURLY_RATE_GBP),
      format_gbp(metrics::HOURLY_COST_GBP),
    ))
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(note, layout[1]);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_hours_chart_uses_configured_colors() {
    let mut display = DisplayConfig::default();
    display
      .employee_colors
      .insert("Ada".into(), "#00ff00".into());
    let rows = metrics::performance(&[EmployeeHours {
      employee_id: None,
      employee_name: "Ada".into(),
      total_hours: 12.4,
    }]);
    let chart = hours_chart(&rows, &display);
    assert_eq!(chart.bars[0].value, 12);
    assert_eq!(
      chart.bars[0].color.as_deref().and_then(|c| c.parse::<Color>().ok()),
      Some(Color::Rgb(0, 255, 0))
    );
  }
}
