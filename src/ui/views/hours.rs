use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Cell, Row, Table, TableState};

use super::{ensure_valid_selection, panel, render_bars, render_placeholder};
use crate::api::types::{ClientWithHours, EmployeeHours};
use crate::config::DisplayConfig;
use crate::metrics;
use crate::query::Query;
use crate::tabs::Tab;
use crate::ui::memo::{Bar, ChartSlot, PreparedChart, RenderKey};
use crate::ui::renderfns::{format_hours, series_color, truncate};
use crate::ui::view::{LoadContext, RenderContext, ShortcutInfo, View};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Focus {
  #[default]
  Employees,
  Clients,
}

/// Hours per employee and per client, with each one's share of the total
#[derive(Default)]
pub struct HoursView {
  employees: Query<Vec<EmployeeHours>>,
  clients: Query<Vec<ClientWithHours>>,
  employee_state: TableState,
  client_state: TableState,
  focus: Focus,
}

impl HoursView {
  pub fn new() -> Self {
    Self::default()
  }

  fn focused_state(&mut self) -> &mut TableState {
    match self.focus {
      Focus::Employees => &mut self.employee_state,
      Focus::Clients => &mut self.client_state,
    }
  }
}

fn share_table(title: &str, rows: &[(String, f64, f64)], focused: bool) -> Table<'static> {
  let header = Row::new(["Name", "Hours", "Share"]).style(Style::default().fg(Color::Yellow).bold());
  let body: Vec<Row> = rows
    .iter()
    .map(|(name, hours, share)| {
      Row::new(vec![
        Cell::from(truncate(name, 28)),
        Cell::from(format_hours(*hours)),
        Cell::from(format!("{:.0}%", share)),
      ])
    })
    .collect();
  let border = if focused { Color::Cyan } else { Color::Blue };
  Table::new(
    body,
    [Constraint::Min(14), Constraint::Length(9), Constraint::Length(6)],
  )
  .header(header)
  .block(panel(format!(" {} ({}) ", title, rows.len())).border_style(Style::default().fg(border)))
  .row_highlight_style(Style::default().bg(Color::DarkGray))
}

fn share_chart(shares: &[(String, f64, f64)], display: &DisplayConfig) -> PreparedChart {
  PreparedChart {
    bars: shares
      .iter()
      .enumerate()
      .map(|(i, (name, hours, share))| Bar {
        label: truncate(name, 14),
        value: hours.round() as u64,
        text: format!("{} ({:.0}%)", format_hours(*hours), share),
        color: Some(series_color(display, name, i).to_string()),
      })
      .collect(),
  }
}

impl View for HoursView {
  fn tab(&self) -> Tab {
    Tab::Hours
  }

  fn load(&mut self, ctx: &LoadContext) {
    let api = ctx.api.clone();
    let filters = ctx.filters.clone();
    self
      .employees
      .run(ctx.epoch, async move { api.employees(&filters).await });

    let api = ctx.api.clone();
    let filters = ctx.filters.clone();
    self
      .clients
      .run(ctx.epoch, async move { api.clients_with_hours(&filters).await });
  }

  fn needs_load(&self) -> bool {
    self.employees.state().is_idle() || self.clients.state().is_idle()
  }

  fn tick(&mut self) -> bool {
    // Poll both; no short-circuit
    let a = self.employees.poll();
    let b = self.clients.poll();
    a || b
  }

  fn handle_key(&mut self, key: KeyEvent, _ctx: &LoadContext) -> bool {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.focused_state().select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.focused_state().select_previous(),
      KeyCode::Char('h') | KeyCode::Left => self.focus = Focus::Employees,
      KeyCode::Char('l') | KeyCode::Right => self.focus = Focus::Clients,
      _ => return false,
    }
    true
  }

  fn render(&mut self, frame: &mut Frame, area: Rect, ctx: &mut RenderContext) {
    let cols = Layout::default()
      .direction(Direction::Horizontal)
      .constraints([
        Constraint::Percentage(32),
        Constraint::Percentage(32),
        Constraint::Percentage(36),
      ])
      .split(area);

    let employees = self.employees.data().cloned();
    if !render_placeholder(frame, cols[0], "Employees", self.employees.state(), |d| d.is_empty()) {
      let employees = employees.unwrap_or_default();
      let shares = metrics::hours_share(
        employees
          .iter()
          .map(|e| (e.employee_name.as_str(), e.total_hours)),
      );
      ensure_valid_selection(&mut self.employee_state, shares.len());
      let table = share_table("Employees", &shares, self.focus == Focus::Employees);
      frame.render_stateful_widget(table, cols[0], &mut self.employee_state);

      let display = ctx.display;
      let chart = ctx.memo.prepare(ChartSlot::HoursShare, RenderKey::of(&employees), || {
        share_chart(&shares, display)
      });
      render_bars(frame, cols[2], "Share of hours", chart);
    }

    let clients = self.clients.data().cloned();
    if !render_placeholder(frame, cols[1], "Clients", self.clients.state(), |d| d.is_empty()) {
      let clients = clients.unwrap_or_default();
      let shares = metrics::hours_share(
        clients
          .iter()
          .map(|c| (c.client_name.as_str(), c.total_hours)),
      );
      ensure_valid_selection(&mut self.client_state, shares.len());
      let table = share_table("Clients", &shares, self.focus == Focus::Clients);
      frame.render_stateful_widget(table, cols[1], &mut self.client_state);
    }
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("j/k", "select").with_priority(50),
      ShortcutInfo::new("h/l", "switch table").with_priority(51),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_share_chart_labels() {
    let shares = vec![("Ada".to_string(), 30.0, 75.0), ("Bob".to_string(), 10.0, 25.0)];
    let chart = share_chart(&shares, &DisplayConfig::default());
    assert_eq!(chart.bars.len(), 2);
    assert_eq!(chart.bars[0].text, "30.0h (75%)");
    assert_ne!(chart.bars[0].color, chart.bars[1].color);
  }
}
