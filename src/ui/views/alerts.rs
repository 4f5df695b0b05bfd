use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Cell, Row, Table, TableState};

use super::{ensure_valid_selection, panel, render_placeholder};
use crate::api::types::ProfitabilityAlert;
use crate::query::Query;
use crate::tabs::Tab;
use crate::ui::renderfns::{format_gbp, truncate};
use crate::ui::view::{LoadContext, RenderContext, View};

/// Clients with no revenue, a loss or a low margin
#[derive(Default)]
pub struct AlertsView {
  query: Query<Vec<ProfitabilityAlert>>,
  table_state: TableState,
}

impl AlertsView {
  pub fn new() -> Self {
    Self::default()
  }
}

fn describe(alert_type: &str) -> (&'static str, Color) {
  match alert_type {
    "NO_REVENUE" => ("No revenue", Color::Magenta),
    "LOSS" => ("Loss", Color::Red),
    "LOW_MARGIN" => ("Low margin", Color::Yellow),
    _ => ("Other", Color::Gray),
  }
}

fn amount(value: Option<f64>) -> String {
  value.map(format_gbp).unwrap_or_else(|| "-".to_string())
}

impl View for AlertsView {
  fn tab(&self) -> Tab {
    Tab::Alerts
  }

  fn load(&mut self, ctx: &LoadContext) {
    let api = ctx.api.clone();
    self.query.run(ctx.epoch, async move { api.alerts().await });
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

  fn render(&mut self, frame: &mut Frame, area: Rect, _ctx: &mut RenderContext) {
    if render_placeholder(frame, area, "Alerts", self.query.state(), |d| d.is_empty()) {
      return;
    }
    let alerts = self.query.data().cloned().unwrap_or_default();
    ensure_valid_selection(&mut self.table_state, alerts.len());

    let header = Row::new(["Client", "Alert", "Revenue", "Profit", "Margin"])
      .style(Style::default().fg(Color::Yellow).bold());
    let rows: Vec<Row> = alerts
      .iter()
      .map(|a| {
        let (label, color) = describe(&a.alert_type);
        Row::new(vec![
          Cell::from(truncate(&a.client_name, 28)),
          Cell::from(label).style(Style::default().fg(color).bold()),
          Cell::from(amount(a.total_revenue_gbp)),
          Cell::from(amount(a.total_profit_gbp)),
          Cell::from(
            a.margin_pct
              .map(|m| format!("{:.0}%", m))
              .unwrap_or_else(|| "-".to_string()),
          ),
        ])
      })
      .collect();
    let widths = [
      Constraint::Min(16),
      Constraint::Length(12),
      Constraint::Length(11),
      Constraint::Length(11),
      Constraint::Length(7),
    ];
    let table = Table::new(rows, widths)
      .header(header)
      .block(panel(format!(" Alerts ({}) ", alerts.len())))
      .row_highlight_style(Style::default().bg(Color::DarkGray))
      .highlight_symbol("> ");
    frame.render_stateful_widget(table, area, &mut self.table_state);
  }
}
