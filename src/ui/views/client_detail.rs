use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Cell, Paragraph, Row, Sparkline, Table, TableState};
use std::collections::BTreeMap;

use super::{ensure_valid_selection, panel, render_bars, render_placeholder};
use crate::api::types::{ClientTimeline, ClientWithHours, DailyHours};
use crate::config::DisplayConfig;
use crate::query::{Query, QueryState};
use crate::tabs::Tab;
use crate::ui::memo::{Bar, ChartSlot, PreparedChart, RenderKey};
use crate::ui::renderfns::{format_hours, series_color, truncate};
use crate::ui::view::{LoadContext, RenderContext, ShortcutInfo, View};

/// Day-by-day hours for one client, chosen from the clients with hours
#[derive(Default)]
pub struct ClientDetailView {
  clients: Query<Vec<ClientWithHours>>,
  timeline: Query<ClientTimeline>,
  list_state: TableState,
  /// Client whose timeline is shown
  selected: Option<ClientWithHours>,
}

impl ClientDetailView {
  pub fn new() -> Self {
    Self::default()
  }

  fn load_timeline(&mut self, ctx: &LoadContext) {
    let Some(client) = &self.selected else {
      self.timeline.reset();
      return;
    };
    let api = ctx.api.clone();
    let filters = ctx.filters.clone();
    let id = client.client_id.clone();
    self
      .timeline
      .run(ctx.epoch, async move { api.client_timeline(&id, &filters).await });
  }

  fn open_selected(&mut self, ctx: &LoadContext) -> bool {
    let Some(idx) = self.list_state.selected() else {
      return false;
    };
    let Some(client) = self.clients.data().and_then(|c| c.get(idx)).cloned() else {
      return false;
    };
    tracing::debug!(client = %client.client_id, "opening client timeline");
    self.selected = Some(client);
    self.load_timeline(ctx);
    true
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    if render_placeholder(frame, area, "Clients", self.clients.state(), |d| d.is_empty()) {
      return;
    }
    let clients = self.clients.data().cloned().unwrap_or_default();
    ensure_valid_selection(&mut self.list_state, clients.len());

    let open_id = self.selected.as_ref().map(|c| c.client_id.as_str());
    let rows: Vec<Row> = clients
      .iter()
      .map(|c| {
        let style = if Some(c.client_id.as_str()) == open_id {
          Style::default().fg(Color::Cyan)
        } else {
          Style::default()
        };
        Row::new(vec![
          Cell::from(truncate(&c.client_name, 24)),
          Cell::from(format_hours(c.total_hours)),
        ])
        .style(style)
      })
      .collect();
    let table = Table::new(rows, [Constraint::Min(12), Constraint::Length(9)])
      .block(panel(format!(" Clients ({}) ", clients.len())))
      .row_highlight_style(Style::default().bg(Color::DarkGray))
      .highlight_symbol("> ");
    frame.render_stateful_widget(table, area, &mut self.list_state);
  }

  fn render_timeline(&mut self, frame: &mut Frame, area: Rect, ctx: &mut RenderContext) {
    let Some(client) = &self.selected else {
      let hint = Paragraph::new("Select a client and press Enter to see its timeline.")
        .block(panel(" Timeline "))
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(hint, area);
      return;
    };
    let title = client.client_name.clone();
    if render_placeholder(frame, area, &title, self.timeline.state(), |t| {
      t.daily.is_empty() && t.totals.is_empty()
    }) {
      return;
    }
    let QueryState::Success(timeline) = self.timeline.state() else {
      return;
    };
    let timeline = timeline.clone();

    let rows = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(5), Constraint::Min(5)])
      .split(area);
    let cols = Layout::default()
      .direction(Direction::Horizontal)
      .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
      .split(rows[1]);

    let days = daily_totals(&timeline.daily);
    let series: Vec<u64> = days.iter().map(|(_, h)| (h * 10.0).round() as u64).collect();
    let total: f64 = days.iter().map(|(_, h)| h).sum();
    let spark = Sparkline::default()
      .block(panel(format!(
        " {} · {} over {} days ",
        title,
        format_hours(total),
        days.len()
      )))
      .data(&series)
      .style(Style::default().fg(Color::Cyan));
    frame.render_widget(spark, rows[0]);

    let body: Vec<Row> = timeline
      .daily
      .iter()
      .map(|d| {
        Row::new(vec![
          Cell::from(d.date.clone()),
          Cell::from(truncate(&d.employee_name, 20)),
          Cell::from(format_hours(d.hours)),
        ])
      })
      .collect();
    let table = Table::new(
      body,
      [Constraint::Length(11), Constraint::Min(10), Constraint::Length(8)],
    )
    .header(Row::new(["Date", "Employee", "Hours"]).style(Style::default().fg(Color::Yellow).bold()))
    .block(panel(" Entries "));
    frame.render_widget(table, cols[0]);

    let display = ctx.display;
    let chart = ctx.memo.prepare(ChartSlot::ClientTimeline, RenderKey::of(&timeline), || {
      totals_chart(&timeline, display)
    });
    render_bars(frame, cols[1], "Hours per employee", chart);
  }
}

/// Hours per date across employees, in date order
fn daily_totals(daily: &[DailyHours]) -> Vec<(String, f64)> {
  let mut by_date: BTreeMap<&str, f64> = BTreeMap::new();
  for entry in daily {
    *by_date.entry(entry.date.as_str()).or_default() += entry.hours;
  }
  by_date.into_iter().map(|(d, h)| (d.to_string(), h)).collect()
}

fn totals_chart(timeline: &ClientTimeline, display: &DisplayConfig) -> PreparedChart {
  let mut totals = timeline.totals.clone();
  totals.sort_by(|a, b| b.total_hours.total_cmp(&a.total_hours));
  PreparedChart {
    bars: totals
      .iter()
      .enumerate()
      .map(|(i, t)| Bar {
        label: truncate(&t.employee_name, 14),
        value: t.total_hours.round() as u64,
        text: format_hours(t.total_hours),
        color: Some(series_color(display, &t.employee_name, i).to_string()),
      })
      .collect(),
  }
}

impl View for ClientDetailView {
  fn tab(&self) -> Tab {
    Tab::ClientDetail
  }

  fn load(&mut self, ctx: &LoadContext) {
    let api = ctx.api.clone();
    let filters = ctx.filters.clone();
    self
      .clients
      .run(ctx.epoch, async move { api.clients_with_hours(&filters).await });
    self.load_timeline(ctx);
  }

  fn needs_load(&self) -> bool {
    self.clients.state().is_idle() || (self.selected.is_some() && self.timeline.state().is_idle())
  }

  fn tick(&mut self) -> bool {
    let a = self.clients.poll();
    let b = self.timeline.poll();
    a || b
  }

  fn handle_key(&mut self, key: KeyEvent, ctx: &LoadContext) -> bool {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Enter => return self.open_selected(ctx),
      KeyCode::Esc if self.selected.is_some() => {
        self.selected = None;
        self.timeline.reset();
      }
      _ => return false,
    }
    true
  }

  fn render(&mut self, frame: &mut Frame, area: Rect, ctx: &mut RenderContext) {
    let cols = Layout::default()
      .direction(Direction::Horizontal)
      .constraints([Constraint::Length(36), Constraint::Min(20)])
      .split(area);
    self.render_list(frame, cols[0]);
    self.render_timeline(frame, cols[1], ctx);
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("j/k", "select").with_priority(50),
      ShortcutInfo::new("enter", "open").with_priority(51),
      ShortcutInfo::new("esc", "close").with_priority(52),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::types::EmployeeTotal;

  fn day(date: &str, who: &str, hours: f64) -> DailyHours {
    DailyHours {
      date: date.into(),
      employee_name: who.into(),
      hours,
    }
  }

  #[test]
  fn test_daily_totals_sum_per_date() {
    let days = daily_totals(&[
      day("2024-01-02", "Ada", 2.0),
      day("2024-01-01", "Bob", 1.5),
      day("2024-01-02", "Bob", 3.0),
    ]);
    assert_eq!(
      days,
      vec![("2024-01-01".to_string(), 1.5), ("2024-01-02".to_string(), 5.0)]
    );
  }

  #[test]
  fn test_totals_chart_sorted_by_hours() {
    let timeline = ClientTimeline {
      client_name: "Acme".into(),
      daily: vec![],
      totals: vec![
        EmployeeTotal {
          employee_name: "Ada".into(),
          total_hours: 2.0,
        },
        EmployeeTotal {
          employee_name: "Bob".into(),
          total_hours: 8.0,
        },
      ],
    };
    let chart = totals_chart(&timeline, &DisplayConfig::default());
    assert_eq!(chart.bars[0].label, "Bob");
    assert_eq!(chart.bars[1].value, 2);
  }
}
