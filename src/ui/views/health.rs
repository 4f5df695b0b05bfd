use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Cell, Paragraph, Row, Table, TableState};
use std::collections::BTreeSet;

use super::{ensure_valid_selection, panel, render_bars, render_placeholder};
use crate::api::types::{HealthCheck, SourceStatus};
use crate::metrics::{self, HealthDay};
use crate::query::Query;
use crate::tabs::Tab;
use crate::ui::memo::{Bar, ChartSlot, PreparedChart, RenderKey};
use crate::ui::renderfns::{source_status_color, truncate};
use crate::ui::view::{LoadContext, RenderContext, View};

/// Days of check history shown in the timeline
const HISTORY_DAYS: u32 = 30;

/// Freshness of the upstream data sources
#[derive(Default)]
pub struct HealthView {
  latest: Query<Vec<HealthCheck>>,
  history: Query<Vec<HealthCheck>>,
  table_state: TableState,
}

impl HealthView {
  pub fn new() -> Self {
    Self::default()
  }

  fn render_latest(&mut self, frame: &mut Frame, area: Rect) {
    if render_placeholder(frame, area, "Sources", self.latest.state(), |d| d.is_empty()) {
      return;
    }
    let checks = self.latest.data().cloned().unwrap_or_default();
    ensure_valid_selection(&mut self.table_state, checks.len());

    let failing = checks
      .iter()
      .filter(|c| c.status != SourceStatus::Ok)
      .count();
    let header = Row::new(["Source", "Status", "Latest data", "Lag", "Rows 7d", "Reason"])
      .style(Style::default().fg(Color::Yellow).bold());
    let rows: Vec<Row> = checks
      .iter()
      .map(|c| {
        Row::new(vec![
          Cell::from(truncate(&c.source_name, 20)),
          Cell::from(status_label(&c.status))
            .style(Style::default().fg(source_status_color(&c.status)).bold()),
          Cell::from(c.latest_data_date.clone().unwrap_or_else(|| "-".to_string())),
          Cell::from(lag_label(c.days_lag)),
          Cell::from(
            c.row_count_last_7d
              .map(|n| n.to_string())
              .unwrap_or_else(|| "-".to_string()),
          ),
          Cell::from(c.alert_reason.clone().unwrap_or_default()),
        ])
      })
      .collect();
    let widths = [
      Constraint::Length(20),
      Constraint::Length(9),
      Constraint::Length(12),
      Constraint::Length(6),
      Constraint::Length(8),
      Constraint::Min(10),
    ];
    let title = if failing == 0 {
      format!(" Sources ({}) · all healthy ", checks.len())
    } else {
      format!(" Sources ({}) · {} need attention ", checks.len(), failing)
    };
    let table = Table::new(rows, widths)
      .header(header)
      .block(panel(title))
      .row_highlight_style(Style::default().bg(Color::DarkGray))
      .highlight_symbol("> ");
    frame.render_stateful_widget(table, area, &mut self.table_state);
  }

  fn render_timeline(&self, frame: &mut Frame, area: Rect) {
    let title = format!("Last {} days", HISTORY_DAYS);
    if render_placeholder(frame, area, &title, self.history.state(), |d| d.is_empty()) {
      return;
    }
    let history = self.history.data().cloned().unwrap_or_default();
    let days = metrics::health_timeline(&history);
    // One column per day, as many recent days as fit next to the names
    let fit = (area.width as usize).saturating_sub(2 + NAME_WIDTH + 1);
    let shown = &days[days.len().saturating_sub(fit)..];

    let lines = timeline_lines(shown);
    let score = shown.last().map(HealthDay::score).unwrap_or(0.0);
    let block = panel(format!(" {} · today {:.0}% ", title, score));
    frame.render_widget(Paragraph::new(lines).block(block), area);
  }
}

const NAME_WIDTH: usize = 16;

fn status_label(status: &SourceStatus) -> &'static str {
  match status {
    SourceStatus::Ok => "OK",
    SourceStatus::Warning => "WARNING",
    SourceStatus::Critical => "CRITICAL",
    SourceStatus::Unknown => "?",
  }
}

fn lag_label(days: Option<i64>) -> String {
  match days {
    Some(0) => "today".to_string(),
    Some(d) => format!("{}d", d),
    None => "-".to_string(),
  }
}

/// One row per source, one colored cell per day; blank where a source was
/// not checked that day.
fn timeline_lines(days: &[HealthDay]) -> Vec<Line<'static>> {
  let sources: BTreeSet<&str> = days
    .iter()
    .flat_map(|d| d.statuses.keys().map(String::as_str))
    .collect();
  sources
    .into_iter()
    .map(|source| {
      let mut spans = vec![Span::raw(format!(
        "{:<width$} ",
        truncate(source, NAME_WIDTH),
        width = NAME_WIDTH
      ))];
      spans.extend(days.iter().map(|day| match day.statuses.get(source) {
        Some(status) => Span::styled("■", Style::default().fg(source_status_color(status))),
        None => Span::raw(" "),
      }));
      Line::from(spans)
    })
    .collect()
}

fn lag_chart(checks: &[HealthCheck]) -> PreparedChart {
  let mut checks: Vec<&HealthCheck> = checks.iter().collect();
  checks.sort_by(|a, b| b.days_lag.cmp(&a.days_lag));
  PreparedChart {
    bars: checks
      .iter()
      .map(|c| Bar {
        label: truncate(&c.source_name, 14),
        value: c.days_lag.unwrap_or(0).max(0) as u64,
        text: lag_label(c.days_lag),
        color: Some(source_status_color(&c.status).to_string()),
      })
      .collect(),
  }
}

impl View for HealthView {
  fn tab(&self) -> Tab {
    Tab::Health
  }

  fn load(&mut self, ctx: &LoadContext) {
    let api = ctx.api.clone();
    self
      .latest
      .run(ctx.epoch, async move { api.health_latest().await });
    let api = ctx.api.clone();
    self
      .history
      .run(ctx.epoch, async move { api.health_history(HISTORY_DAYS).await });
  }

  fn needs_load(&self) -> bool {
    self.latest.state().is_idle() || self.history.state().is_idle()
  }

  fn tick(&mut self) -> bool {
    let a = self.latest.poll();
    let b = self.history.poll();
    a || b
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
    let rows = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
      .split(area);
    let cols = Layout::default()
      .direction(Direction::Horizontal)
      .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
      .split(rows[1]);

    self.render_latest(frame, rows[0]);
    self.render_timeline(frame, cols[0]);

    let Some(latest) = self.latest.data() else {
      return;
    };
    let chart = ctx
      .memo
      .prepare(ChartSlot::HealthLag, RenderKey::of(latest), || lag_chart(latest));
    render_bars(frame, cols[1], "Days behind", chart);
  }
}
