use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Cell, Gauge, Paragraph, Row, Table, TableState};

use super::{ensure_valid_selection, panel, render_bars, render_placeholder};
use crate::api::types::{BudgetProgress, BudgetStatus, ClientBudget};
use crate::api::FetchError;
use crate::config::DisplayConfig;
use crate::metrics;
use crate::query::{Query, QueryState};
use crate::tabs::Tab;
use crate::ui::memo::{Bar, ChartSlot, PreparedChart, RenderKey};
use crate::ui::renderfns::{budget_color, format_hours, truncate};
use crate::ui::view::{LoadContext, RenderContext, ShortcutInfo, View};

/// Month list and the progress of the month being shown
#[derive(Debug, Clone)]
struct Planning {
  months: Vec<String>,
  month: String,
  progress: BudgetProgress,
}

/// Budget versus actual hours per client for one month
#[derive(Default)]
pub struct PlanningView {
  data: Query<Planning>,
  /// Months with budgets, most recent first
  months: Vec<String>,
  month: Option<String>,
  table_state: TableState,
}

impl PlanningView {
  pub fn new() -> Self {
    Self::default()
  }

  /// Fetch the month list, then the progress for the chosen month. Once the
  /// list is cached, stepping months only costs the progress request.
  fn load_month(&mut self, ctx: &LoadContext) {
    let api = ctx.api.clone();
    let wanted = self.month.clone();
    self.data.run(ctx.epoch, async move {
      let months = api.budget_months().await?;
      let month = match wanted {
        Some(m) => m,
        // Default to the most recent month with budgets
        None => months
          .first()
          .cloned()
          .ok_or_else(|| FetchError::Validation("No budgets have been set up yet".to_string()))?,
      };
      let progress = api.budget_progress(&month).await?;
      Ok(Planning {
        months,
        month,
        progress,
      })
    });
  }

  /// Move through the month list; +1 goes further back in time
  fn step_month(&mut self, delta: isize, ctx: &LoadContext) -> bool {
    if self.months.is_empty() {
      return false;
    }
    let current = self
      .month
      .as_ref()
      .and_then(|m| self.months.iter().position(|x| x == m))
      .unwrap_or(0);
    let next = (current as isize + delta).clamp(0, self.months.len() as isize - 1) as usize;
    if next == current && self.month.is_some() {
      return true;
    }
    self.month = Some(self.months[next].clone());
    self.load_month(ctx);
    true
  }
}

/// "2024-03" -> "March 2024"
fn month_label(key: &str, display: &DisplayConfig) -> String {
  match key.split_once('-') {
    Some((year, month)) => match month.parse::<u32>() {
      Ok(m) => format!("{} {}", display.month_name(m), year),
      Err(_) => key.to_string(),
    },
    None => key.to_string(),
  }
}

fn status_label(status: &BudgetStatus) -> &'static str {
  match status {
    BudgetStatus::Ok => "on track",
    BudgetStatus::Warning => "watch",
    BudgetStatus::Over => "over",
    BudgetStatus::Unknown => "-",
  }
}

fn progress_chart(clients: &[ClientBudget]) -> PreparedChart {
  PreparedChart {
    bars: clients
      .iter()
      .map(|c| Bar {
        label: truncate(&c.client_name, 14),
        value: c.progress_pct.max(0.0).round() as u64,
        text: format!("{:.0}%", c.progress_pct),
        color: Some(budget_color(&c.status).to_string()),
      })
      .collect(),
  }
}

impl View for PlanningView {
  fn tab(&self) -> Tab {
    Tab::Planning
  }

  fn load(&mut self, ctx: &LoadContext) {
    self.load_month(ctx);
  }

  fn needs_load(&self) -> bool {
    self.data.state().is_idle()
  }

  fn tick(&mut self) -> bool {
    let changed = self.data.poll();
    if changed {
      if let Some(planning) = self.data.data() {
        self.months = planning.months.clone();
        self.month = Some(planning.month.clone());
      }
    }
    changed
  }

  fn handle_key(&mut self, key: KeyEvent, ctx: &LoadContext) -> bool {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.table_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.table_state.select_previous(),
      KeyCode::Char('h') | KeyCode::Left => return self.step_month(1, ctx),
      KeyCode::Char('l') | KeyCode::Right => return self.step_month(-1, ctx),
      _ => return false,
    }
    true
  }

  fn render(&mut self, frame: &mut Frame, area: Rect, ctx: &mut RenderContext) {
    if render_placeholder(frame, area, "Planning", self.data.state(), |p| {
      p.progress.clients.is_empty()
    }) {
      return;
    }
    let QueryState::Success(planning) = self.data.state() else {
      return;
    };
    let Planning { month, progress, .. } = planning.clone();

    let rows = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Min(5),
      ])
      .split(area);
    let cols = Layout::default()
      .direction(Direction::Horizontal)
      .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
      .split(rows[2]);

    let summary = metrics::budget_summary(&progress);
    let line = Line::from(vec![
      Span::styled(" Budgeted ", Style::default().fg(Color::DarkGray)),
      Span::styled(format_hours(summary.budgeted), Style::default().bold()),
      Span::styled("   Actual ", Style::default().fg(Color::DarkGray)),
      Span::styled(format_hours(summary.actual), Style::default().bold()),
      Span::styled("   Remaining ", Style::default().fg(Color::DarkGray)),
      Span::styled(
        format_hours(summary.remaining),
        Style::default().fg(if summary.remaining < 0.0 {
          Color::Red
        } else {
          Color::Green
        }),
      ),
    ]);
    let title = format!(" {} ", month_label(&month, ctx.display));
    frame.render_widget(Paragraph::new(line).block(panel(title)), rows[0]);

    let elapsed = progress.month_progress_pct.clamp(0.0, 100.0);
    let gauge = Gauge::default()
      .block(panel(" Month elapsed "))
      .gauge_style(Style::default().fg(Color::Blue))
      .ratio(elapsed / 100.0)
      .label(format!("{:.0}%", elapsed));
    frame.render_widget(gauge, rows[1]);

    ensure_valid_selection(&mut self.table_state, progress.clients.len());
    let header = Row::new(["Client", "Budget", "Actual", "Left", "Done", "Pace", "Status"])
      .style(Style::default().fg(Color::Yellow).bold());
    let body: Vec<Row> = progress
      .clients
      .iter()
      .map(|c| {
        let color = budget_color(&c.status);
        Row::new(vec![
          Cell::from(truncate(&c.client_name, 24)),
          Cell::from(format_hours(c.budgeted_hours)),
          Cell::from(format_hours(c.actual_hours)),
          Cell::from(format_hours(c.remaining_hours)),
          Cell::from(format!("{:.0}%", c.progress_pct)),
          Cell::from(format!("{:+.1}h", c.pace_diff)),
          Cell::from(status_label(&c.status)).style(Style::default().fg(color)),
        ])
      })
      .collect();
    let widths = [
      Constraint::Min(14),
      Constraint::Length(8),
      Constraint::Length(8),
      Constraint::Length(8),
      Constraint::Length(5),
      Constraint::Length(7),
      Constraint::Length(9),
    ];
    let table = Table::new(body, widths)
      .header(header)
      .block(panel(format!(" Clients ({}) ", progress.clients.len())))
      .row_highlight_style(Style::default().bg(Color::DarkGray))
      .highlight_symbol("> ");
    frame.render_stateful_widget(table, cols[0], &mut self.table_state);

    let chart = ctx.memo.prepare(ChartSlot::PlanningBudget, RenderKey::of(&progress), || {
      progress_chart(&progress.clients)
    });
    render_bars(frame, cols[1], "Budget used", chart);
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("j/k", "select").with_priority(50),
      ShortcutInfo::new("h/l", "older/newer month").with_priority(51),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::fetch::testing::{ok, ScriptedTransport};
  use crate::api::retry::RetryPolicy;
  use crate::api::{DashboardApi, FetchClient};
  use crate::epoch::Epoch;
  use crate::filters::Filters;
  use crate::notify::RecordingNotifier;
  use chrono::NaiveDate;
  use crossterm::event::KeyModifiers;
  use std::sync::Arc;
  use std::time::Duration;

  #[test]
  fn test_month_label() {
    let display = DisplayConfig::default();
    assert_eq!(month_label("2024-03", &display), "March 2024");
    assert_eq!(month_label("soon", &display), "soon");
  }

  #[test]
  fn test_progress_chart_colors_by_status() {
    let client = ClientBudget {
      client_name: "Acme".into(),
      budgeted_hours: 10.0,
      actual_hours: 12.0,
      remaining_hours: -2.0,
      progress_pct: 120.0,
      pace_diff: 4.0,
      status: BudgetStatus::Over,
      employees: vec![],
    };
    let chart = progress_chart(&[client]);
    assert_eq!(chart.bars[0].value, 120);
    assert_eq!(
      chart.bars[0].color.as_deref(),
      Some(budget_color(&BudgetStatus::Over).to_string().as_str())
    );
  }

  #[tokio::test]
  async fn test_first_load_asks_for_months_once() {
    let transport = Arc::new(
      ScriptedTransport::always_ok(r#"{"month_progress_pct":40,"clients":[]}"#)
        .then(Ok(ok(r#"["2024-05","2024-04"]"#))),
    );
    let fetch = FetchClient::new(
      transport.clone(),
      Arc::new(RecordingNotifier::default()),
      Duration::from_secs(300),
      RetryPolicy::default(),
    );
    let api = DashboardApi::new(fetch, None);
    let today = NaiveDate::from_ymd_opt(2024, 5, 20).unwrap();
    let filters = Filters::new(today, &DisplayConfig::default());
    let epoch = Epoch::new();
    let ctx = LoadContext {
      api: &api,
      filters: &filters,
      epoch: &epoch,
    };

    let mut view = PlanningView::new();
    view.load(&ctx);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(view.tick());

    assert_eq!(view.month.as_deref(), Some("2024-05"));
    assert_eq!(view.months, ["2024-05", "2024-04"]);
    {
      let seen = transport.seen.lock().unwrap();
      assert_eq!(seen.len(), 2);
      assert_eq!(seen[0].0, "/api/budget-months");
      assert_eq!(seen[1].0, "/api/budget-progress");
      assert_eq!(seen[1].1.params.get("month").unwrap(), "2024-05");
    }

    // Stepping back reuses the cached month list
    assert!(view.handle_key(KeyEvent::new(KeyCode::Char('h'), KeyModifiers::NONE), &ctx));
    tokio::time::sleep(Duration::from_millis(20)).await;
    view.tick();

    assert_eq!(view.month.as_deref(), Some("2024-04"));
    let seen = transport.seen.lock().unwrap();
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[2].1.params.get("month").unwrap(), "2024-04");
  }

  #[tokio::test]
  async fn test_no_budgets_is_an_error_state() {
    let transport = Arc::new(ScriptedTransport::always_ok("[]"));
    let fetch = FetchClient::new(
      transport.clone(),
      Arc::new(RecordingNotifier::default()),
      Duration::from_secs(300),
      RetryPolicy::default(),
    );
    let api = DashboardApi::new(fetch, None);
    let filters = Filters::new(
      NaiveDate::from_ymd_opt(2024, 5, 20).unwrap(),
      &DisplayConfig::default(),
    );
    let epoch = Epoch::new();
    let ctx = LoadContext {
      api: &api,
      filters: &filters,
      epoch: &epoch,
    };

    let mut view = PlanningView::new();
    view.load(&ctx);
    tokio::time::sleep(Duration::from_millis(20)).await;
    view.tick();

    assert!(view.data.is_error());
    assert!(view.data.error().unwrap().contains("No budgets"));
    assert_eq!(transport.calls(), 1);
  }
}
