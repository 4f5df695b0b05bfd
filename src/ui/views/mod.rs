mod alerts;
mod campaigns;
mod client_detail;
mod clients;
mod health;
mod hours;
mod monthly;
mod performance;
mod planning;

pub use alerts::AlertsView;
pub use campaigns::CampaignsView;
pub use client_detail::ClientDetailView;
pub use clients::ClientsView;
pub use health::HealthView;
pub use hours::HoursView;
pub use monthly::MonthlyView;
pub use performance::PerformanceView;
pub use planning::PlanningView;

use crate::query::QueryState;
use crate::ui::memo::PreparedChart;
use crate::ui::renderfns::utils::parse_color;
use ratatui::prelude::*;
use ratatui::widgets::{Bar, BarChart, BarGroup, Block, Borders, Paragraph, TableState, Wrap};

/// Keep a table selection inside `0..len`
pub(crate) fn ensure_valid_selection(state: &mut TableState, len: usize) {
  if len == 0 {
    state.select(None);
  } else {
    match state.selected() {
      Some(i) if i < len => {}
      Some(_) => state.select(Some(len - 1)),
      None => state.select(Some(0)),
    }
  }
}

pub(crate) fn panel(title: impl Into<String>) -> Block<'static> {
  Block::default()
    .title(title.into())
    .title_alignment(Alignment::Center)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Blue))
}

/// Draw the loading / failed / empty state for a query that has no data to
/// show. Returns true if it drew something and the caller should stop.
pub(crate) fn render_placeholder<T>(
  frame: &mut Frame,
  area: Rect,
  title: &str,
  state: &QueryState<T>,
  is_empty: impl FnOnce(&T) -> bool,
) -> bool {
  let (text, color) = match state {
    QueryState::Idle | QueryState::Loading => ("Loading...".to_string(), Color::DarkGray),
    QueryState::Error(e) => (
      format!("Failed to load data: {}\nPress 'r' to retry.", e),
      Color::Red,
    ),
    QueryState::Success(data) if is_empty(data) => {
      ("No data for this period.".to_string(), Color::DarkGray)
    }
    QueryState::Success(_) => return false,
  };
  let paragraph = Paragraph::new(text)
    .block(panel(format!(" {} ", title)))
    .style(Style::default().fg(color))
    .wrap(Wrap { trim: true });
  frame.render_widget(paragraph, area);
  true
}

/// Horizontal bar chart from a memoized preparation
pub(crate) fn render_bars(frame: &mut Frame, area: Rect, title: &str, chart: &PreparedChart) {
  if chart.is_empty() {
    let empty = Paragraph::new("Nothing to chart.")
      .block(panel(format!(" {} ", title)))
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(empty, area);
    return;
  }
  let bars: Vec<Bar> = chart
    .bars
    .iter()
    .map(|b| {
      let color = b
        .color
        .as_deref()
        .and_then(parse_color)
        .unwrap_or(Color::Cyan);
      Bar::default()
        .label(Line::from(b.label.clone()))
        .value(b.value)
        .text_value(b.text.clone())
        .style(Style::default().fg(color))
        .value_style(Style::default().fg(Color::Black).bg(color))
    })
    .collect();

  let widget = BarChart::default()
    .block(panel(format!(" {} ", title)))
    .direction(Direction::Horizontal)
    .data(BarGroup::default().bars(&bars))
    .bar_width(1)
    .bar_gap(0)
    .max(chart.max().max(1));
  frame.render_widget(widget, area);
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_ensure_valid_selection() {
    let mut state = TableState::default();
    ensure_valid_selection(&mut state, 3);
    assert_eq!(state.selected(), Some(0));
    state.select(Some(5));
    ensure_valid_selection(&mut state, 3);
    assert_eq!(state.selected(), Some(2));
    ensure_valid_selection(&mut state, 0);
    assert_eq!(state.selected(), None);
  }

  #[test]
  fn test_empty_chart_draws_placeholder() {
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    let mut terminal = Terminal::new(TestBackend::new(30, 4)).unwrap();
    terminal
      .draw(|frame| {
        let area = frame.area();
        render_bars(frame, area, "Spend", &PreparedChart::default());
      })
      .unwrap();
    let text: String = terminal
      .backend()
      .buffer()
      .content()
      .iter()
      .map(|cell| cell.symbol())
      .collect();
    assert!(text.contains("Nothing to chart."));
  }
}
