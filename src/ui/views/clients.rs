use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Cell, Paragraph, Row, Table, TableState};

use super::{ensure_valid_selection, panel, render_bars, render_placeholder};
use crate::api::types::ClientProfit;
use crate::metrics::{self, ClientColumn, SortState};
use crate::query::Query;
use crate::tabs::Tab;
use crate::ui::memo::{Bar, ChartSlot, PreparedChart, RenderKey};
use crate::ui::renderfns::{badge_color, format_gbp, format_hours, truncate};
use crate::ui::view::{LoadContext, RenderContext, ShortcutInfo, View};

const TOP_CLIENTS: usize = 10;

/// Profitability per client: KPIs, sortable table, top revenue chart
#[derive(Default)]
pub struct ClientsView {
  query: Query<Vec<ClientProfit>>,
  sort: SortState,
  table_state: TableState,
}

impl ClientsView {
  pub fn new() -> Self {
    Self::default()
  }

  fn next_column(&self) -> ClientColumn {
    let idx = self
      .sort
      .column
      .and_then(|c| ClientColumn::ALL.iter().position(|x| *x == c))
      .map(|i| (i + 1) % ClientColumn::ALL.len())
      .unwrap_or(1);
    ClientColumn::ALL[idx]
  }

  fn render_kpis(frame: &mut Frame, area: Rect, clients: &[ClientProfit]) {
    let totals = metrics::client_totals(clients);
    let margin_color = badge_color(metrics::margin_badge(totals.margin));
    let line = Line::from(vec![
      Span::styled(" Revenue ", Style::default().fg(Color::DarkGray)),
      Span::styled(format_gbp(totals.revenue), Style::default().bold()),
      Span::styled("   Cost ", Style::default().fg(Color::DarkGray)),
      Span::raw(format_gbp(totals.cost)),
      Span::styled("   Profit ", Style::default().fg(Color::DarkGray)),
      Span::styled(format_gbp(totals.profit), Style::default().bold()),
      Span::styled("   Margin ", Style::default().fg(Color::DarkGray)),
      Span::styled(format!("{:.0}%", totals.margin), Style::default().fg(margin_color)),
      Span::styled("   Hours ", Style::default().fg(Color::DarkGray)),
      Span::raw(format_hours(totals.hours)),
    ]);
    frame.render_widget(Paragraph::new(line).block(panel(" Totals ")), area);
  }

  fn render_table(&mut self, frame: &mut Frame, area: Rect, rows: &[ClientProfit]) {
    ensure_valid_selection(&mut self.table_state, rows.len());

    let header = Row::new(ClientColumn::ALL.iter().map(|c| {
      let marker = match self.sort.column {
        Some(active) if active == *c && self.sort.ascending => " ▲",
        Some(active) if active == *c => " ▼",
        _ => "",
      };
      Cell::from(format!("{}{}", c.title(), marker))
    }))
    .style(Style::default().fg(Color::Yellow).bold());

    let body: Vec<Row> = rows
      .iter()
      .map(|c| {
        let margin = c.margin();
        Row::new(vec![
          Cell::from(truncate(&c.client_name, 28)),
          Cell::from(format_gbp(c.revenue)),
          Cell::from(format_gbp(c.cost)),
          Cell::from(format_hours(c.hours)),
          Cell::from(format_gbp(c.profit())),
          Cell::from(format!("{:.0}%", margin))
            .style(Style::default().fg(badge_color(metrics::margin_badge(margin)))),
        ])
      })
      .collect();

    let widths = [
      Constraint::Min(20),
      Constraint::Length(11),
      Constraint::Length(11),
      Constraint::Length(9),
      Constraint::Length(11),
      Constraint::Length(7),
    ];
    let table = Table::new(body, widths)
      .header(header)
      .block(panel(format!(" Clients ({}) ", rows.len())))
      .row_highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
      .highlight_symbol("> ");
    frame.render_stateful_widget(table, area, &mut self.table_state);
  }
}

fn revenue_chart(clients: &[ClientProfit]) -> PreparedChart {
  let mut top: Vec<&ClientProfit> = clients.iter().collect();
  top.sort_by(|a, b| b.revenue.total_cmp(&a.revenue));
  PreparedChart {
    bars: top
      .into_iter()
      .take(TOP_CLIENTS)
      .map(|c| Bar {
        label: truncate(&c.client_name, 16),
        value: c.revenue.max(0.0).round() as u64,
        text: format_gbp(c.revenue),
        color: None,
      })
      .collect(),
  }
}

impl View for ClientsView {
  fn tab(&self) -> Tab {
    Tab::Clients
  }

  fn load(&mut self, ctx: &LoadContext) {
    let api = ctx.api.clone();
    let filters = ctx.filters.clone();
    self
      .query
      .run(ctx.epoch, async move { api.clients(&filters).await });
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
      KeyCode::Char('s') => {
        let column = self.next_column();
        self.sort.select(column);
      }
      KeyCode::Char('o') => {
        if let Some(column) = self.sort.column {
          self.sort.select(column);
        }
      }
      _ => return false,
    }
    true
  }

  fn render(&mut self, frame: &mut Frame, area: Rect, ctx: &mut RenderContext) {
    if render_placeholder(frame, area, "Clients", self.query.state(), |d| d.is_empty()) {
      return;
    }
    let clients = match self.query.data() {
      Some(data) => data.clone(),
      None => return,
    };

    let rows = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(3), Constraint::Min(5)])
      .split(area);
    let cols = Layout::default()
      .direction(Direction::Horizontal)
      .constraints([Constraint::Percentage(62), Constraint::Percentage(38)])
      .split(rows[1]);

    Self::render_kpis(frame, rows[0], &clients);
    let sorted = self.sort.apply(&clients);
    self.render_table(frame, cols[0], &sorted);

    let chart = ctx.memo.prepare(ChartSlot::ClientRevenue, RenderKey::of(&clients), || {
      revenue_chart(&clients)
    });
    render_bars(frame, cols[1], "Top revenue", chart);
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("j/k", "select").with_priority(50),
      ShortcutInfo::new("s", "sort column").with_priority(51),
      ShortcutInfo::new("o", "reverse").with_priority(52),
    ]
  }
}
