use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Cell, Paragraph, Row, Sparkline, Table, TableState};

use super::{ensure_valid_selection, panel, render_bars, render_placeholder};
use crate::api::types::{AnalyticsClient, PaidMedia};
use crate::config::DisplayConfig;
use crate::metrics;
use crate::query::{Query, QueryState};
use crate::tabs::Tab;
use crate::ui::memo::{Bar, ChartSlot, PreparedChart, RenderKey};
use crate::ui::renderfns::{format_gbp, series_color, truncate};
use crate::ui::view::{LoadContext, RenderContext, ShortcutInfo, View};

/// Paid media spend and results for one analytics client
#[derive(Default)]
pub struct CampaignsView {
  clients: Query<Vec<AnalyticsClient>>,
  media: Query<PaidMedia>,
  list_state: TableState,
  selected: Option<AnalyticsClient>,
}

impl CampaignsView {
  pub fn new() -> Self {
    Self::default()
  }

  fn load_media(&mut self, ctx: &LoadContext) {
    let Some(client) = &self.selected else {
      self.media.reset();
      return;
    };
    let api = ctx.api.clone();
    let filters = ctx.filters.clone();
    let id = client.client_id.clone();
    self
      .media
      .run(ctx.epoch, async move { api.paid_media(&id, &filters).await });
  }

  fn open_selected(&mut self, ctx: &LoadContext) -> bool {
    let Some(idx) = self.list_state.selected() else {
      return false;
    };
    let Some(client) = self.clients.data().and_then(|c| c.get(idx)).cloned() else {
      return false;
    };
    tracing::debug!(client = %client.client_id, "opening paid media");
    self.selected = Some(client);
    self.load_media(ctx);
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
          Cell::from(truncate(&c.client_name, 22)),
          Cell::from(ad_accounts(c).to_string()),
        ])
        .style(style)
      })
      .collect();
    let table = Table::new(rows, [Constraint::Min(12), Constraint::Length(5)])
      .header(Row::new(["Client", "Accts"]).style(Style::default().fg(Color::Yellow).bold()))
      .block(panel(format!(" Clients ({}) ", clients.len())))
      .row_highlight_style(Style::default().bg(Color::DarkGray))
      .highlight_symbol("> ");
    frame.render_stateful_widget(table, area, &mut self.list_state);
  }

  fn render_media(&mut self, frame: &mut Frame, area: Rect, ctx: &mut RenderContext) {
    let Some(client) = &self.selected else {
      let hint = Paragraph::new("Select a client and press Enter to see its paid media.")
        .block(panel(" Campaigns "))
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(hint, area);
      return;
    };
    let title = client.client_name.clone();
    if render_placeholder(frame, area, &title, self.media.state(), |m| {
      m.platform_breakdown.is_empty() && m.summary.total_spend == 0.0
    }) {
      return;
    }
    let QueryState::Success(media) = self.media.state() else {
      return;
    };
    let media = media.clone();

    let rows = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(4),
        Constraint::Length(5),
        Constraint::Min(5),
      ])
      .split(area);
    let cols = Layout::default()
      .direction(Direction::Horizontal)
      .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
      .split(rows[2]);

    let block = panel(format!(" {} · {} ", title, platforms_label(&media)));
    frame.render_widget(Paragraph::new(kpi_lines(&media)).block(block), rows[0]);

    let series: Vec<u64> = media
      .timeline
      .iter()
      .map(|d| d.spend.max(0.0).round() as u64)
      .collect();
    let spark = Sparkline::default()
      .block(panel(format!(" Daily spend over {} days ", media.timeline.len())))
      .data(&series)
      .style(Style::default().fg(Color::Cyan));
    frame.render_widget(spark, rows[1]);

    let shares = metrics::platform_shares(&media);
    let body: Vec<Row> = media
      .platform_breakdown
      .iter()
      .map(|p| {
        let share = shares
          .iter()
          .find(|(name, _, _)| *name == p.platform)
          .map(|(_, _, s)| *s)
          .unwrap_or(0.0);
        Row::new(vec![
          Cell::from(truncate(&p.platform, 12)),
          Cell::from(format_gbp(p.spend)),
          Cell::from(format!("{:.0}%", share)),
          Cell::from(format!("{:.0}", p.clicks)),
          Cell::from(format!("{:.2}%", p.ctr)),
          Cell::from(format!("{:.0}", p.leads)),
          Cell::from(cost_label(metrics::cost_per(p.spend, p.leads))),
          Cell::from(format!("{:.0}", p.conversions)),
        ])
      })
      .collect();
    let widths = [
      Constraint::Min(8),
      Constraint::Length(9),
      Constraint::Length(5),
      Constraint::Length(7),
      Constraint::Length(7),
      Constraint::Length(6),
      Constraint::Length(7),
      Constraint::Length(6),
    ];
    let table = Table::new(body, widths)
      .header(
        Row::new(["Platform", "Spend", "Share", "Clicks", "CTR", "Leads", "CPL", "Conv"])
          .style(Style::default().fg(Color::Yellow).bold()),
      )
      .block(panel(" Platforms "));
    frame.render_widget(table, cols[0]);

    let display = ctx.display;
    let chart = ctx
      .memo
      .prepare(ChartSlot::AdSpend, RenderKey::of(&media.platform_breakdown), || {
        spend_chart(&media, display)
      });
    render_bars(frame, cols[1], "Spend by platform", chart);
  }
}

/// Number of ad accounts linked to a client across platforms
fn ad_accounts(client: &AnalyticsClient) -> usize {
  client.meta_ads_accounts.len()
    + client.google_ads_accounts.len()
    + client.linkedin_ads_accounts.len()
}

fn cost_label(cost: Option<f64>) -> String {
  cost.map(format_gbp).unwrap_or_else(|| "-".to_string())
}

fn platforms_label(media: &PaidMedia) -> String {
  let available = &media.platforms_available;
  let names: Vec<&str> = [
    (available.meta, "Meta"),
    (available.google, "Google"),
    (available.linkedin, "LinkedIn"),
  ]
  .into_iter()
  .filter_map(|(on, name)| on.then_some(name))
  .collect();
  if names.is_empty() {
    "no ad platforms linked".to_string()
  } else {
    names.join(", ")
  }
}

fn kpi_lines(media: &PaidMedia) -> Vec<Line<'static>> {
  let s = &media.summary;
  let label = |text: &'static str| Span::styled(text, Style::default().fg(Color::DarkGray));
  let value = |text: String| Span::styled(text, Style::default().bold());
  vec![
    Line::from(vec![
      label(" Spend "),
      value(format_gbp(s.total_spend)),
      label("   Impressions "),
      value(format!("{:.0}", s.total_impressions)),
      label("   Clicks "),
      value(format!("{:.0}", s.total_clicks)),
      label("   CTR "),
      value(format!("{:.2}%", s.avg_ctr)),
      label("   CPC "),
      value(format!("£{:.2}", s.avg_cpc)),
    ]),
    Line::from(vec![
      label(" Leads "),
      value(format!("{:.0}", s.total_leads)),
      label("   Cost per lead "),
      value(cost_label(metrics::cost_per(s.total_spend, s.total_leads))),
      label("   Conversions "),
      value(format!("{:.0}", s.total_conversions)),
      label("   Cost per conversion "),
      value(cost_label(metrics::cost_per(s.total_spend, s.total_conversions))),
    ]),
  ]
}

fn spend_chart(media: &PaidMedia, display: &DisplayConfig) -> PreparedChart {
  PreparedChart {
    bars: metrics::platform_shares(media)
      .into_iter()
      .enumerate()
      .map(|(i, (platform, spend, share))| Bar {
        label: truncate(&platform, 12),
        value: spend.max(0.0).round() as u64,
        text: format!("{} ({:.0}%)", format_gbp(spend), share),
        color: Some(series_color(display, &platform, i).to_string()),
      })
      .collect(),
  }
}

impl View for CampaignsView {
  fn tab(&self) -> Tab {
    Tab::Campaigns
  }

  fn load(&mut self, ctx: &LoadContext) {
    let api = ctx.api.clone();
    self.clients.run(ctx.epoch, async move {
      let clients = api.analytics_clients().await?;
      Ok(clients.into_iter().filter(|c| c.active).collect())
    });
    self.load_media(ctx);
  }

  fn needs_load(&self) -> bool {
    self.clients.state().is_idle() || (self.selected.is_some() && self.media.state().is_idle())
  }

  fn tick(&mut self) -> bool {
    let a = self.clients.poll();
    let b = self.media.poll();
    a || b
  }

  fn handle_key(&mut self, key: KeyEvent, ctx: &LoadContext) -> bool {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Enter => return self.open_selected(ctx),
      KeyCode::Esc if self.selected.is_some() => {
        self.selected = None;
        self.media.reset();
      }
      _ => return false,
    }
    true
  }

  fn render(&mut self, frame: &mut Frame, area: Rect, ctx: &mut RenderContext) {
    let cols = Layout::default()
      .direction(Direction::Horizontal)
      .constraints([Constraint::Length(34), Constraint::Min(20)])
      .split(area);
    self.render_list(frame, cols[0]);
    self.render_media(frame, cols[1], ctx);
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
  use crate::api::fetch::testing::{ok, ScriptedTransport};
  use crate::api::retry::RetryPolicy;
  use crate::api::types::{PlatformSpend, PlatformsAvailable};
  use crate::api::{DashboardApi, FetchClient};
  use crate::epoch::Epoch;
  use crate::filters::Filters;
  use crate::notify::RecordingNotifier;
  use chrono::NaiveDate;
  use crossterm::event::KeyModifiers;
  use std::sync::Arc;
  use std::time::Duration;

  fn platform(name: &str, spend: f64) -> PlatformSpend {
    PlatformSpend {
      platform: name.to_string(),
      spend,
      impressions: 0.0,
      clicks: 0.0,
      ctr: 0.0,
      leads: 0.0,
      conversions: 0.0,
    }
  }

  #[test]
  fn test_platforms_label() {
    let mut media = PaidMedia::default();
    assert_eq!(platforms_label(&media), "no ad platforms linked");
    media.platforms_available = PlatformsAvailable {
      meta: true,
      google: false,
      linkedin: true,
    };
    assert_eq!(platforms_label(&media), "Meta, LinkedIn");
  }

  #[test]
  fn test_spend_chart_orders_by_spend() {
    let mut media = PaidMedia {
      platform_breakdown: vec![platform("linkedin", 100.0), platform("google", 300.0)],
      ..PaidMedia::default()
    };
    media.summary.total_spend = 400.0;
    let chart = spend_chart(&media, &DisplayConfig::default());
    assert_eq!(chart.bars[0].label, "google");
    assert_eq!(chart.bars[0].value, 300);
    assert_eq!(chart.bars[0].text, "£300 (75%)");
    assert_eq!(cost_label(None), "-");
  }

  #[tokio::test]
  async fn test_inactive_clients_hidden_and_enter_loads_media() {
    let transport = Arc::new(
      ScriptedTransport::always_ok(r#"{"summary":{"total_spend":250}}"#).then(Ok(ok(
        r#"[
          {"client_id":"old","client_name":"Old Co","active":false},
          {"client_id":"acme","client_name":"Acme","active":true,"meta_ads_accounts":["1"]}
        ]"#,
      ))),
    );
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

    let mut view = CampaignsView::new();
    view.load(&ctx);
    tokio::time::sleep(Duration::from_millis(20)).await;
    view.tick();

    let clients = view.clients.data().unwrap();
    assert_eq!(clients.len(), 1);
    assert_eq!(ad_accounts(&clients[0]), 1);

    view.list_state.select(Some(0));
    assert!(view.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE), &ctx));
    tokio::time::sleep(Duration::from_millis(20)).await;
    view.tick();

    assert_eq!(view.media.data().unwrap().summary.total_spend, 250.0);
    let seen = transport.seen.lock().unwrap();
    assert_eq!(seen[1].0, "/api/analytics/paid-media");
    assert_eq!(seen[1].1.params.get("client_id").unwrap(), "acme");
    assert_eq!(seen[1].1.params.get("date_from").unwrap(), "2024-04-01");
  }
}
