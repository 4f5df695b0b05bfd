use chrono::{Local, NaiveDate};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;

use crate::api::transport::HttpTransport;
use crate::api::{DashboardApi, FetchClient};
use crate::commands::{self, Action};
use crate::config::Config;
use crate::epoch::Epoch;
use crate::event::{Event, EventHandler};
use crate::filters::{DatePreset, Filters};
use crate::notify::{Toast, Toasts};
use crate::session::{Session, SessionStore};
use crate::tabs::{Tab, TabController};
use crate::ui;
use crate::ui::components::{CommandPalette, KeyResult};
use crate::ui::memo::ChartMemo;
use crate::ui::view::{LoadContext, RenderContext, ShortcutInfo, View};
use crate::ui::views::{
  AlertsView, CampaignsView, ClientDetailView, ClientsView, HealthView, HoursView, MonthlyView,
  PerformanceView, PlanningView,
};

const TICK_RATE: Duration = Duration::from_millis(250);

fn all_views() -> Vec<Box<dyn View>> {
  vec![
    Box::new(ClientsView::new()),
    Box::new(MonthlyView::new()),
    Box::new(PerformanceView::new()),
    Box::new(HoursView::new()),
    Box::new(ClientDetailView::new()),
    Box::new(PlanningView::new()),
    Box::new(HealthView::new()),
    Box::new(CampaignsView::new()),
    Box::new(AlertsView::new()),
  ]
}

/// Main application state
pub struct App {
  config: Config,
  session: Session,
  /// Where the session is persisted; cleared on logout
  store: Option<SessionStore>,
  api: DashboardApi,
  toasts: Toasts,
  tabs: TabController,
  filters: Filters,
  memo: ChartMemo,
  epoch: Epoch,
  /// One view per tab, in tab order
  views: Vec<Box<dyn View>>,
  palette: CommandPalette,
  /// One-line message in the footer, cleared by the next key
  status: Option<String>,
  today: NaiveDate,
  should_quit: bool,
  logged_out: bool,
}

impl App {
  pub fn new(config: Config, session: Session, store: Option<SessionStore>) -> Result<Self> {
    let toasts = Toasts::new(config.toast_duration());
    let transport = HttpTransport::new(
      &config.api.url,
      Duration::from_secs(config.api.timeout_secs),
    )?;
    let fetch = FetchClient::new(
      Arc::new(transport),
      Arc::new(toasts.clone()),
      config.cache_duration(),
      config.api.retry.policy(),
    );
    let token = (config.api.send_identity && !session.token.is_empty())
      .then(|| session.token.clone());
    let api = DashboardApi::new(fetch, token);
    let today = Local::now().date_naive();
    Ok(Self::with_api(config, session, store, api, toasts, today))
  }

  /// Wire up the app around an existing API client.
  pub fn with_api(
    config: Config,
    session: Session,
    store: Option<SessionStore>,
    api: DashboardApi,
    toasts: Toasts,
    today: NaiveDate,
  ) -> Self {
    let mut tabs = TabController::new();
    if !session.is_admin {
      tabs.hide_admin_tabs();
    }
    let filters = Filters::new(today, &config.display);

    Self {
      config,
      session,
      store,
      api,
      toasts,
      tabs,
      filters,
      memo: ChartMemo::new(),
      epoch: Epoch::new(),
      views: all_views(),
      palette: CommandPalette::new(),
      status: None,
      today,
      should_quit: false,
      logged_out: false,
    }
  }

  /// Start with a preset other than the default
  pub fn with_preset(mut self, preset: DatePreset) -> Self {
    self
      .filters
      .apply_preset(preset, self.today, &self.config.display);
    self
  }

  /// Run the UI until the user quits. Returns true if they logged out.
  pub async fn run(&mut self) -> Result<bool> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut events = EventHandler::new(TICK_RATE);
    tracing::info!(tab = ?self.tabs.active(), period = %self.filters.label, "dashboard started");
    self.load_active();

    let result = self.event_loop(&mut terminal, &mut events).await;

    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result.map(|_| self.logged_out)
  }

  async fn event_loop<B: Backend>(
    &mut self,
    terminal: &mut Terminal<B>,
    events: &mut EventHandler,
  ) -> Result<()> {
    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      match events.next().await {
        Some(Event::Key(key)) => self.handle_key(key),
        Some(Event::Tick) => {
          self.today = Local::now().date_naive();
          self.tick();
        }
        None => break,
      }
    }
    Ok(())
  }

  /// Poll every view and reload the active one if its data was dropped.
  pub fn tick(&mut self) {
    self.toasts.prune();
    for view in self.views.iter_mut() {
      view.tick();
    }
    if self.active_view().map(|v| v.needs_load()).unwrap_or(false) {
      self.load_active();
    }
  }

  fn active_view(&self) -> Option<&dyn View> {
    let active = self.tabs.active();
    self
      .views
      .iter()
      .find(|v| v.tab() == active)
      .map(|v| v.as_ref())
  }

  fn load_active(&mut self) {
    let ctx = LoadContext {
      api: &self.api,
      filters: &self.filters,
      epoch: &self.epoch,
    };
    let active = self.tabs.active();
    if let Some(view) = self.views.iter_mut().find(|v| v.tab() == active) {
      tracing::debug!(tab = ?active, epoch = self.epoch.current(), "loading tab");
      view.load(&ctx);
    }
  }

  fn switch_tab(&mut self, tab: Tab) {
    if !self.tabs.is_visible(tab) {
      self.status = Some(format!("{} is only available to admins", tab.label()));
      return;
    }
    if self.tabs.switch_to(tab) {
      self.memo.clear();
      self.epoch.advance();
      self.load_active();
    }
  }

  /// Drop everything derived from the old filters and reload.
  fn reload_all(&mut self) {
    self.api.clear_cache();
    self.memo.clear();
    self.epoch.advance();
    self.load_active();
  }

  fn apply_preset(&mut self, preset: DatePreset) {
    self
      .filters
      .apply_preset(preset, self.today, &self.config.display);
    tracing::info!(preset = preset.name(), "date preset changed");
    self.reload_all();
  }

  fn cycle_preset(&mut self, forward: bool) {
    let current = self.filters.preset.unwrap_or(DatePreset::LastMonth);
    let preset = if forward {
      current.next()
    } else {
      current.previous()
    };
    self.apply_preset(preset);
  }

  fn logout(&mut self) {
    if let Some(store) = &self.store {
      if let Err(e) = store.clear() {
        tracing::warn!("failed to remove session: {}", e);
      }
    }
    tracing::info!(email = %self.session.email, "signed out");
    self.logged_out = true;
    self.should_quit = true;
  }

  fn execute_command(&mut self, line: &str) {
    let action = match commands::parse(line) {
      Ok(action) => action,
      Err(message) => {
        self.status = Some(message);
        return;
      }
    };
    match action {
      Action::SwitchTab(tab) => self.switch_tab(tab),
      Action::Preset(preset) => self.apply_preset(preset),
      Action::Range(from, to) => match self.filters.apply_range(from, to) {
        Ok(()) => self.reload_all(),
        Err(message) => self.status = Some(message),
      },
      Action::Refresh => self.reload_all(),
      Action::Logout => self.logout(),
      Action::Quit => self.should_quit = true,
    }
  }

  pub fn handle_key(&mut self, key: KeyEvent) {
    self.status = None;

    match self.palette.handle_key(key) {
      KeyResult::Event(line) => {
        self.execute_command(&line);
        return;
      }
      KeyResult::Handled => return,
      KeyResult::NotHandled => {}
    }

    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    let ctx = LoadContext {
      api: &self.api,
      filters: &self.filters,
      epoch: &self.epoch,
    };
    let active = self.tabs.active();
    if let Some(view) = self.views.iter_mut().find(|v| v.tab() == active) {
      if view.handle_key(key, &ctx) {
        return;
      }
    }

    match key.code {
      KeyCode::Char('q') => self.should_quit = true,
      KeyCode::Tab => self.switch_tab(self.tabs.next()),
      KeyCode::BackTab => self.switch_tab(self.tabs.previous()),
      KeyCode::Char(c @ '1'..='9') => {
        let number = c as usize - '0' as usize;
        if let Some(tab) = Tab::from_number(number) {
          self.switch_tab(tab);
        }
      }
      KeyCode::Char(']') => self.cycle_preset(true),
      KeyCode::Char('[') => self.cycle_preset(false),
      KeyCode::Char('p') => {
        self.filters.toggle_include_paul();
        tracing::info!(include_paul = self.filters.include_paul, "toggle changed");
        self.reload_all();
      }
      KeyCode::Char('r') => self.reload_all(),
      _ => {}
    }
  }

  /// Draw the active view into `area`
  pub fn render_active(&mut self, frame: &mut Frame, area: Rect) {
    let mut ctx = RenderContext {
      memo: &mut self.memo,
      display: &self.config.display,
      today: self.today,
    };
    let active = self.tabs.active();
    if let Some(view) = self.views.iter_mut().find(|v| v.tab() == active) {
      view.render(frame, area, &mut ctx);
    }
  }

  // Accessors for UI rendering

  pub fn title(&self) -> &str {
    self
      .config
      .display
      .title
      .as_deref()
      .unwrap_or_else(|| ui::renderfns::extract_host(&self.config.api.url))
  }

  pub fn session(&self) -> &Session {
    &self.session
  }

  pub fn tabs(&self) -> &TabController {
    &self.tabs
  }

  pub fn filters(&self) -> &Filters {
    &self.filters
  }

  pub fn palette(&self) -> &CommandPalette {
    &self.palette
  }

  pub fn status(&self) -> Option<&str> {
    self.status.as_deref()
  }

  pub fn toasts(&self) -> Vec<Toast> {
    self.toasts.visible()
  }

  pub fn shortcuts(&self) -> Vec<ShortcutInfo> {
    let mut shortcuts = vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("tab", "next tab").with_priority(20),
      ShortcutInfo::new("[/]", "period").with_priority(30),
      ShortcutInfo::new("p", "toggle Paul").with_priority(31),
      ShortcutInfo::new("r", "refresh").with_priority(40),
      ShortcutInfo::new("q", "quit").with_priority(90),
    ];
    if let Some(view) = self.active_view() {
      shortcuts.extend(view.shortcuts());
    }
    shortcuts
  }
}
