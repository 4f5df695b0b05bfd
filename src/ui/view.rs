use chrono::NaiveDate;
use crossterm::event::KeyEvent;
use ratatui::prelude::*;

use crate::api::DashboardApi;
use crate::config::DisplayConfig;
use crate::epoch::Epoch;
use crate::filters::Filters;
use crate::tabs::Tab;
use crate::ui::memo::ChartMemo;

/// A keyboard shortcut hint for display in the footer
#[derive(Debug, Clone)]
pub struct ShortcutInfo {
  pub key: &'static str,
  pub label: &'static str,
  pub priority: u8, // Lower = shown first
}

impl ShortcutInfo {
  pub const fn new(key: &'static str, label: &'static str) -> Self {
    Self {
      key,
      label,
      priority: 100,
    }
  }

  pub const fn with_priority(mut self, priority: u8) -> Self {
    self.priority = priority;
    self
  }
}

/// Everything a view needs to start a load
pub struct LoadContext<'a> {
  pub api: &'a DashboardApi,
  pub filters: &'a Filters,
  pub epoch: &'a Epoch,
}

/// Everything a view needs to draw itself besides its own state
pub struct RenderContext<'a> {
  pub memo: &'a mut ChartMemo,
  pub display: &'a DisplayConfig,
  pub today: NaiveDate,
}

/// One dashboard tab.
///
/// Views own their `Query` state and poll it in `tick()`. The app decides
/// when to load: on first show, tab switches, filter changes and refresh.
pub trait View {
  fn tab(&self) -> Tab;

  /// Start (or restart) fetching this view's data
  fn load(&mut self, ctx: &LoadContext);

  /// True when the view has nothing loaded or loading, e.g. after a stale
  /// result was discarded
  fn needs_load(&self) -> bool;

  /// Poll async queries. Returns true if anything changed.
  fn tick(&mut self) -> bool;

  /// Handle a key. Returns true if the view consumed it.
  fn handle_key(&mut self, key: KeyEvent, ctx: &LoadContext) -> bool;

  fn render(&mut self, frame: &mut Frame, area: Rect, ctx: &mut RenderContext);

  /// View-specific shortcuts, merged with the global ones in the footer
  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![ShortcutInfo::new("j/k", "select").with_priority(50)]
  }
}
