pub mod components;
pub mod memo;
pub mod renderfns;
pub mod view;
pub mod views;

use crate::app::App;
use components::render_toasts;
use ratatui::prelude::*;
use renderfns::{draw_footer, draw_header, draw_tab_bar, HeaderInfo};

/// Main draw function
pub fn draw(frame: &mut Frame, app: &mut App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Length(1), // Tabs
      Constraint::Min(1),    // Active tab
      Constraint::Length(1), // Footer
    ])
    .split(frame.area());

  let session = app.session();
  let header = HeaderInfo {
    title: app.title(),
    period: &app.filters().label,
    include_paul: app.filters().include_paul,
    user: session.display_name(),
    is_admin: session.is_admin,
  };
  draw_header(frame, chunks[0], &header);
  draw_tab_bar(frame, chunks[1], app.tabs());

  app.render_active(frame, chunks[2]);

  draw_footer(frame, chunks[3], app.status(), &app.shortcuts());

  render_toasts(frame, chunks[2], &app.toasts());
  let full = frame.area();
  app.palette().render_overlay(frame, full);
}
