use ratatui::prelude::*;
use ratatui::widgets::{Paragraph, Tabs};

use crate::tabs::TabController;

/// What the header shows about the current context
pub struct HeaderInfo<'a> {
  pub title: &'a str,
  pub period: &'a str,
  pub include_paul: bool,
  pub user: &'a str,
  pub is_admin: bool,
}

/// Draw the header bar with name, title, period and signed-in user
pub fn draw_header(frame: &mut Frame, area: Rect, info: &HeaderInfo) {
  let sep = || Span::styled("│", Style::default().fg(Color::DarkGray));

  let mut spans = vec![
    Span::styled(" tally ", Style::default().fg(Color::Cyan).bold()),
    sep(),
    Span::styled(format!(" {} ", info.title), Style::default().fg(Color::White)),
    sep(),
    Span::styled(
      format!(" {} ", info.period),
      Style::default().fg(Color::Yellow).bold(),
    ),
  ];
  if info.include_paul {
    spans.push(Span::styled("+Paul ", Style::default().fg(Color::Magenta)));
  }
  spans.push(sep());
  spans.push(Span::styled(
    format!(" {} ", info.user),
    Style::default().fg(Color::Gray),
  ));
  if info.is_admin {
    spans.push(Span::styled("admin ", Style::default().fg(Color::Green)));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}

/// Draw the row of visible tabs, numbered by their shortcut key
pub fn draw_tab_bar(frame: &mut Frame, area: Rect, tabs: &TabController) {
  let visible = tabs.visible();
  let titles: Vec<Line> = visible
    .iter()
    .map(|t| Line::from(format!("{} {}", t.number(), t.label())))
    .collect();
  let selected = visible.iter().position(|t| *t == tabs.active()).unwrap_or(0);

  let widget = Tabs::new(titles)
    .select(selected)
    .style(Style::default().fg(Color::DarkGray))
    .highlight_style(Style::default().fg(Color::Cyan).bold())
    .divider(Span::styled("│", Style::default().fg(Color::DarkGray)));
  frame.render_widget(widget, area);
}

/// Host part of the API url, used as default title
pub fn extract_host(url: &str) -> &str {
  url
    .strip_prefix("https://")
    .or_else(|| url.strip_prefix("http://"))
    .unwrap_or(url)
    .split('/')
    .next()
    .unwrap_or(url)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_extract_host() {
    assert_eq!(extract_host("https://dash.agency.co"), "dash.agency.co");
    assert_eq!(extract_host("https://dash.agency.co/v1/"), "dash.agency.co");
    assert_eq!(extract_host("http://localhost:8080"), "localhost:8080");
  }
}
