use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::ui::view::ShortcutInfo;

/// Draw the footer: a status message if there is one, else shortcut hints
pub fn draw_footer(frame: &mut Frame, area: Rect, status: Option<&str>, shortcuts: &[ShortcutInfo]) {
  let line = match status {
    Some(message) => Line::from(Span::styled(
      format!(" {}", message),
      Style::default().fg(Color::Yellow),
    )),
    None => {
      let mut sorted: Vec<&ShortcutInfo> = shortcuts.iter().collect();
      sorted.sort_by_key(|s| s.priority);

      let mut spans = vec![Span::raw(" ")];
      for shortcut in sorted {
        spans.push(Span::styled(
          format!("<{}>", shortcut.key),
          Style::default().fg(Color::Cyan),
        ));
        spans.push(Span::styled(
          format!(" {}   ", shortcut.label),
          Style::default().fg(Color::DarkGray),
        ));
      }
      Line::from(spans)
    }
  };

  let paragraph = Paragraph::new(line).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}
