use crate::notify::{Toast, ToastKind};
use crate::ui::renderfns::truncate;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

const TOAST_WIDTH: u16 = 44;

fn kind_style(kind: ToastKind) -> (Color, &'static str) {
  match kind {
    ToastKind::Error => (Color::Red, "✗"),
    ToastKind::Warning => (Color::Yellow, "!"),
    ToastKind::Success => (Color::Green, "✓"),
  }
}

/// Stack live toasts in the bottom-right corner, newest at the bottom.
pub fn render_toasts(frame: &mut Frame, area: Rect, toasts: &[Toast]) {
  let width = TOAST_WIDTH.min(area.width);
  let mut bottom = area.y + area.height;

  for toast in toasts.iter().rev() {
    if bottom < area.y + 3 {
      break;
    }
    let rect = Rect::new(area.x + area.width - width, bottom - 3, width, 3);
    bottom -= 3;

    let (color, icon) = kind_style(toast.kind);
    let text = Line::from(vec![
      Span::styled(format!("{} ", icon), Style::default().fg(color).bold()),
      Span::raw(truncate(&toast.message, width.saturating_sub(6) as usize)),
    ]);
    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(color));

    frame.render_widget(Clear, rect);
    frame.render_widget(Paragraph::new(text).block(block), rect);
  }
}
