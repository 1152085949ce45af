// Static panels for features the client does not drive yet (speech to text,
// prompt and response generation).

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Span;
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

pub fn render(frame: &mut Frame, area: Rect, title: &str, text: &str) {
    let paragraph = Paragraph::new(Span::styled(
        text.to_string(),
        Style::default().fg(Color::Gray).add_modifier(Modifier::DIM),
    ))
    .block(Block::default().borders(Borders::ALL).title(title.to_string()));
    frame.render_widget(paragraph, area);
}
