// Status bar widget: connection and session indicators.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use clipsync_core::protocol::ConnectionStatus;

use crate::tui::ViewState;

/// Render the status bar into the given area.
///
/// Layout: [title] [connection indicator + label] | [session]
pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let (dot, dot_color) = connection_indicator(state.connection_status);
    let spans = vec![
        Span::styled(
            " clipsync ",
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("{dot} "), Style::default().fg(dot_color)),
        Span::styled(
            connection_label(state.connection_status),
            Style::default().fg(Color::White),
        ),
        Span::styled(" | ", Style::default().fg(Color::Gray)),
        Span::styled(
            session_label(state.has_session),
            Style::default().fg(if state.has_session {
                Color::Green
            } else {
                Color::Gray
            }),
        ),
    ];

    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    frame.render_widget(paragraph, area);
}

/// Return the connection dot character and its color.
pub fn connection_indicator(status: ConnectionStatus) -> (&'static str, Color) {
    match status {
        ConnectionStatus::Connected => ("●", Color::Green),
        ConnectionStatus::Disconnected => ("●", Color::Red),
        ConnectionStatus::Reconnecting { .. } => ("●", Color::Yellow),
    }
}

pub fn connection_label(status: ConnectionStatus) -> String {
    match status {
        ConnectionStatus::Connected => "Connected".to_string(),
        ConnectionStatus::Disconnected => "Disconnected".to_string(),
        ConnectionStatus::Reconnecting { attempt } => format!("Reconnecting (attempt {attempt})"),
    }
}

pub fn session_label(has_session: bool) -> &'static str {
    if has_session {
        "Session active"
    } else {
        "No session"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_indicator_colors() {
        assert_eq!(connection_indicator(ConnectionStatus::Connected).1, Color::Green);
        assert_eq!(connection_indicator(ConnectionStatus::Disconnected).1, Color::Red);
        assert_eq!(
            connection_indicator(ConnectionStatus::Reconnecting { attempt: 1 }).1,
            Color::Yellow
        );
    }

    #[test]
    fn connection_label_includes_attempt() {
        assert_eq!(
            connection_label(ConnectionStatus::Reconnecting { attempt: 3 }),
            "Reconnecting (attempt 3)"
        );
        assert_eq!(connection_label(ConnectionStatus::Connected), "Connected");
    }

    #[test]
    fn session_labels() {
        assert_eq!(session_label(true), "Session active");
        assert_eq!(session_label(false), "No session");
    }

    #[test]
    fn render_does_not_panic_with_defaults() {
        let backend = ratatui::backend::TestBackend::new(80, 1);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        let state = ViewState::default();
        terminal
            .draw(|frame| render(frame, frame.area(), &state))
            .unwrap();
    }
}
