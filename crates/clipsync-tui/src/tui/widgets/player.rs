// Player widget: the selected video, its transport state and the playhead.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use clipsync_core::protocol::PlaybackState;

use crate::tui::ViewState;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let block = Block::default().borders(Borders::ALL).title("Player");

    let Some(video) = state.selection.as_ref() else {
        let paragraph = Paragraph::new(Span::styled(
            "Nothing selected",
            Style::default().fg(Color::Gray),
        ))
        .block(block);
        frame.render_widget(paragraph, area);
        return;
    };

    let (label, color) = playback_label(state.playback);
    let lines = vec![
        Line::from(Span::styled(
            video.name.clone(),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            video.url.clone(),
            Style::default().fg(Color::Gray),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled(label, Style::default().fg(color)),
            Span::raw("  "),
            Span::raw(format_position(state.position)),
        ]),
    ];

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

pub fn playback_label(state: PlaybackState) -> (&'static str, Color) {
    match state {
        PlaybackState::Playing => ("▶ Playing", Color::Green),
        PlaybackState::Paused => ("⏸ Paused", Color::Yellow),
        PlaybackState::Stopped => ("■ Stopped", Color::Gray),
    }
}

/// `mm:ss.s`, with minutes growing past two digits for long media.
pub fn format_position(secs: f64) -> String {
    let tenths = (secs.max(0.0) * 10.0).round() as u64;
    let minutes = tenths / 600;
    let seconds = (tenths % 600) / 10;
    let fraction = tenths % 10;
    format!("{minutes:02}:{seconds:02}.{fraction}")
}
