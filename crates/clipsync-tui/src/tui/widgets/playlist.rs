// Playlist widget: one row per video, cursor highlighted, the current
// selection marked.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState};
use ratatui::Frame;

use clipsync_core::protocol::Video;

use crate::tui::ViewState;

const SELECTED_MARK: &str = "▶ ";
const UNSELECTED_MARK: &str = "  ";

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Playlist ({})", state.playlist.len()));

    if state.playlist.is_empty() {
        let list = List::new(vec![ListItem::new(Span::styled(
            "No videos",
            Style::default().fg(Color::Gray),
        ))])
        .block(block);
        frame.render_widget(list, area);
        return;
    }

    let items: Vec<ListItem> = state
        .playlist
        .iter()
        .map(|video| ListItem::new(row_line(video, state.selection.as_ref())))
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol(">");

    let mut list_state = ListState::default().with_selected(Some(state.cursor));
    frame.render_stateful_widget(list, area, &mut list_state);
}

/// One playlist row: selection mark followed by the video name.
pub fn row_line(video: &Video, selection: Option<&Video>) -> Line<'static> {
    if selection == Some(video) {
        Line::from(vec![
            Span::styled(SELECTED_MARK, Style::default().fg(Color::Green)),
            Span::styled(
                video.name.clone(),
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            ),
        ])
    } else {
        Line::from(vec![
            Span::raw(UNSELECTED_MARK),
            Span::raw(video.name.clone()),
        ])
    }
}
